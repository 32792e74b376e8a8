//! kafka-functions library
//!
//! The binding contract between a serverless function host and Kafka
//! trigger/output handlers, plus a small in-process host loop used by the
//! demo binary and the integration tests.
//!
//! # Crates
//!
//! - `binding-types` - message envelope, headers, raw records
//! - `kafka-functions-binding` - descriptors, dispatch, payload codec,
//!   retry policy engine
//!
//! # CLI Usage
//!
//! ```bash
//! # Run the demo host over declarative metadata and a synthetic feed
//! kafka-functions --functions demos/functions.json --records demos/records.jsonl
//!
//! # Make handlers fail on matching payloads to watch the retry engine
//! kafka-functions --functions demos/functions.json \
//!   --records demos/records.jsonl --fail-contains poison
//! ```

pub mod host;

// Re-export the contract crates for convenience
pub use binding_types as types;
pub use kafka_functions_binding as binding;

//! Kafka trigger/output bindings for serverless function hosts.
//!
//! This crate is the semantic core of the binding contract:
//!
//! - Declarative Descriptors: trigger and output binding configuration,
//!   validated at construction from static registration metadata
//! - Dispatch Resolution: ONE/MANY cardinality grouping and payload
//!   decoding into handler inputs
//! - Payload Codec: raw string/binary payloads or Avro generic records,
//!   decided once per binding
//! - Retry Policy Engine: fixed-delay and exponential-backoff scheduling
//!   decisions, as a pure state machine
//!
//! The broker client, consumer-group coordination and offset commits live
//! in the external host; this crate performs no I/O and holds no shared
//! mutable state. All types are immutable after construction, so
//! concurrent invocations need no locking here.
//!
//! # Dependency Direction
//!
//! Envelope and raw-record types come from `binding-types`; this crate
//! layers configuration and dispatch semantics on top of them.

pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod payload;
pub mod registry;
pub mod retry;

#[cfg(feature = "rdkafka")]
pub mod rdkafka;

// Re-export the shared envelope types for convenience.
pub use binding_types::{
    EventError, EventValue, Header, HeaderPolicy, KafkaEvent, KafkaHeaders, RawHeader, RawRecord,
};

pub use descriptor::{
    is_setting_placeholder, BrokerAuthenticationMode, BrokerConnection, BrokerProtocol,
    Cardinality, DataType, OutputDescriptor, TriggerDescriptor,
};
pub use dispatch::{DecodedValue, DispatchResolver, HandlerInput, HandlerParameter};
pub use error::{Error, Result};
pub use output::OutputEncoder;
pub use payload::PayloadCodec;
pub use registry::{FunctionMetadata, FunctionRegistration, FunctionRegistry};
pub use retry::{RetryDecision, RetryPolicy, RetrySession, RetryState};

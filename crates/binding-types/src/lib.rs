//! Shared envelope and record types for the kafka-functions binding crates.
//!
//! This crate defines the wire-level contract between a function host and
//! user handlers:
//!
//! - [`RawRecord`] - an undecoded broker record at the host boundary
//! - [`KafkaEvent`] - the message envelope handlers see, with its JSON
//!   wire shape
//! - [`Header`]/[`KafkaHeaders`] - ordered headers with base64-encoded
//!   external values and per-header decode-on-demand
//!
//! # Dependency Direction
//!
//! The binding crate depends on this one for shared definitions; nothing
//! here knows about descriptors, dispatch or retry.

pub mod error;
pub mod event;
pub mod headers;
pub mod record;

pub use error::{EventError, Result};
pub use event::{EventValue, KafkaEvent};
pub use headers::{Header, HeaderPolicy, KafkaHeaders};
pub use record::{RawHeader, RawRecord};

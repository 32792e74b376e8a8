//! Error types for binding-types crate.

use thiserror::Error;

/// Errors raised while converting between envelopes and raw records.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("malformed base64 in header '{key}'")]
    MalformedHeader {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Result type alias for envelope operations.
pub type Result<T> = std::result::Result<T, EventError>;

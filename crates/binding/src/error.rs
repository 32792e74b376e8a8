//! Error taxonomy for the binding crate.

use binding_types::EventError;
use thiserror::Error;

/// Errors surfaced by descriptors, dispatch and retry.
///
/// `Configuration` is fatal at registration time: the function never
/// becomes callable. `MalformedHeader` is recoverable under the lenient
/// header policy. `Decode` fails the enclosing invocation, `Handler` feeds
/// the retry engine, and `RetryExhausted` is terminal.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    MalformedHeader(#[from] EventError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("handler error: {0}")]
    Handler(String),

    #[error("retries exhausted for function '{function}' after {attempts} failed attempts")]
    RetryExhausted { function: String, attempts: u32 },
}

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

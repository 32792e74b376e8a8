//! Envelope headers.
//!
//! Header values cross the host/handler boundary base64-encoded; internally
//! they are opaque byte sequences. Decoding happens on demand, per header,
//! so one malformed value does not poison its neighbours unless the caller
//! asks for strict handling.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{EventError, Result};
use crate::record::RawHeader;

/// What to do when a header value fails base64 decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Skip the malformed header, log a warning, keep the rest.
    #[default]
    Lenient,
    /// Fail the whole envelope on the first malformed header.
    Strict,
}

/// One envelope header: a key and a base64-encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "Key")]
    pub key: String,
    /// Base64 text of the raw header bytes.
    #[serde(rename = "Value")]
    pub value: String,
}

impl Header {
    /// Build a header from raw bytes, encoding the value.
    pub fn new(key: impl Into<String>, raw_value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: BASE64.encode(raw_value),
        }
    }

    /// Build a header from an already base64-encoded value.
    pub fn from_encoded(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Decode the value back to raw bytes.
    pub fn decoded_value(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.value)
            .map_err(|source| EventError::MalformedHeader {
                key: self.key.clone(),
                source,
            })
    }
}

/// Ordered header collection.
///
/// Insertion order is preserved and duplicate keys are allowed; lookups
/// return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KafkaHeaders(Vec<Header>);

impl KafkaHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header built from raw bytes.
    pub fn add(&mut self, key: impl Into<String>, raw_value: &[u8]) {
        self.0.push(Header::new(key, raw_value));
    }

    pub fn push(&mut self, header: Header) {
        self.0.push(header);
    }

    /// First header with the given key, if any.
    pub fn get_first(&self, key: &str) -> Option<&Header> {
        self.0.iter().find(|h| h.key == key)
    }

    /// Decoded value of the first header with the given key.
    pub fn try_get_first(&self, key: &str) -> Option<Result<Vec<u8>>> {
        self.get_first(key).map(Header::decoded_value)
    }

    /// Remove every header with the given key, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|h| h.key != key);
        before - self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.0.iter()
    }

    /// Decode all header values back to raw wire headers.
    ///
    /// Lenient policy drops malformed headers with a warning; strict policy
    /// fails on the first one.
    pub fn decode_all(&self, policy: HeaderPolicy) -> Result<Vec<RawHeader>> {
        let mut decoded = Vec::with_capacity(self.0.len());
        for header in &self.0 {
            match header.decoded_value() {
                Ok(value) => decoded.push(RawHeader {
                    key: header.key.clone(),
                    value,
                }),
                Err(err) => match policy {
                    HeaderPolicy::Strict => return Err(err),
                    HeaderPolicy::Lenient => {
                        tracing::warn!("skipping malformed header '{}': {err}", header.key);
                    }
                },
            }
        }
        Ok(decoded)
    }
}

impl FromIterator<Header> for KafkaHeaders {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KafkaHeaders {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

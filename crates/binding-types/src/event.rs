//! The message envelope.
//!
//! [`KafkaEvent`] is the canonical representation of one broker record as it
//! crosses the host/handler boundary. Its JSON form is the wire contract
//! handlers see for envelope-typed parameters:
//!
//! ```json
//! {
//!   "Offset": 17,
//!   "Partition": 0,
//!   "Topic": "orders",
//!   "Timestamp": "2024-05-01T12:00:00Z",
//!   "Value": "...",
//!   "Headers": [{"Key": "k", "Value": "amF2YQ=="}]
//! }
//! ```
//!
//! `Key` is additionally present for keyed records. Header values are
//! base64 text in this representation; see [`crate::headers`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::headers::{HeaderPolicy, KafkaHeaders};
use crate::record::RawRecord;

/// A decoded record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    /// UTF-8 text payload
    Text(String),
    /// Raw byte payload
    Binary(Vec<u8>),
    /// Schema-decoded generic record, in JSON value form
    Record(serde_json::Value),
}

impl EventValue {
    /// Payload bytes as published to the broker when no schema codec is in
    /// play: text as UTF-8, binary as-is, records as JSON text.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            EventValue::Text(text) => text.as_bytes().to_vec(),
            EventValue::Binary(bytes) => bytes.clone(),
            EventValue::Record(value) => value.to_string().into_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&serde_json::Value> {
        match self {
            EventValue::Record(value) => Some(value),
            _ => None,
        }
    }
}

impl Serialize for EventValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            EventValue::Text(text) => serializer.serialize_str(text),
            EventValue::Binary(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            EventValue::Record(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EventValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Binary payloads arrive as base64 strings and are indistinguishable
        // from text here; the binding's dataType decides how they are read.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(text) => EventValue::Text(text),
            other => EventValue::Record(other),
        })
    }
}

/// One broker record crossing the host/handler boundary.
///
/// `topic`, `partition` and `offset` are set by the producing side and are
/// not meant to be touched by handlers; an output envelope carries only
/// `value` and `headers` of the handler's choosing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaEvent {
    #[serde(rename = "Offset")]
    pub offset: i64,
    #[serde(rename = "Partition")]
    pub partition: i32,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "Value")]
    pub value: EventValue,
    #[serde(rename = "Headers", default)]
    pub headers: KafkaHeaders,
}

impl KafkaEvent {
    /// Build an output envelope around a payload.
    ///
    /// Topic, partition and offset are left for the publishing side to
    /// assign; the timestamp is stamped now.
    pub fn new(value: EventValue) -> Self {
        Self {
            offset: 0,
            partition: 0,
            topic: String::new(),
            timestamp: Utc::now(),
            key: None,
            value,
            headers: KafkaHeaders::new(),
        }
    }

    /// Assemble an envelope from a raw record and its decoded payload.
    ///
    /// Header values are base64-encoded into the external representation.
    /// UTF-8 keys pass through as text; other key bytes are base64-encoded.
    /// A record without a broker timestamp maps to the Unix epoch.
    pub fn from_record(record: &RawRecord, value: EventValue) -> Self {
        let headers = record
            .headers
            .iter()
            .map(|h| crate::headers::Header::new(h.key.clone(), &h.value))
            .collect();

        let key = record.key.as_ref().map(|k| match std::str::from_utf8(k) {
            Ok(text) => text.to_string(),
            Err(_) => BASE64.encode(k),
        });

        let timestamp = record
            .timestamp_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            offset: record.offset,
            partition: record.partition,
            topic: record.topic.clone(),
            timestamp,
            key,
            value,
            headers,
        }
    }

    /// Turn the envelope back into a raw record for publishing.
    ///
    /// Header values are decoded from base64 per the given policy. The
    /// payload is rendered with [`EventValue::to_bytes`]; schema-bound
    /// output bindings re-encode the value themselves.
    pub fn to_record(&self, policy: HeaderPolicy) -> Result<RawRecord> {
        let headers = self.headers.decode_all(policy)?;
        Ok(RawRecord {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
            timestamp_ms: Some(self.timestamp.timestamp_millis()),
            key: self.key.as_ref().map(|k| k.as_bytes().to_vec()),
            value: self.value.to_bytes(),
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawHeader;

    fn sample_record() -> RawRecord {
        RawRecord {
            topic: "orders".to_string(),
            partition: 2,
            offset: 41,
            timestamp_ms: Some(1_714_564_800_000),
            key: Some(b"order-1".to_vec()),
            value: b"hello".to_vec(),
            headers: vec![RawHeader::new("test", b"java".to_vec())],
        }
    }

    #[test]
    fn test_from_record_preserves_metadata() {
        let record = sample_record();
        let event = KafkaEvent::from_record(&record, EventValue::Text("hello".to_string()));
        assert_eq!(event.topic, "orders");
        assert_eq!(event.partition, 2);
        assert_eq!(event.offset, 41);
        assert_eq!(event.key.as_deref(), Some("order-1"));
        assert_eq!(
            event.headers.try_get_first("test").unwrap().unwrap(),
            b"java"
        );
    }

    #[test]
    fn test_record_round_trip() {
        let record = sample_record();
        let event = KafkaEvent::from_record(&record, EventValue::Text("hello".to_string()));
        let back = event.to_record(HeaderPolicy::Strict).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_envelope_round_trip() {
        let mut event = KafkaEvent::from_record(
            &sample_record(),
            EventValue::Binary(vec![0x00, 0xff, 0x10]),
        );
        event.headers.add("trace", &[0u8, 1, 2, 250]);

        let record = event.to_record(HeaderPolicy::Strict).unwrap();
        let back = KafkaEvent::from_record(&record, event.value.clone());
        assert_eq!(back, event);
    }

    #[test]
    fn test_non_utf8_key_is_base64() {
        let mut record = sample_record();
        record.key = Some(vec![0xff, 0xfe]);
        let event = KafkaEvent::from_record(&record, EventValue::Text(String::new()));
        assert_eq!(event.key.as_deref(), Some("//4="));
    }

    #[test]
    fn test_missing_timestamp_maps_to_epoch() {
        let mut record = sample_record();
        record.timestamp_ms = None;
        let event = KafkaEvent::from_record(&record, EventValue::Text(String::new()));
        assert_eq!(event.timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_wire_shape() {
        let record = sample_record();
        let event = KafkaEvent::from_record(&record, EventValue::Text("hello".to_string()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Offset": 41,
                "Partition": 2,
                "Topic": "orders",
                "Timestamp": "2024-05-01T12:00:00Z",
                "Key": "order-1",
                "Value": "hello",
                "Headers": [{"Key": "test", "Value": "amF2YQ=="}]
            })
        );

        let parsed: KafkaEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}

//! Output encoding.
//!
//! The egress half of the envelope contract: handler-built envelopes are
//! turned back into raw records for the broker client to publish. Header
//! values come back out of base64; payloads go through the binding's
//! codec so schema-bound outputs publish proper Avro datums.

use binding_types::{HeaderPolicy, KafkaEvent, RawRecord};

use crate::descriptor::OutputDescriptor;
use crate::error::Result;
use crate::payload::PayloadCodec;

/// Encodes envelopes for one output binding.
pub struct OutputEncoder {
    descriptor: OutputDescriptor,
    codec: PayloadCodec,
    header_policy: HeaderPolicy,
}

impl OutputEncoder {
    /// Validates the descriptor and parses its schema, if any.
    pub fn new(descriptor: OutputDescriptor) -> Result<Self> {
        descriptor.validate()?;
        let codec = PayloadCodec::for_output(&descriptor)?;
        Ok(Self {
            descriptor,
            codec,
            header_policy: HeaderPolicy::default(),
        })
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    pub fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }

    /// Encode one envelope into a publishable record.
    ///
    /// The destination topic is the binding's; whatever the envelope
    /// carried is ignored.
    pub fn encode(&self, event: &KafkaEvent) -> Result<RawRecord> {
        let mut record = event.to_record(self.header_policy)?;
        record.topic = self.descriptor.topic.clone();
        record.value = self.codec.encode(&event.value)?;
        Ok(record)
    }

    /// Encode a batch, preserving order. Any element failure fails the
    /// whole batch.
    pub fn encode_batch(&self, events: &[KafkaEvent]) -> Result<Vec<RawRecord>> {
        events.iter().map(|event| self.encode(event)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binding_types::{EventValue, Header};
    use crate::error::Error;

    fn output() -> OutputDescriptor {
        OutputDescriptor::new("localhost:9092", "out-topic").unwrap()
    }

    #[test]
    fn test_encode_uses_binding_topic() {
        let encoder = OutputEncoder::new(output()).unwrap();
        let mut event = KafkaEvent::new(EventValue::Text("payload".to_string()));
        event.topic = "somewhere-else".to_string();
        event.headers.add("lang", b"rust");

        let record = encoder.encode(&event).unwrap();
        assert_eq!(record.topic, "out-topic");
        assert_eq!(record.value, b"payload");
        assert_eq!(record.headers[0].key, "lang");
        assert_eq!(record.headers[0].value, b"rust");
    }

    #[test]
    fn test_strict_policy_rejects_malformed_header() {
        let encoder = OutputEncoder::new(output())
            .unwrap()
            .with_header_policy(HeaderPolicy::Strict);
        let mut event = KafkaEvent::new(EventValue::Text("x".to_string()));
        event
            .headers
            .push(Header::from_encoded("bad", "*not base64*"));

        assert!(matches!(
            encoder.encode(&event),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_lenient_policy_drops_malformed_header() {
        let encoder = OutputEncoder::new(output()).unwrap();
        let mut event = KafkaEvent::new(EventValue::Text("x".to_string()));
        event.headers.add("good", b"ok");
        event
            .headers
            .push(Header::from_encoded("bad", "*not base64*"));

        let record = encoder.encode(&event).unwrap();
        assert_eq!(record.headers.len(), 1);
        assert_eq!(record.headers[0].key, "good");
    }
}

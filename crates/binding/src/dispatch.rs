//! Dispatch resolution.
//!
//! Turns the raw records a broker client collected into the inputs a
//! handler invocation receives, according to the trigger descriptor's
//! cardinality and the handler's declared parameter shape. Batch
//! boundaries are the client's concern; this layer only preserves order,
//! decodes every element independently, and refuses partial batches.

use binding_types::{KafkaEvent, RawRecord};
use serde::{Deserialize, Serialize};

use crate::descriptor::{Cardinality, TriggerDescriptor};
use crate::error::Result;
use crate::payload::PayloadCodec;

/// What the handler's trigger parameter is declared as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerParameter {
    /// The bare decoded payload; offset/partition/topic/headers are
    /// discarded.
    #[default]
    Payload,
    /// The full envelope, headers base64-encoded.
    Event,
}

/// One decoded element, shaped per [`HandlerParameter`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Payload(binding_types::EventValue),
    Event(KafkaEvent),
}

/// The input to one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerInput {
    Single(DecodedValue),
    Batch(Vec<DecodedValue>),
}

impl HandlerInput {
    /// Number of records behind this invocation.
    pub fn record_count(&self) -> usize {
        match self {
            HandlerInput::Single(_) => 1,
            HandlerInput::Batch(batch) => batch.len(),
        }
    }
}

/// Resolves raw records into handler invocations for one trigger binding.
#[derive(Debug)]
pub struct DispatchResolver {
    descriptor: TriggerDescriptor,
    parameter: HandlerParameter,
    codec: PayloadCodec,
}

impl DispatchResolver {
    /// Validates the descriptor and parses its schema, if any; both fail
    /// registration rather than dispatch.
    pub fn new(descriptor: TriggerDescriptor, parameter: HandlerParameter) -> Result<Self> {
        descriptor.validate()?;
        let codec = PayloadCodec::for_trigger(&descriptor)?;
        Ok(Self {
            descriptor,
            parameter,
            codec,
        })
    }

    pub fn descriptor(&self) -> &TriggerDescriptor {
        &self.descriptor
    }

    pub fn parameter(&self) -> HandlerParameter {
        self.parameter
    }

    /// Group and decode raw records into handler inputs.
    ///
    /// Cardinality ONE yields one single-element invocation per record.
    /// Cardinality MANY yields one invocation carrying the whole ordered
    /// batch; if any element fails to decode, the whole batch fails and
    /// nothing is delivered.
    pub fn resolve(&self, records: &[RawRecord]) -> Result<Vec<HandlerInput>> {
        tracing::debug!(
            topic = %self.descriptor.topic,
            records = records.len(),
            "resolving dispatch"
        );
        match self.descriptor.cardinality {
            Cardinality::One => records
                .iter()
                .map(|record| Ok(HandlerInput::Single(self.decode_record(record)?)))
                .collect(),
            Cardinality::Many => {
                let batch = records
                    .iter()
                    .map(|record| self.decode_record(record))
                    .collect::<Result<Vec<_>>>()?;
                if batch.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![HandlerInput::Batch(batch)])
                }
            }
        }
    }

    fn decode_record(&self, record: &RawRecord) -> Result<DecodedValue> {
        let value = self.codec.decode(&record.value)?;
        Ok(match self.parameter {
            HandlerParameter::Payload => DecodedValue::Payload(value),
            HandlerParameter::Event => DecodedValue::Event(KafkaEvent::from_record(record, value)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DataType;
    use binding_types::{EventValue, RawHeader};

    fn record(offset: i64, value: &[u8]) -> RawRecord {
        RawRecord {
            topic: "topic".to_string(),
            partition: 1,
            offset,
            timestamp_ms: Some(1_714_564_800_000),
            key: None,
            value: value.to_vec(),
            headers: vec![RawHeader::new("test", b"java".to_vec())],
        }
    }

    fn trigger(cardinality: Cardinality) -> TriggerDescriptor {
        let mut descriptor =
            TriggerDescriptor::new("localhost:9092", "topic", "group").unwrap();
        descriptor.cardinality = cardinality;
        descriptor.data_type = Some(DataType::String);
        descriptor
    }

    #[test]
    fn test_one_yields_one_invocation_per_record() {
        let resolver =
            DispatchResolver::new(trigger(Cardinality::One), HandlerParameter::Event).unwrap();
        let records = vec![record(10, b"a"), record(11, b"b"), record(12, b"c")];

        let inputs = resolver.resolve(&records).unwrap();
        assert_eq!(inputs.len(), 3);
        for (input, source) in inputs.iter().zip(&records) {
            let HandlerInput::Single(DecodedValue::Event(event)) = input else {
                panic!("expected a single envelope");
            };
            assert_eq!(event.offset, source.offset);
            assert_eq!(event.partition, source.partition);
            assert_eq!(event.topic, source.topic);
        }
    }

    #[test]
    fn test_many_yields_one_ordered_batch() {
        let resolver =
            DispatchResolver::new(trigger(Cardinality::Many), HandlerParameter::Payload).unwrap();
        let records = vec![record(10, b"a"), record(11, b"b"), record(12, b"c")];

        let inputs = resolver.resolve(&records).unwrap();
        assert_eq!(inputs.len(), 1);
        let HandlerInput::Batch(batch) = &inputs[0] else {
            panic!("expected a batch");
        };
        let texts: Vec<_> = batch
            .iter()
            .map(|value| match value {
                DecodedValue::Payload(EventValue::Text(text)) => text.as_str(),
                other => panic!("unexpected value: {other:?}"),
            })
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bad_element_fails_whole_batch() {
        let resolver =
            DispatchResolver::new(trigger(Cardinality::Many), HandlerParameter::Payload).unwrap();
        let records = vec![record(10, b"fine"), record(11, &[0xff, 0xfe])];

        let err = resolver.resolve(&records).unwrap_err();
        assert!(matches!(err, crate::error::Error::Decode(_)));
    }

    #[test]
    fn test_bare_payload_discards_metadata() {
        let resolver =
            DispatchResolver::new(trigger(Cardinality::One), HandlerParameter::Payload).unwrap();
        let inputs = resolver.resolve(&[record(10, b"a")]).unwrap();
        assert_eq!(
            inputs,
            vec![HandlerInput::Single(DecodedValue::Payload(
                EventValue::Text("a".to_string())
            ))]
        );
    }

    #[test]
    fn test_empty_input_yields_no_invocations() {
        let resolver =
            DispatchResolver::new(trigger(Cardinality::Many), HandlerParameter::Payload).unwrap();
        assert!(resolver.resolve(&[]).unwrap().is_empty());
    }
}

//! Payload codec.
//!
//! Decodes raw record payloads into [`EventValue`]s and encodes them back
//! for publishing. The branch is decided once, at binding construction:
//! an `avroSchema` on the descriptor switches from raw string/binary
//! handling to schema-based generic records (surfaced to handlers in JSON
//! value form), for single and batch cardinality alike.

use apache_avro::schema::Schema;
use apache_avro::types::Value as AvroValue;
use apache_avro::{from_avro_datum, to_avro_datum};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use binding_types::EventValue;

use crate::descriptor::{DataType, OutputDescriptor, TriggerDescriptor};
use crate::error::{Error, Result};

/// Decodes and encodes record payloads for one binding.
///
/// The Avro schema, when configured, is parsed exactly once here; a schema
/// that fails to parse makes the binding unregistrable.
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    schema: Option<Schema>,
    data_type: DataType,
}

impl PayloadCodec {
    fn new(avro_schema: Option<&str>, data_type: DataType) -> Result<Self> {
        let schema = match avro_schema {
            Some(definition) => Some(
                Schema::parse_str(definition)
                    .map_err(|e| Error::Configuration(format!("invalid Avro schema: {e}")))?,
            ),
            None => None,
        };
        Ok(Self { schema, data_type })
    }

    pub fn for_trigger(descriptor: &TriggerDescriptor) -> Result<Self> {
        Self::new(
            descriptor.avro_schema.as_deref(),
            descriptor.data_type.unwrap_or_default(),
        )
    }

    pub fn for_output(descriptor: &OutputDescriptor) -> Result<Self> {
        Self::new(descriptor.avro_schema.as_deref(), DataType::default())
    }

    /// True when this codec decodes schema-typed records.
    pub fn is_schema_based(&self) -> bool {
        self.schema.is_some()
    }

    /// Decode one raw payload.
    pub fn decode(&self, raw: &[u8]) -> Result<EventValue> {
        match &self.schema {
            Some(schema) => {
                let mut reader = raw;
                let value = from_avro_datum(schema, &mut reader, None)
                    .map_err(|e| Error::Decode(format!("Avro decode failed: {e}")))?;
                Ok(EventValue::Record(avro_to_json(value)?))
            }
            None => match self.data_type {
                DataType::Binary => Ok(EventValue::Binary(raw.to_vec())),
                DataType::String => String::from_utf8(raw.to_vec())
                    .map(EventValue::Text)
                    .map_err(|e| Error::Decode(format!("payload is not valid UTF-8: {e}"))),
            },
        }
    }

    /// Encode one payload for publishing.
    pub fn encode(&self, value: &EventValue) -> Result<Vec<u8>> {
        match &self.schema {
            Some(schema) => {
                let json = match value {
                    EventValue::Record(json) => json.clone(),
                    EventValue::Text(text) => serde_json::Value::String(text.clone()),
                    EventValue::Binary(_) => {
                        return Err(Error::Decode(
                            "binary payloads cannot be encoded against an Avro schema"
                                .to_string(),
                        ))
                    }
                };
                let avro = json_to_avro(&json, schema)?;
                to_avro_datum(schema, avro)
                    .map_err(|e| Error::Decode(format!("Avro encode failed: {e}")))
            }
            None => Ok(value.to_bytes()),
        }
    }
}

/// Convert a decoded Avro value into its JSON form for handlers.
///
/// Byte-like values (bytes, fixed) become base64 text; enums become their
/// symbol; logical date/time types keep their underlying numeric value.
pub fn avro_to_json(value: AvroValue) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    Ok(match value {
        AvroValue::Null => Json::Null,
        AvroValue::Boolean(b) => Json::Bool(b),
        AvroValue::Int(i) => Json::from(i),
        AvroValue::Long(i) => Json::from(i),
        AvroValue::Float(f) => float_to_json(f as f64)?,
        AvroValue::Double(f) => float_to_json(f)?,
        AvroValue::Bytes(bytes) => Json::String(BASE64.encode(bytes)),
        AvroValue::String(s) => Json::String(s),
        AvroValue::Fixed(_, bytes) => Json::String(BASE64.encode(bytes)),
        AvroValue::Enum(_, symbol) => Json::String(symbol),
        AvroValue::Union(_, inner) => avro_to_json(*inner)?,
        AvroValue::Array(items) => Json::Array(
            items
                .into_iter()
                .map(avro_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        AvroValue::Map(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (key, entry) in entries {
                object.insert(key, avro_to_json(entry)?);
            }
            Json::Object(object)
        }
        AvroValue::Record(fields) => {
            let mut object = serde_json::Map::with_capacity(fields.len());
            for (name, field) in fields {
                object.insert(name, avro_to_json(field)?);
            }
            Json::Object(object)
        }
        AvroValue::Date(days) => Json::from(days),
        AvroValue::TimeMillis(ms) => Json::from(ms),
        AvroValue::TimeMicros(us) => Json::from(us),
        AvroValue::TimestampMillis(ms) => Json::from(ms),
        AvroValue::TimestampMicros(us) => Json::from(us),
        AvroValue::Uuid(uuid) => Json::String(uuid.to_string()),
        other => {
            return Err(Error::Decode(format!(
                "unsupported Avro value: {other:?}"
            )))
        }
    })
}

fn float_to_json(f: f64) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .ok_or_else(|| Error::Decode("non-finite number in Avro payload".to_string()))
}

/// Convert a JSON value into an Avro value guided by the writer schema.
pub fn json_to_avro(json: &serde_json::Value, schema: &Schema) -> Result<AvroValue> {
    use serde_json::Value as Json;

    let mismatch = || {
        Error::Decode(format!(
            "value {json} does not match Avro schema {schema:?}"
        ))
    };

    Ok(match schema {
        Schema::Null => match json {
            Json::Null => AvroValue::Null,
            _ => return Err(mismatch()),
        },
        Schema::Boolean => AvroValue::Boolean(json.as_bool().ok_or_else(mismatch)?),
        Schema::Int => {
            let wide = json.as_i64().ok_or_else(mismatch)?;
            AvroValue::Int(i32::try_from(wide).map_err(|_| mismatch())?)
        }
        Schema::Long => AvroValue::Long(json.as_i64().ok_or_else(mismatch)?),
        Schema::Float => AvroValue::Float(json.as_f64().ok_or_else(mismatch)? as f32),
        Schema::Double => AvroValue::Double(json.as_f64().ok_or_else(mismatch)?),
        Schema::String => AvroValue::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        Schema::Bytes => {
            let text = json.as_str().ok_or_else(mismatch)?;
            AvroValue::Bytes(BASE64.decode(text).map_err(|_| mismatch())?)
        }
        Schema::Array(items) => {
            let elements = json.as_array().ok_or_else(mismatch)?;
            AvroValue::Array(
                elements
                    .iter()
                    .map(|element| json_to_avro(element, items))
                    .collect::<Result<Vec<_>>>()?,
            )
        }
        Schema::Map(values) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            let mut entries = std::collections::HashMap::with_capacity(object.len());
            for (key, entry) in object {
                entries.insert(key.clone(), json_to_avro(entry, values)?);
            }
            AvroValue::Map(entries)
        }
        Schema::Record(record) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let value = match object.get(&field.name) {
                    Some(present) => json_to_avro(present, &field.schema)?,
                    None => match &field.default {
                        Some(default) => json_to_avro(default, &field.schema)?,
                        None => {
                            return Err(Error::Decode(format!(
                                "missing required field '{}'",
                                field.name
                            )))
                        }
                    },
                };
                fields.push((field.name.clone(), value));
            }
            AvroValue::Record(fields)
        }
        Schema::Union(union) => {
            if json.is_null() {
                let position = union
                    .variants()
                    .iter()
                    .position(|variant| matches!(variant, Schema::Null))
                    .ok_or_else(mismatch)?;
                AvroValue::Union(position as u32, Box::new(AvroValue::Null))
            } else {
                let mut converted = None;
                for (position, variant) in union.variants().iter().enumerate() {
                    if matches!(variant, Schema::Null) {
                        continue;
                    }
                    if let Ok(value) = json_to_avro(json, variant) {
                        converted = Some(AvroValue::Union(position as u32, Box::new(value)));
                        break;
                    }
                }
                converted.ok_or_else(mismatch)?
            }
        }
        Schema::Enum(definition) => {
            let symbol = json.as_str().ok_or_else(mismatch)?;
            let position = definition
                .symbols
                .iter()
                .position(|candidate| candidate == symbol)
                .ok_or_else(mismatch)?;
            AvroValue::Enum(position as u32, symbol.to_string())
        }
        Schema::Fixed(definition) => {
            let text = json.as_str().ok_or_else(mismatch)?;
            let bytes = BASE64.decode(text).map_err(|_| mismatch())?;
            if bytes.len() != definition.size {
                return Err(mismatch());
            }
            AvroValue::Fixed(definition.size, bytes)
        }
        other => {
            return Err(Error::Decode(format!(
                "unsupported Avro schema for encoding: {other:?}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_SCHEMA: &str = r#"{
        "type": "record",
        "name": "User",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"},
            {"name": "email", "type": ["null", "string"], "default": null}
        ]
    }"#;

    fn schema_codec() -> PayloadCodec {
        PayloadCodec::new(Some(USER_SCHEMA), DataType::String).unwrap()
    }

    #[test]
    fn test_string_decode() {
        let codec = PayloadCodec::new(None, DataType::String).unwrap();
        let value = codec.decode(b"hello").unwrap();
        assert_eq!(value, EventValue::Text("hello".to_string()));
    }

    #[test]
    fn test_string_decode_rejects_invalid_utf8() {
        let codec = PayloadCodec::new(None, DataType::String).unwrap();
        let err = codec.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_binary_decode_is_opaque() {
        let codec = PayloadCodec::new(None, DataType::Binary).unwrap();
        let value = codec.decode(&[0xff, 0xfe]).unwrap();
        assert_eq!(value, EventValue::Binary(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_invalid_schema_fails_construction() {
        let err = PayloadCodec::new(Some("{not a schema}"), DataType::String).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_avro_record_round_trip() {
        let codec = schema_codec();
        let record = EventValue::Record(serde_json::json!({
            "name": "alice",
            "age": 30,
            "email": "alice@example.com"
        }));

        let raw = codec.encode(&record).unwrap();
        let decoded = codec.decode(&raw).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_avro_default_fills_missing_field() {
        let codec = schema_codec();
        let raw = codec
            .encode(&EventValue::Record(serde_json::json!({
                "name": "bob",
                "age": 41
            })))
            .unwrap();

        let decoded = codec.decode(&raw).unwrap();
        assert_eq!(
            decoded.as_record().unwrap()["email"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_avro_decode_garbage_fails() {
        let codec = schema_codec();
        let err = codec.decode(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_avro_missing_required_field_fails() {
        let codec = schema_codec();
        let err = codec
            .encode(&EventValue::Record(serde_json::json!({"name": "carol"})))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}

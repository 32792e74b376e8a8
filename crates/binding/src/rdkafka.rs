//! rdkafka interop.
//!
//! Conversions for hosts that drive these bindings with an rdkafka-based
//! broker client: borrowed consumer messages become [`RawRecord`]s, and
//! descriptors build ready-to-use [`ClientConfig`]s from their rendered
//! librdkafka properties. Gated behind the `rdkafka` feature; the default
//! build stays broker-free.

use binding_types::{RawHeader, RawRecord};
use rdkafka::config::ClientConfig;
use rdkafka::message::{BorrowedMessage, Headers as _, Message as _};

use crate::descriptor::{OutputDescriptor, TriggerDescriptor};

/// Copy a consumed message into an owned raw record.
pub fn raw_record_from_message(message: &BorrowedMessage<'_>) -> RawRecord {
    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|header| {
                    RawHeader::new(
                        header.key,
                        header.value.map(|value| value.to_vec()).unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    RawRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        timestamp_ms: message.timestamp().to_millis(),
        key: message.key().map(|key| key.to_vec()),
        value: message.payload().map(|payload| payload.to_vec()).unwrap_or_default(),
        headers,
    }
}

/// Consumer configuration for a trigger binding.
pub fn trigger_client_config(descriptor: &TriggerDescriptor) -> ClientConfig {
    let mut config = ClientConfig::new();
    for (key, value) in descriptor.librdkafka_properties() {
        config.set(key, value);
    }
    config
}

/// Producer configuration for an output binding.
pub fn output_client_config(descriptor: &OutputDescriptor) -> ClientConfig {
    let mut config = ClientConfig::new();
    for (key, value) in descriptor.librdkafka_properties() {
        config.set(key, value);
    }
    config
}

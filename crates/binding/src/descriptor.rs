//! Binding descriptors.
//!
//! A descriptor is the validated configuration for one trigger or one
//! output binding, built once from static declarative metadata at function
//! registration time and immutable afterwards. Field names and defaults are
//! the compatibility surface for existing metadata files, so they are
//! preserved exactly (serde camelCase).
//!
//! Descriptors are pure data: construction validates, nothing here talks to
//! a broker. Connection fields can be rendered as librdkafka properties for
//! whatever client the host runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// SASL mechanism used for broker authentication.
///
/// `sasl.mechanism` in librdkafka.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerAuthenticationMode {
    #[default]
    #[serde(rename = "NotSet", alias = "NOTSET", alias = "notSet")]
    NotSet,
    #[serde(rename = "Gssapi", alias = "GSSAPI")]
    Gssapi,
    #[serde(rename = "Plain", alias = "PLAIN")]
    Plain,
    #[serde(rename = "ScramSha256", alias = "SCRAM-SHA-256", alias = "SCRAMSHA256")]
    ScramSha256,
    #[serde(rename = "ScramSha512", alias = "SCRAM-SHA-512", alias = "SCRAMSHA512")]
    ScramSha512,
}

impl BrokerAuthenticationMode {
    /// librdkafka `sasl.mechanism` value, or `None` when unset.
    pub fn sasl_mechanism(&self) -> Option<&'static str> {
        match self {
            BrokerAuthenticationMode::NotSet => None,
            BrokerAuthenticationMode::Gssapi => Some("GSSAPI"),
            BrokerAuthenticationMode::Plain => Some("PLAIN"),
            BrokerAuthenticationMode::ScramSha256 => Some("SCRAM-SHA-256"),
            BrokerAuthenticationMode::ScramSha512 => Some("SCRAM-SHA-512"),
        }
    }
}

/// Security protocol used to communicate with brokers.
///
/// `security.protocol` in librdkafka.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerProtocol {
    #[default]
    #[serde(rename = "NotSet", alias = "NOTSET", alias = "notSet")]
    NotSet,
    #[serde(rename = "Plaintext", alias = "PLAINTEXT")]
    Plaintext,
    #[serde(rename = "Ssl", alias = "SSL")]
    Ssl,
    #[serde(rename = "SaslPlaintext", alias = "SASL_PLAINTEXT", alias = "SASLPLAINTEXT")]
    SaslPlaintext,
    #[serde(rename = "SaslSsl", alias = "SASL_SSL", alias = "SASLSSL")]
    SaslSsl,
}

impl BrokerProtocol {
    /// librdkafka `security.protocol` value, or `None` when unset.
    pub fn security_protocol(&self) -> Option<&'static str> {
        match self {
            BrokerProtocol::NotSet => None,
            BrokerProtocol::Plaintext => Some("plaintext"),
            BrokerProtocol::Ssl => Some("ssl"),
            BrokerProtocol::SaslPlaintext => Some("sasl_plaintext"),
            BrokerProtocol::SaslSsl => Some("sasl_ssl"),
        }
    }
}

/// Whether a trigger invocation receives one record or a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[default]
    #[serde(rename = "ONE", alias = "One", alias = "one")]
    One,
    #[serde(rename = "MANY", alias = "Many", alias = "many")]
    Many,
}

/// Element type for payload deserialization when no schema is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    #[serde(rename = "string", alias = "String")]
    String,
    #[serde(rename = "binary", alias = "Binary")]
    Binary,
}

/// True when a metadata value still holds an unresolved `%AppSetting%`
/// placeholder. Substitution happens in the host, never here.
pub fn is_setting_placeholder(value: &str) -> bool {
    value.len() >= 3 && value.starts_with('%') && value.ends_with('%')
}

/// Connection fields shared by trigger and output descriptors.
///
/// All optional, defaulting to unset/empty; librdkafka key names are noted
/// on each field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerConnection {
    /// Broker list (comma-separated). May be a `%...%` placeholder resolved
    /// by the host from app configuration.
    pub broker_list: String,
    /// SASL mechanism. `sasl.mechanism`
    pub authentication_mode: BrokerAuthenticationMode,
    /// Security protocol. `security.protocol`
    pub protocol: BrokerProtocol,
    /// SASL username. `sasl.username`
    pub username: String,
    /// SASL password. `sasl.password`
    pub password: String,
    /// Path to client's private key (PEM). `ssl.key.location`
    pub ssl_key_location: String,
    /// Path to CA certificate for broker verification. `ssl.ca.location`
    pub ssl_ca_location: String,
    /// Path to client's certificate. `ssl.certificate.location`
    pub ssl_certificate_location: String,
    /// Password for the client's certificate key. `ssl.key.password`
    pub ssl_key_password: String,
}

impl BrokerConnection {
    /// Render the connection as librdkafka properties, omitting unset
    /// fields.
    pub fn librdkafka_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("bootstrap.servers".to_string(), self.broker_list.clone());
        if let Some(mechanism) = self.authentication_mode.sasl_mechanism() {
            props.insert("sasl.mechanism".to_string(), mechanism.to_string());
        }
        if let Some(protocol) = self.protocol.security_protocol() {
            props.insert("security.protocol".to_string(), protocol.to_string());
        }
        if !self.username.is_empty() {
            props.insert("sasl.username".to_string(), self.username.clone());
        }
        if !self.password.is_empty() {
            props.insert("sasl.password".to_string(), self.password.clone());
        }
        if !self.ssl_key_location.is_empty() {
            props.insert("ssl.key.location".to_string(), self.ssl_key_location.clone());
        }
        if !self.ssl_ca_location.is_empty() {
            props.insert("ssl.ca.location".to_string(), self.ssl_ca_location.clone());
        }
        if !self.ssl_certificate_location.is_empty() {
            props.insert(
                "ssl.certificate.location".to_string(),
                self.ssl_certificate_location.clone(),
            );
        }
        if !self.ssl_key_password.is_empty() {
            props.insert("ssl.key.password".to_string(), self.ssl_key_password.clone());
        }
        props
    }
}

/// Configuration for one trigger binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerDescriptor {
    /// Topic to consume from
    pub topic: String,
    #[serde(flatten)]
    pub connection: BrokerConnection,
    /// Consumer group ID
    pub consumer_group: String,
    /// One record per invocation, or a batch
    pub cardinality: Cardinality,
    /// Element type for batch deserialization. Required when cardinality
    /// is MANY.
    pub data_type: Option<DataType>,
    /// Avro schema for the payload. When present, the payload codec
    /// switches to schema-based generic records for both cardinalities.
    pub avro_schema: Option<String>,
    /// Alternate credential path for the Kafka-protocol head of an
    /// EventHub-compatible endpoint.
    pub event_hub_connection_string: String,
}

impl TriggerDescriptor {
    /// Build a descriptor with the required fields, validating on
    /// construction.
    pub fn new(
        broker_list: impl Into<String>,
        topic: impl Into<String>,
        consumer_group: impl Into<String>,
    ) -> Result<Self> {
        let descriptor = Self {
            topic: topic.into(),
            connection: BrokerConnection {
                broker_list: broker_list.into(),
                ..BrokerConnection::default()
            },
            consumer_group: consumer_group.into(),
            ..Self::default()
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse a descriptor from declarative metadata, validating on
    /// construction.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let descriptor: Self = serde_json::from_value(value)
            .map_err(|e| Error::Configuration(format!("invalid trigger metadata: {e}")))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(Error::Configuration("topic must not be empty".to_string()));
        }
        if self.connection.broker_list.is_empty() {
            return Err(Error::Configuration(
                "brokerList must not be empty".to_string(),
            ));
        }
        if self.consumer_group.is_empty() {
            return Err(Error::Configuration(
                "consumerGroup must not be empty".to_string(),
            ));
        }
        if self.cardinality == Cardinality::Many && self.data_type.is_none() {
            return Err(Error::Configuration(
                "dataType is required when cardinality is MANY".to_string(),
            ));
        }
        Ok(())
    }

    /// Consumer-side librdkafka properties.
    ///
    /// A non-empty `eventHubConnectionString` switches credentials to the
    /// EventHub convention: SASL_SSL + PLAIN with `$ConnectionString` as
    /// username and the connection string as password.
    pub fn librdkafka_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.connection.librdkafka_properties();
        props.insert("group.id".to_string(), self.consumer_group.clone());
        if !self.event_hub_connection_string.is_empty() {
            props.insert("security.protocol".to_string(), "sasl_ssl".to_string());
            props.insert("sasl.mechanism".to_string(), "PLAIN".to_string());
            props.insert("sasl.username".to_string(), "$ConnectionString".to_string());
            props.insert(
                "sasl.password".to_string(),
                self.event_hub_connection_string.clone(),
            );
        }
        props
    }
}

/// Configuration for one output binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputDescriptor {
    /// Topic to publish to
    pub topic: String,
    #[serde(flatten)]
    pub connection: BrokerConnection,
    /// Avro schema for the payload. When present, values are encoded as
    /// schema-typed generic records.
    pub avro_schema: Option<String>,
    /// Maximum transmit message size. `message.max.bytes`
    pub max_message_bytes: i64,
    /// Maximum number of messages batched in one MessageSet.
    /// `batch.num.messages`
    pub batch_size: i64,
    /// Exactly-once, in-order delivery. `enable.idempotence`
    pub enable_idempotence: bool,
    /// Local delivery timeout including retries; 0 means infinite.
    /// `message.timeout.ms`
    pub message_timeout_ms: i64,
    /// Ack timeout of the produce request. `request.timeout.ms`
    pub request_timeout_ms: i64,
    /// How many times to retry a failing message. Retrying may cause
    /// reordering unless idempotence is enabled. `message.send.max.retries`
    pub max_retries: i64,
}

impl Default for OutputDescriptor {
    fn default() -> Self {
        Self {
            topic: String::new(),
            connection: BrokerConnection::default(),
            avro_schema: None,
            max_message_bytes: 1_000_012,
            batch_size: 10_000,
            enable_idempotence: false,
            message_timeout_ms: 300_000,
            request_timeout_ms: 5_000,
            max_retries: 2,
        }
    }
}

impl OutputDescriptor {
    /// Build a descriptor with the required fields, validating on
    /// construction.
    pub fn new(broker_list: impl Into<String>, topic: impl Into<String>) -> Result<Self> {
        let descriptor = Self {
            topic: topic.into(),
            connection: BrokerConnection {
                broker_list: broker_list.into(),
                ..BrokerConnection::default()
            },
            ..Self::default()
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse a descriptor from declarative metadata, validating on
    /// construction.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let descriptor: Self = serde_json::from_value(value)
            .map_err(|e| Error::Configuration(format!("invalid output metadata: {e}")))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reject impossible sizing values. The broker-imposed floor for
    /// `maxMessageBytes` is left to the broker to enforce.
    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(Error::Configuration("topic must not be empty".to_string()));
        }
        if self.connection.broker_list.is_empty() {
            return Err(Error::Configuration(
                "brokerList must not be empty".to_string(),
            ));
        }
        if self.max_message_bytes <= 0 {
            return Err(Error::Configuration(
                "maxMessageBytes must be positive".to_string(),
            ));
        }
        if self.batch_size <= 0 {
            return Err(Error::Configuration("batchSize must be positive".to_string()));
        }
        if self.message_timeout_ms < 0 {
            return Err(Error::Configuration(
                "messageTimeoutMs must not be negative".to_string(),
            ));
        }
        if self.request_timeout_ms <= 0 {
            return Err(Error::Configuration(
                "requestTimeoutMs must be positive".to_string(),
            ));
        }
        if self.max_retries < 0 {
            return Err(Error::Configuration(
                "maxRetries must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Producer-side librdkafka properties.
    pub fn librdkafka_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.connection.librdkafka_properties();
        props.insert(
            "message.max.bytes".to_string(),
            self.max_message_bytes.to_string(),
        );
        props.insert("batch.num.messages".to_string(), self.batch_size.to_string());
        props.insert(
            "enable.idempotence".to_string(),
            self.enable_idempotence.to_string(),
        );
        props.insert(
            "message.timeout.ms".to_string(),
            self.message_timeout_ms.to_string(),
        );
        props.insert(
            "request.timeout.ms".to_string(),
            self.request_timeout_ms.to_string(),
        );
        props.insert(
            "message.send.max.retries".to_string(),
            self.max_retries.to_string(),
        );
        props
    }
}

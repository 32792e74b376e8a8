//! End-to-end flows through the binding contract without a broker:
//! declarative metadata -> registration -> dispatch -> envelope wire shape,
//! and the output path back to raw records.

use binding_types::{EventValue, HeaderPolicy, KafkaEvent, RawHeader, RawRecord};
use kafka_functions_binding::{
    DecodedValue, DispatchResolver, Error, FunctionMetadata, FunctionRegistration,
    FunctionRegistry, HandlerInput, HandlerParameter, OutputDescriptor, OutputEncoder,
    TriggerDescriptor,
};

fn record(topic: &str, partition: i32, offset: i64, value: &[u8]) -> RawRecord {
    RawRecord {
        topic: topic.to_string(),
        partition,
        offset,
        timestamp_ms: Some(1_714_564_800_000),
        key: Some(format!("key-{offset}").into_bytes()),
        value: value.to_vec(),
        headers: vec![RawHeader::new("test", b"java".to_vec())],
    }
}

#[test]
fn metadata_to_dispatch_single_invocations() {
    let metadata: FunctionMetadata = serde_json::from_value(serde_json::json!({
        "name": "onOrder",
        "trigger": {
            "topic": "orders",
            "brokerList": "localhost:9092",
            "consumerGroup": "$Default",
            "cardinality": "ONE",
            "dataType": "string"
        },
        "parameter": "event"
    }))
    .unwrap();
    let registration = FunctionRegistration::from_metadata(metadata).unwrap();

    let records = vec![
        record("orders", 0, 100, b"a"),
        record("orders", 0, 101, b"b"),
        record("orders", 1, 57, b"c"),
    ];
    let inputs = registration.resolver().resolve(&records).unwrap();

    assert_eq!(inputs.len(), 3);
    for (input, source) in inputs.iter().zip(&records) {
        let HandlerInput::Single(DecodedValue::Event(event)) = input else {
            panic!("expected envelope-typed single input");
        };
        assert_eq!(event.offset, source.offset);
        assert_eq!(event.partition, source.partition);
        assert_eq!(event.topic, source.topic);
        assert_eq!(
            event.headers.try_get_first("test").unwrap().unwrap(),
            b"java"
        );
    }
}

#[test]
fn envelope_wire_shape_for_handlers() {
    let resolver = DispatchResolver::new(
        TriggerDescriptor::new("localhost:9092", "orders", "group").unwrap(),
        HandlerParameter::Event,
    )
    .unwrap();

    let inputs = resolver.resolve(&[record("orders", 2, 41, b"hello")]).unwrap();
    let HandlerInput::Single(DecodedValue::Event(event)) = &inputs[0] else {
        panic!("expected an envelope");
    };

    let json = serde_json::to_value(event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Offset": 41,
            "Partition": 2,
            "Topic": "orders",
            "Timestamp": "2024-05-01T12:00:00Z",
            "Key": "key-41",
            "Value": "hello",
            "Headers": [{"Key": "test", "Value": "amF2YQ=="}]
        })
    );
}

#[test]
fn whole_batch_fails_on_one_bad_element() {
    let mut descriptor = TriggerDescriptor::new("localhost:9092", "orders", "group").unwrap();
    descriptor.cardinality = kafka_functions_binding::Cardinality::Many;
    descriptor.data_type = Some(kafka_functions_binding::DataType::String);
    let resolver = DispatchResolver::new(descriptor, HandlerParameter::Payload).unwrap();

    let records = vec![
        record("orders", 0, 1, b"fine"),
        record("orders", 0, 2, &[0xff, 0xfe]),
    ];
    assert!(matches!(
        resolver.resolve(&records),
        Err(Error::Decode(_))
    ));
}

#[test]
fn avro_trigger_and_output_round_trip() {
    let schema = r#"{
        "type": "record",
        "name": "User",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"}
        ]
    }"#;

    let mut output = OutputDescriptor::new("localhost:9092", "users").unwrap();
    output.avro_schema = Some(schema.to_string());
    let encoder = OutputEncoder::new(output).unwrap();

    let payload = serde_json::json!({"name": "alice", "age": 30});
    let mut event = KafkaEvent::new(EventValue::Record(payload.clone()));
    event.headers.add("origin", b"import");
    let published = encoder.encode(&event).unwrap();
    assert_eq!(published.topic, "users");
    assert_eq!(published.headers[0].value, b"import");

    let mut trigger = TriggerDescriptor::new("localhost:9092", "users", "group").unwrap();
    trigger.avro_schema = Some(schema.to_string());
    let resolver = DispatchResolver::new(trigger, HandlerParameter::Payload).unwrap();

    let inputs = resolver.resolve(&[published]).unwrap();
    let HandlerInput::Single(DecodedValue::Payload(EventValue::Record(decoded))) = &inputs[0]
    else {
        panic!("expected a decoded record");
    };
    assert_eq!(decoded, &payload);
}

#[test]
fn registry_holds_validated_functions() {
    let mut registry = FunctionRegistry::new();
    for (name, topic) in [("onOrder", "orders"), ("onAudit", "audit")] {
        let descriptor = TriggerDescriptor::new("localhost:9092", topic, "$Default").unwrap();
        registry
            .register(
                FunctionRegistration::new(name, descriptor, HandlerParameter::Payload).unwrap(),
            )
            .unwrap();
    }
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.get("onAudit").unwrap().resolver().descriptor().topic,
        "audit"
    );

    let duplicate = TriggerDescriptor::new("localhost:9092", "orders", "$Default").unwrap();
    let err = registry
        .register(
            FunctionRegistration::new("onOrder", duplicate, HandlerParameter::Payload).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn output_encode_round_trips_headers() {
    let encoder =
        OutputEncoder::new(OutputDescriptor::new("localhost:9092", "out").unwrap()).unwrap();

    let mut event = KafkaEvent::new(EventValue::Text("body".to_string()));
    event.headers.add("blob", &[0u8, 150, 255]);
    let published = encoder.encode(&event).unwrap();
    assert_eq!(published.headers[0].value, vec![0u8, 150, 255]);

    // Ingress re-encodes the same bytes into the same base64 text.
    let back = KafkaEvent::from_record(&published, EventValue::Text("body".to_string()));
    assert_eq!(
        back.headers.get_first("blob").unwrap().value,
        event.headers.get_first("blob").unwrap().value
    );
    // And the envelope round-trips through a record unchanged.
    let redone = back.to_record(HeaderPolicy::Strict).unwrap();
    let again = KafkaEvent::from_record(&redone, back.value.clone());
    assert_eq!(again, back);
}

//! Demo host for kafka-functions
//!
//! Feeds a synthetic record feed through declaratively registered trigger
//! functions: metadata is parsed and validated, records are grouped per
//! the binding's cardinality, handlers log what they receive, and failures
//! walk the retry schedule with real delays. No broker is involved.
//!
//! # Usage Examples
//! ```bash
//! # Dispatch the bundled demo feed
//! kafka-functions --functions demos/functions.json --records demos/records.jsonl
//!
//! # Watch the retry engine: any payload containing "poison" fails
//! kafka-functions --functions demos/functions.json \
//!   --records demos/records.jsonl --fail-contains poison
//!
//! # Run a single function from the metadata file
//! kafka-functions --functions demos/functions.json \
//!   --records demos/records.jsonl --function orderLogger
//! ```

use anyhow::Context;
use clap::Parser;
use kafka_functions::host::{handler, FunctionApp};
use kafka_functions_binding::{Error, FunctionMetadata, FunctionRegistration, HandlerInput};
use binding_types::{RawHeader, RawRecord};
use serde::Deserialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "kafka-functions", about = "Demo host for Kafka trigger bindings")]
struct Args {
    /// Path to the declarative function metadata (JSON array)
    #[arg(long, env = "KAFKA_FUNCTIONS_METADATA")]
    functions: std::path::PathBuf,

    /// Path to the synthetic record feed (JSON Lines)
    #[arg(long, env = "KAFKA_FUNCTIONS_RECORDS")]
    records: std::path::PathBuf,

    /// Only run the named function
    #[arg(long)]
    function: Option<String>,

    /// Fail invocations whose payload contains this text, to exercise the
    /// retry schedule
    #[arg(long)]
    fail_contains: Option<String>,
}

/// One feed line: a raw record with plain-text header values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedRecord {
    topic: String,
    #[serde(default)]
    partition: i32,
    #[serde(default)]
    offset: i64,
    #[serde(default)]
    timestamp_ms: Option<i64>,
    #[serde(default)]
    key: Option<String>,
    value: String,
    #[serde(default)]
    headers: Vec<FeedHeader>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedHeader {
    key: String,
    value: String,
}

impl From<FeedRecord> for RawRecord {
    fn from(feed: FeedRecord) -> Self {
        RawRecord {
            topic: feed.topic,
            partition: feed.partition,
            offset: feed.offset,
            timestamp_ms: feed.timestamp_ms,
            key: feed.key.map(String::into_bytes),
            value: feed.value.into_bytes(),
            headers: feed
                .headers
                .into_iter()
                .map(|h| RawHeader::new(h.key, h.value.into_bytes()))
                .collect(),
        }
    }
}

fn load_metadata(path: &std::path::Path) -> anyhow::Result<Vec<FunctionMetadata>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_records(path: &std::path::Path) -> anyhow::Result<Vec<RawRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let feed: FeedRecord =
                serde_json::from_str(line).with_context(|| format!("bad feed line: {line}"))?;
            Ok(feed.into())
        })
        .collect()
}

/// A handler that logs its input and optionally fails on a payload marker.
fn logging_handler(name: String, fail_contains: Option<String>) -> kafka_functions::host::Handler {
    handler(move |input: HandlerInput| {
        let name = name.clone();
        let fail_contains = fail_contains.clone();
        async move {
            let rendered = match &input {
                HandlerInput::Single(value) => format!("{value:?}"),
                HandlerInput::Batch(batch) => format!("batch of {}: {batch:?}", batch.len()),
            };
            info!(function = %name, "received {rendered}");
            if let Some(marker) = fail_contains {
                if rendered.contains(&marker) {
                    return Err(Error::Handler(format!("payload contains '{marker}'")));
                }
            }
            Ok(())
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let metadata = load_metadata(&args.functions)?;
    let records = load_records(&args.records)?;
    info!(
        functions = metadata.len(),
        records = records.len(),
        "loaded demo inputs"
    );

    let mut app = FunctionApp::new();
    for entry in metadata {
        if let Some(only) = &args.function {
            if &entry.name != only {
                continue;
            }
        }
        let name = entry.name.clone();
        let registration = FunctionRegistration::from_metadata(entry)
            .with_context(|| format!("failed to register function '{name}'"))?;
        app.register(registration, logging_handler(name, args.fail_contains.clone()))
            .context("registration failed")?;
    }

    if app.function_names().is_empty() {
        anyhow::bail!("no functions registered");
    }

    // Each function sees the slice of the feed addressed to its topic, the
    // way a broker client would hand over per-subscription batches.
    for name in app
        .function_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>()
    {
        let summary = app.pump_topic_records(&name, &records).await?;
        info!(
            function = %name,
            invocations = summary.invocations,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "function run complete"
        );
    }

    Ok(())
}

//! In-process host loop.
//!
//! Plays the dispatch-loop role a real function host would: resolve raw
//! records into handler inputs, invoke the handler, and walk the retry
//! state machine on failure, sleeping out the delays the engine computes.
//! Failed invocations are never reported as successes; a function without
//! a retry policy fails on the first handler error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kafka_functions_binding::{
    Error, FunctionRegistration, HandlerInput, Result, RetryDecision, RetrySession,
};
use binding_types::RawRecord;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Type alias for handler functions.
pub type Handler =
    Arc<dyn Fn(HandlerInput) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(HandlerInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |input| Box::pin(f(input)))
}

/// Outcome of pumping one record set through a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub invocations: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// A set of registered functions and their handlers.
#[derive(Default)]
pub struct FunctionApp {
    functions: Vec<(FunctionRegistration, Handler)>,
}

impl FunctionApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function with its handler. Names are unique.
    pub fn register(&mut self, registration: FunctionRegistration, handler: Handler) -> Result<()> {
        if self.find(registration.name()).is_some() {
            return Err(Error::Configuration(format!(
                "function '{}' is already registered",
                registration.name()
            )));
        }
        info!(function = registration.name(), "registered function");
        self.functions.push((registration, handler));
        Ok(())
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|(r, _)| r.name()).collect()
    }

    fn find(&self, name: &str) -> Option<&(FunctionRegistration, Handler)> {
        self.functions.iter().find(|(r, _)| r.name() == name)
    }

    /// Dispatch a record set to one function and drive retries to
    /// completion.
    pub async fn pump(&self, name: &str, records: &[RawRecord]) -> Result<RunSummary> {
        let (registration, handler) = self
            .find(name)
            .ok_or_else(|| Error::Configuration(format!("unknown function '{name}'")))?;

        let inputs = registration.resolver().resolve(records)?;
        let mut summary = RunSummary::default();
        for input in inputs {
            summary.invocations += 1;
            match self.invoke_with_retry(registration, handler, input).await {
                Ok(()) => summary.succeeded += 1,
                Err(err) => {
                    warn!(function = name, "invocation failed permanently: {err}");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Dispatch only the records addressed to the function's topic, the way
    /// a broker client hands over per-subscription batches.
    pub async fn pump_topic_records(
        &self,
        name: &str,
        records: &[RawRecord],
    ) -> Result<RunSummary> {
        let (registration, _) = self
            .find(name)
            .ok_or_else(|| Error::Configuration(format!("unknown function '{name}'")))?;
        let topic = &registration.resolver().descriptor().topic;
        let matching: Vec<RawRecord> = records
            .iter()
            .filter(|record| &record.topic == topic)
            .cloned()
            .collect();
        self.pump(name, &matching).await
    }

    /// Invoke the handler, replaying the same decoded input on each retry.
    async fn invoke_with_retry(
        &self,
        registration: &FunctionRegistration,
        handler: &Handler,
        input: HandlerInput,
    ) -> Result<()> {
        let mut session = registration.retry_policy().cloned().map(RetrySession::new);

        loop {
            if let Some(session) = &mut session {
                session.begin_attempt();
            }
            match handler(input.clone()).await {
                Ok(()) => {
                    if let Some(session) = &mut session {
                        session.record_success();
                    }
                    debug!(
                        function = registration.name(),
                        records = input.record_count(),
                        "invocation succeeded"
                    );
                    return Ok(());
                }
                Err(err) => {
                    warn!(function = registration.name(), "handler failed: {err}");
                    let Some(session) = &mut session else {
                        return Err(err);
                    };
                    match session.record_failure() {
                        RetryDecision::Retry(delay) => {
                            info!(
                                function = registration.name(),
                                retry = session.retries(),
                                delay_ms = delay.as_millis() as u64,
                                "scheduling retry"
                            );
                            sleep(delay).await;
                        }
                        RetryDecision::Exhausted => {
                            return Err(Error::RetryExhausted {
                                function: registration.name().to_string(),
                                attempts: session.attempts(),
                            });
                        }
                    }
                }
            }
        }
    }
}

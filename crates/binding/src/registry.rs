//! Function registration.
//!
//! The declarative metadata attached to a handler becomes a validated
//! [`FunctionRegistration`] here, once, at startup. Everything that can be
//! rejected is rejected at this point - descriptor fields, the Avro
//! schema, the retry policy - so a function that registers cleanly never
//! fails on configuration grounds at dispatch time.

use serde::{Deserialize, Serialize};

use crate::descriptor::TriggerDescriptor;
use crate::dispatch::{DispatchResolver, HandlerParameter};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Declarative metadata for one trigger function, as found in a function
/// app's registration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadata {
    pub name: String,
    pub trigger: TriggerDescriptor,
    #[serde(default)]
    pub parameter: HandlerParameter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

/// A validated trigger function: its dispatch resolver plus an optional
/// retry policy.
#[derive(Debug)]
pub struct FunctionRegistration {
    name: String,
    resolver: DispatchResolver,
    retry: Option<RetryPolicy>,
}

impl FunctionRegistration {
    pub fn new(
        name: impl Into<String>,
        descriptor: TriggerDescriptor,
        parameter: HandlerParameter,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            resolver: DispatchResolver::new(descriptor, parameter)?,
            retry: None,
        })
    }

    /// Build a registration from declarative metadata.
    pub fn from_metadata(metadata: FunctionMetadata) -> Result<Self> {
        let registration = Self::new(metadata.name, metadata.trigger, metadata.parameter)?;
        match metadata.retry {
            Some(policy) => registration.with_retry_policy(policy),
            None => Ok(registration),
        }
    }

    /// Attach a retry policy. A function carries at most one; attaching a
    /// second fails.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Result<Self> {
        if self.retry.is_some() {
            return Err(Error::Configuration(format!(
                "function '{}' already has a retry policy",
                self.name
            )));
        }
        policy.validate()?;
        self.retry = Some(policy);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolver(&self) -> &DispatchResolver {
        &self.resolver
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }
}

/// The static registration table of a function app.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<FunctionRegistration>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. Names are unique within an app.
    pub fn register(&mut self, registration: FunctionRegistration) -> Result<()> {
        if self.get(registration.name()).is_some() {
            return Err(Error::Configuration(format!(
                "function '{}' is already registered",
                registration.name()
            )));
        }
        tracing::info!(function = registration.name(), "registered trigger function");
        self.functions.push(registration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionRegistration> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FunctionRegistration> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

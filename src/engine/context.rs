// SPDX-License-Identifier: MIT

//! Named-value store threaded through a pipeline execution

use std::collections::HashMap;

use super::error::PipedreamError;
use super::value::Value;

/// Mutable mapping of names to values.
///
/// Not shared between concurrent executions: each run owns its context, and
/// `clone()` gives a sub-pipeline an independent copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    values: HashMap<String, Value>,
}

impl PipelineContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-populated with the given entries
    pub fn with_values<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a context from a JSON object; each top-level key becomes an entry
    pub fn from_json(json: serde_json::Value) -> Result<Self, PipedreamError> {
        match json {
            serde_json::Value::Object(entries) => {
                let values = entries.into_iter().map(|(k, v)| (k, Value::from(v)));
                Ok(Self::with_values(values))
            }
            other => {
                let message = format!("initial context must be a JSON object, got {}", other);
                Err(PipedreamError::config(message))
            }
        }
    }

    /// Get the value with the given name, if it exists
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set a value, returning the one it replaced
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Convert the context to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

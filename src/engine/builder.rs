// SPDX-License-Identifier: MIT

//! Value builders: deferred computations producing a value from a context

use std::sync::Arc;

use super::context::PipelineContext;
use super::error::BuildError;
use super::getter::{ChainValueGetter, DefaultValueGetter, ValueGetter};
use super::value::Value;

/// Produces a value, either fixed or read from the pipeline context
#[derive(Debug, Clone)]
pub enum ValueBuilder {
    /// Ignores the context and always returns this value
    Literal(Value),
    /// Reads a named context entry, optionally projecting it with a getter
    Dynamic(DynamicValue),
}

impl ValueBuilder {
    pub fn literal(value: impl Into<Value>) -> Self {
        ValueBuilder::Literal(value.into())
    }

    /// Read the context entry `context_key` as-is
    pub fn dynamic(context_key: impl Into<String>) -> Self {
        ValueBuilder::Dynamic(DynamicValue::new(context_key))
    }

    /// Read one field, index or map entry of the context entry `context_key`
    pub fn field(context_key: impl Into<String>, key: impl Into<Value>) -> Self {
        let getter = Arc::new(DefaultValueGetter);
        ValueBuilder::Dynamic(DynamicValue::new(context_key).with_getter(getter, key))
    }

    /// Follow a path of fields/indices into the context entry `context_key`
    pub fn path<I, K>(context_key: impl Into<String>, path: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        let key = Value::List(path.into_iter().map(Into::into).collect());
        let getter = Arc::new(ChainValueGetter);
        ValueBuilder::Dynamic(DynamicValue::new(context_key).with_getter(getter, key))
    }

    pub fn build(&self, ctx: &PipelineContext) -> Result<Value, BuildError> {
        match self {
            ValueBuilder::Literal(value) => Ok(value.clone()),
            ValueBuilder::Dynamic(dynamic) => dynamic.build(ctx),
        }
    }
}

impl From<DynamicValue> for ValueBuilder {
    fn from(dynamic: DynamicValue) -> Self {
        ValueBuilder::Dynamic(dynamic)
    }
}

/// Reads a value from the context, optionally passing it through a getter
#[derive(Debug, Clone)]
pub struct DynamicValue {
    /// Name of the context entry to read
    pub context_key: String,
    /// Getter applied to the raw context value
    pub getter: Option<Arc<dyn ValueGetter>>,
    /// Key handed to the getter
    pub key: Option<Value>,
}

impl DynamicValue {
    pub fn new(context_key: impl Into<String>) -> Self {
        Self {
            context_key: context_key.into(),
            getter: None,
            key: None,
        }
    }

    pub fn with_getter(mut self, getter: Arc<dyn ValueGetter>, key: impl Into<Value>) -> Self {
        self.getter = Some(getter);
        self.key = Some(key.into());
        self
    }

    pub fn build(&self, ctx: &PipelineContext) -> Result<Value, BuildError> {
        if self.context_key.is_empty() {
            return Err(BuildError::NoContextKeyProvided);
        }

        let raw = ctx
            .get(&self.context_key)
            .ok_or_else(|| BuildError::ValueNotFoundInContext {
                key: self.context_key.clone(),
            })?;

        let Some(getter) = &self.getter else {
            return Ok(raw.clone());
        };
        getter
            .get_value(raw, self.key.as_ref())
            .map_err(|source| BuildError::Getter {
                key: self.context_key.clone(),
                source,
            })
    }
}

// SPDX-License-Identifier: MIT

//! Value getters project a part out of a context value
//!
//! - [`DefaultValueGetter`] - one structural step: list index, map key, or
//!   record field. Scalars are returned as-is whatever the key.
//! - [`ChainValueGetter`] - several structural steps, one per element of a
//!   list key (e.g. `["orders", 0, "total"]`).
//! - [`StaticValueGetter`] - ignores its input and returns a constant.

use super::error::GetterError;
use super::value::{Numeric, Value};

/// Extracts a value from an input using a key
pub trait ValueGetter: Send + Sync + std::fmt::Debug {
    fn get_value(&self, input: &Value, key: Option<&Value>) -> Result<Value, GetterError>;
}

/// Structural projection by index, map key, or field name
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueGetter;

impl ValueGetter for DefaultValueGetter {
    fn get_value(&self, input: &Value, key: Option<&Value>) -> Result<Value, GetterError> {
        if input.is_nil() {
            return Err(GetterError::InputIsNil);
        }
        let key = require_key(key)?;
        project(input, key)
    }
}

/// Applies the default projection once per element of a list key
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainValueGetter;

impl ValueGetter for ChainValueGetter {
    fn get_value(&self, input: &Value, key: Option<&Value>) -> Result<Value, GetterError> {
        if input.is_nil() {
            return Err(GetterError::InputIsNil);
        }
        let key = require_key(key)?;

        // A non-list key is a chain of one
        let steps = match key.resolved() {
            Value::List(steps) => steps.as_slice(),
            _ => std::slice::from_ref(key),
        };
        if steps.is_empty() {
            return Err(GetterError::KeyIsEmpty);
        }

        let mut current = input.clone();
        for step in steps {
            current = project(&current, require_key(Some(step))?)?;
        }
        Ok(current)
    }
}

/// Always returns the same value
#[derive(Debug, Clone, Default)]
pub struct StaticValueGetter {
    value: Value,
}

impl StaticValueGetter {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ValueGetter for StaticValueGetter {
    fn get_value(&self, _input: &Value, _key: Option<&Value>) -> Result<Value, GetterError> {
        Ok(self.value.clone())
    }
}

fn require_key(key: Option<&Value>) -> Result<&Value, GetterError> {
    match key {
        Some(key) if !key.resolved().is_nil() => Ok(key),
        _ => Err(GetterError::KeyIsEmpty),
    }
}

fn project(input: &Value, key: &Value) -> Result<Value, GetterError> {
    match input {
        Value::Nil => Err(GetterError::InputIsNil),
        Value::Bool(_)
        | Value::I8(_)
        | Value::I16(_)
        | Value::I32(_)
        | Value::I64(_)
        | Value::U8(_)
        | Value::U16(_)
        | Value::U32(_)
        | Value::U64(_)
        | Value::F32(_)
        | Value::F64(_)
        | Value::String(_) => Ok(input.clone()),
        Value::List(items) => {
            let index = index_key(key)?;
            items.get(index).cloned().ok_or(GetterError::ValueNotFound)
        }
        Value::Map(entries) => {
            let name = string_key(key)?;
            entries.get(name).cloned().ok_or(GetterError::ValueNotFound)
        }
        Value::Record(record) => {
            let name = string_key(key)?;
            let field = record.field(name).ok_or(GetterError::ValueNotFound)?;
            if !field.exported {
                return Err(GetterError::FieldIsUnexported);
            }
            Ok(field.value.clone())
        }
        Value::Ref(inner) => project(inner, key),
        Value::Opaque(_) => Err(GetterError::ImproperValueKind),
    }
}

fn index_key(key: &Value) -> Result<usize, GetterError> {
    match key.resolved().as_numeric() {
        Some(Numeric::Signed(i)) => usize::try_from(i).map_err(|_| GetterError::ValueNotFound),
        Some(Numeric::Unsigned(u)) => usize::try_from(u).map_err(|_| GetterError::ValueNotFound),
        Some(Numeric::Float(_)) | None => Err(GetterError::KeyTypeInvalid),
    }
}

fn string_key(key: &Value) -> Result<&str, GetterError> {
    key.as_str().ok_or(GetterError::KeyTypeInvalid)
}

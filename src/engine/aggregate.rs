// SPDX-License-Identifier: MIT

//! Named binary reducers used by Fold nodes
//!
//! Builtins (see [`AggregatorRegistry::with_builtins`]):
//!
//! | name     | accumulator       | element   | result                       |
//! |----------|-------------------|-----------|------------------------------|
//! | `sum`    | numeric or nil    | numeric   | widened sum, overflow errors |
//! | `min`    | ordered or nil    | ordered   | smaller of the two           |
//! | `max`    | ordered or nil    | ordered   | larger of the two            |
//! | `count`  | integer or nil    | any       | accumulator + 1              |
//! | `append` | list or nil       | any       | list with element pushed     |
//! | `concat` | string or nil     | string    | concatenation                |
//!
//! A nil accumulator means "no value yet".

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::compare::order;
use super::error::BoxError;
use super::value::{Numeric, Value};

/// A named binary reduction `(accumulator, element) -> accumulator`
pub trait Aggregator: Send + Sync {
    fn name(&self) -> &str;

    fn aggregate(&self, acc: Value, element: Value) -> Result<Value, BoxError>;
}

type AggregateFn = dyn Fn(Value, Value) -> Result<Value, BoxError> + Send + Sync;

/// Aggregator backed by a closure
pub struct FnAggregator {
    name: String,
    func: Box<AggregateFn>,
}

impl FnAggregator {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl Aggregator for FnAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn aggregate(&self, acc: Value, element: Value) -> Result<Value, BoxError> {
        (self.func)(acc, element)
    }
}

#[derive(Clone)]
pub struct AggregatorRegistry {
    aggregators: Arc<RwLock<HashMap<String, Arc<dyn Aggregator>>>>,
}

impl AggregatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            aggregators: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a registry holding the builtin aggregators
    pub fn with_builtins() -> Self {
        let builtins: Vec<Arc<dyn Aggregator>> = vec![
            Arc::new(FnAggregator::new("sum", sum)),
            Arc::new(FnAggregator::new("min", min)),
            Arc::new(FnAggregator::new("max", max)),
            Arc::new(FnAggregator::new("count", count)),
            Arc::new(FnAggregator::new("append", append)),
            Arc::new(FnAggregator::new("concat", concat)),
        ];

        let map = builtins
            .into_iter()
            .map(|agg| (agg.name().to_string(), agg))
            .collect();
        Self {
            aggregators: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn register(&self, aggregator: Arc<dyn Aggregator>) {
        let mut aggregators = self.aggregators.write().await;
        aggregators.insert(aggregator.name().to_string(), aggregator);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Aggregator>> {
        let aggregators = self.aggregators.read().await;
        aggregators.get(name).cloned()
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

const SUM_OVERFLOW: &str = "integer overflow in sum";

fn unexpected_kind(expected: &str, value: &Value) -> BoxError {
    let message = format!("expected {}, got {}", expected, value.resolved().kind());
    message.into()
}

fn numeric(value: &Value) -> Result<Numeric, BoxError> {
    value
        .resolved()
        .as_numeric()
        .ok_or_else(|| unexpected_kind("a numeric value", value))
}

fn sum(acc: Value, element: Value) -> Result<Value, BoxError> {
    let rhs = numeric(&element)?;
    if acc.resolved().is_nil() {
        return Ok(element);
    }
    let lhs = numeric(&acc)?;

    let wide = |n: Numeric| -> Option<i128> {
        match n {
            Numeric::Signed(v) => Some(i128::from(v)),
            Numeric::Unsigned(v) => Some(i128::from(v)),
            Numeric::Float(_) => None,
        }
    };

    match (wide(lhs), wide(rhs)) {
        (Some(l), Some(r)) => {
            let total = l.checked_add(r).ok_or(SUM_OVERFLOW)?;
            let unsigned = matches!((lhs, rhs), (Numeric::Unsigned(_), Numeric::Unsigned(_)));
            match i64::try_from(total) {
                Ok(v) if !unsigned => Ok(Value::I64(v)),
                _ => Ok(Value::U64(u64::try_from(total).map_err(|_| SUM_OVERFLOW)?)),
            }
        }
        _ => Ok(Value::F64(lhs.as_f64() + rhs.as_f64())),
    }
}

/// Keep the accumulator unless the element orders `wanted` relative to it
fn pick(acc: Value, element: Value, wanted: Ordering) -> Result<Value, BoxError> {
    if acc.resolved().is_nil() {
        return Ok(element);
    }
    if order(&element, &acc)? == wanted {
        Ok(element)
    } else {
        Ok(acc)
    }
}

fn min(acc: Value, element: Value) -> Result<Value, BoxError> {
    pick(acc, element, Ordering::Less)
}

fn max(acc: Value, element: Value) -> Result<Value, BoxError> {
    pick(acc, element, Ordering::Greater)
}

fn count(acc: Value, _element: Value) -> Result<Value, BoxError> {
    let current = match acc.resolved() {
        Value::Nil => 0,
        other => match other.as_numeric() {
            Some(Numeric::Signed(v)) => v,
            Some(Numeric::Unsigned(v)) => i64::try_from(v)?,
            _ => return Err(unexpected_kind("an integer accumulator", other)),
        },
    };
    let next = current.checked_add(1).ok_or("integer overflow in count")?;
    Ok(Value::I64(next))
}

fn append(acc: Value, element: Value) -> Result<Value, BoxError> {
    let mut items = match acc.resolved() {
        Value::Nil => Vec::new(),
        Value::List(items) => items.clone(),
        other => return Err(unexpected_kind("a list accumulator", other)),
    };
    items.push(element);
    Ok(Value::List(items))
}

fn concat(acc: Value, element: Value) -> Result<Value, BoxError> {
    let tail = element
        .as_str()
        .ok_or_else(|| unexpected_kind("a string element", &element))?;
    let mut joined = match acc.resolved() {
        Value::Nil => String::new(),
        Value::String(s) => s.clone(),
        other => return Err(unexpected_kind("a string accumulator", other)),
    };
    joined.push_str(tail);
    Ok(Value::String(joined))
}

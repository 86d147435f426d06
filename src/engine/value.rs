// SPDX-License-Identifier: MIT

//! Dynamically-kinded values carried through pipelines
//!
//! [`Value`] is a closed set of kinds: nil, booleans, fixed-width integers,
//! floats, strings, and the aggregates (lists, string-keyed maps, records).
//! Two wrapper kinds round it out: [`Value::Ref`] for shared references and
//! [`Value::Opaque`] for host objects the engine cannot look inside.
//!
//! Values are never mutated in place by the engine; builders, getters and
//! comparisons always produce fresh values.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A dynamically-kinded value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
    /// Shared reference to another value. `Ref(Nil)` is an empty reference.
    Ref(Arc<Value>),
    /// Host object that cannot be introspected
    Opaque(OpaqueValue),
}

/// The kind of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Nil,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    List,
    Map,
    Record,
    Ref,
    Opaque,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Record => "record",
            ValueKind::Ref => "ref",
            ValueKind::Opaque => "opaque",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A numeric value widened to the largest representation of its family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Numeric {
    /// Convert to `f64`. Integers beyond 2^53 lose precision.
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Signed(v) => v as f64,
            Numeric::Unsigned(v) => v as f64,
            Numeric::Float(v) => v,
        }
    }

    /// Convert to `f64` only when the integer survives the round trip
    pub fn to_f64_exact(self) -> Option<f64> {
        let wide = self.as_f64();
        let exact = match self {
            Numeric::Signed(v) => wide as i128 == i128::from(v),
            Numeric::Unsigned(v) => wide as i128 == i128::from(v),
            Numeric::Float(_) => true,
        };
        exact.then_some(wide)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Record(_) => ValueKind::Record,
            Value::Ref(_) => ValueKind::Ref,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Follow `Ref` wrappers down to the referenced value
    pub fn resolved(&self) -> &Value {
        match self {
            Value::Ref(inner) => inner.resolved(),
            other => other,
        }
    }

    /// Widen a numeric value; `None` for every non-numeric kind
    pub fn as_numeric(&self) -> Option<Numeric> {
        match *self {
            Value::I8(v) => Some(Numeric::Signed(v.into())),
            Value::I16(v) => Some(Numeric::Signed(v.into())),
            Value::I32(v) => Some(Numeric::Signed(v.into())),
            Value::I64(v) => Some(Numeric::Signed(v)),
            Value::U8(v) => Some(Numeric::Unsigned(v.into())),
            Value::U16(v) => Some(Numeric::Unsigned(v.into())),
            Value::U32(v) => Some(Numeric::Unsigned(v.into())),
            Value::U64(v) => Some(Numeric::Unsigned(v)),
            Value::F32(v) => Some(Numeric::Float(v.into())),
            Value::F64(v) => Some(Numeric::Float(v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.resolved() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.resolved() {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Wrap an arbitrary host object
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(OpaqueValue::new(value))
    }

    /// Convert to JSON. Records expose only their exported fields; opaque
    /// values and non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Nil | Value::Opaque(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I8(v) => Json::from(*v),
            Value::I16(v) => Json::from(*v),
            Value::I32(v) => Json::from(*v),
            Value::I64(v) => Json::from(*v),
            Value::U8(v) => Json::from(*v),
            Value::U16(v) => Json::from(*v),
            Value::U32(v) => Json::from(*v),
            Value::U64(v) => Json::from(*v),
            Value::F32(v) => float_to_json(f64::from(*v)),
            Value::F64(v) => float_to_json(*v),
            Value::String(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Record(record) => Json::Object(
                record
                    .fields()
                    .filter(|f| f.exported)
                    .map(|f| (f.name.clone(), f.value.to_json()))
                    .collect(),
            ),
            Value::Ref(inner) => inner.to_json(),
        }
    }
}

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::I64(v)
                } else if let Some(v) = n.as_u64() {
                    Value::U64(v)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<Value> => List,
    BTreeMap<String, Value> => Map,
    Record => Record,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Arc<Value>> for Value {
    fn from(v: Arc<Value>) -> Self {
        Value::Ref(v)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A named field of a [`Record`]
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
    /// Hidden fields exist but cannot be projected by getters
    pub exported: bool,
}

/// A struct-like aggregate with ordered, named fields
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Add (or replace) an exported field
    pub fn with_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into(), true)
    }

    /// Add (or replace) a hidden field
    pub fn with_hidden_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into(), false)
    }

    fn insert(mut self, name: String, value: Value, exported: bool) -> Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.value = value;
                field.exported = exported;
            }
            None => self.fields.push(Field {
                name,
                value,
                exported,
            }),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }
}

// ---------------------------------------------------------------------------
// Opaque host objects
// ---------------------------------------------------------------------------

/// A host object carried through the engine without introspection.
///
/// Two opaque values are equal only if they share the same allocation.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

// ---------------------------------------------------------------------------
// Typed bridge
// ---------------------------------------------------------------------------

/// Rust types that can be carried as a [`Value`].
///
/// Used to narrow built values for custom comparisons and to check data
/// source parameters against their declared type.
pub trait ValueType: Sized + Send + 'static {
    /// Name used in type mismatch errors
    const TYPE_NAME: &'static str;

    /// Exact narrowing: succeeds only for the matching kind (through `Ref`)
    fn from_value(value: &Value) -> Option<Self>;

    /// Lenient, lossless conversion. Defaults to [`ValueType::from_value`].
    fn convert_from(value: &Value) -> Option<Self> {
        Self::from_value(value)
    }

    fn into_value(self) -> Value;
}

macro_rules! integer_value_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ValueType for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Option<Self> {
                    match value.resolved() {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                fn convert_from(value: &Value) -> Option<Self> {
                    match value.resolved().as_numeric()? {
                        Numeric::Signed(v) => <$ty>::try_from(v).ok(),
                        Numeric::Unsigned(v) => <$ty>::try_from(v).ok(),
                        Numeric::Float(_) => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

integer_value_type! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl ValueType for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value.resolved() {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    fn convert_from(value: &Value) -> Option<Self> {
        value.resolved().as_numeric()?.to_f64_exact()
    }

    fn into_value(self) -> Value {
        Value::F64(self)
    }
}

impl ValueType for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Option<Self> {
        match value.resolved() {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    fn convert_from(value: &Value) -> Option<Self> {
        let wide = value.resolved().as_numeric()?.to_f64_exact()?;
        let narrow = wide as f32;
        if f64::from(narrow) == wide || wide.is_nan() {
            Some(narrow)
        } else {
            None
        }
    }

    fn into_value(self) -> Value {
        Value::F32(self)
    }
}

impl ValueType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value.resolved() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ValueType for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl ValueType for Vec<Value> {
    const TYPE_NAME: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().map(<[Value]>::to_vec)
    }

    fn into_value(self) -> Value {
        Value::List(self)
    }
}

impl ValueType for BTreeMap<String, Value> {
    const TYPE_NAME: &'static str = "map";

    fn from_value(value: &Value) -> Option<Self> {
        match value.resolved() {
            Value::Map(entries) => Some(entries.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Map(self)
    }
}

impl ValueType for Record {
    const TYPE_NAME: &'static str = "record";

    fn from_value(value: &Value) -> Option<Self> {
        match value.resolved() {
            Value::Record(record) => Some(record.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Record(self)
    }
}

/// Identity: any value narrows to `Value`
impl ValueType for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn into_value(self) -> Value {
        self
    }
}

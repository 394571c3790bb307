//! Value marshaling between environments
//!
//! Primitives cross the boundary by copy with their exact kind
//! preserved; tables cross by reference as proxy handles; everything
//! else is a marshaling error naming the offending type.

use crate::env::{Environment, KeyClass, RawValue, TableKey};
use crate::error::{ExdbError, Result};
use crate::proxy::handle::{EnvLink, Proxy};
use crate::proxy::wrap_table;

/// A value as the consumer sees it. Tables are proxy handles back into
/// the producer environment, never copies.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Table(Proxy),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_table(&self) -> Option<&Proxy> {
        match self {
            Value::Table(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Table values compare by handle identity, like the proxies they are.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Proxy::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // {:?} keeps the float-ness visible: 2.0 prints as "2.0"
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Table(p) => write!(f, "{}", p),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Proxy> for Value {
    fn from(p: Proxy) -> Self {
        Value::Table(p)
    }
}

/// Copy one producer value out for a consumer.
pub(crate) fn copy_value(env: &mut Environment, link: &EnvLink, raw: &RawValue) -> Result<Value> {
    match raw {
        RawValue::Nil => Ok(Value::Nil),
        RawValue::Bool(b) => Ok(Value::Bool(*b)),
        RawValue::Int(n) => Ok(Value::Int(*n)),
        RawValue::Float(x) => Ok(Value::Float(*x)),
        RawValue::Str(s) => Ok(Value::Str(s.clone())),
        RawValue::Table(id) => Ok(Value::Table(wrap_table(env, link, *id))),
        RawValue::Builtin(_) => Err(ExdbError::UnsupportedValue("function")),
    }
}

/// Marshal an iteration key out for a consumer. Table keys wrap into
/// proxies exactly like table values.
pub(crate) fn copy_key(env: &mut Environment, link: &EnvLink, key: &TableKey) -> Result<Value> {
    copy_value(env, link, &key.to_raw())
}

/// Lower a consumer key for a raw producer-side lookup. `None` means
/// the key can match nothing (nil, NaN); a table-valued key has no
/// cross-environment lowering and is rejected.
pub(crate) fn lower_key(key: &Value) -> Result<Option<TableKey>> {
    match key {
        Value::Nil => Ok(None),
        Value::Bool(b) => Ok(Some(TableKey::Bool(*b))),
        Value::Int(n) => Ok(Some(TableKey::Int(*n))),
        Value::Float(x) => match TableKey::classify(&RawValue::Float(*x)) {
            KeyClass::Key(k) => Ok(Some(k)),
            _ => Ok(None),
        },
        Value::Str(s) => Ok(Some(TableKey::Str(s.clone()))),
        Value::Table(_) => Err(ExdbError::UnsupportedKey("table")),
    }
}

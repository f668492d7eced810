//! Values that cross the statement boundary.
//!
//! Binding accepts any SQLite dynamic value but only integers, floats and
//! text make it through; decoding keeps blobs, NULLs and text that is not
//! valid UTF-8 as explicit markers instead of dropping or rewriting them.

use std::fmt;

use rusqlite::types::{Value as SqlValue, ValueRef};

use super::error::DbError;

/// A value that can be bound to a parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Validate a dynamic value for parameter slot `index`.
    pub(crate) fn for_slot(index: usize, value: SqlValue) -> Result<Self, DbError> {
        match value {
            SqlValue::Integer(i) => Ok(Value::Integer(i)),
            SqlValue::Real(f) => Ok(Value::Float(f)),
            SqlValue::Text(s) => Ok(Value::Text(s)),
            SqlValue::Blob(_) => Err(DbError::UnsupportedBindType { index, kind: "blob" }),
            SqlValue::Null => Err(DbError::UnsupportedBindType { index, kind: "null" }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Integer(i) => SqlValue::Integer(i),
            Value::Float(f) => SqlValue::Real(f),
            Value::Text(s) => SqlValue::Text(s),
        }
    }
}

/// One column of a fetched row, decoded by the storage class SQLite reports
/// for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Value(Value),
    /// Binary column, not decoded.
    Blob,
    /// NULL column, not decoded.
    Null,
    /// TEXT column whose bytes are not valid UTF-8, left undecoded.
    InvalidText,
}

impl Decoded {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::Blob | Decoded::Null | Decoded::InvalidText => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Decoded::Value(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Decoded::Value(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for Decoded {
    fn from(raw: ValueRef<'_>) -> Self {
        match raw {
            ValueRef::Integer(i) => Decoded::Value(Value::Integer(i)),
            ValueRef::Real(f) => Decoded::Value(Value::Float(f)),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Decoded::Value(Value::Text(text.to_string())),
                Err(_) => Decoded::InvalidText,
            },
            ValueRef::Blob(_) => Decoded::Blob,
            ValueRef::Null => Decoded::Null,
        }
    }
}

/// A decoded result row, one entry per column.
pub type Row = Vec<Decoded>;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::loggable::{self, Loggable, TAG_BOOLEAN, TAG_FLOAT, TAG_INTEGER, TAG_STRING};

/// A dynamically typed context value.
///
/// ContextValue lets one context map carry values of mixed types, the way a
/// diagnostic context usually does (user names next to request counters next
/// to feature flags). The [`Opaque`](ContextValue::Opaque) variant holds any
/// shared handle; it is rendered and compared but never serialized.
#[derive(Clone)]
pub enum ContextValue {
    /// A 64-bit signed integer
    Integer(i64),

    /// A boolean value
    Boolean(bool),

    /// A 64-bit floating point number
    Float(f64),

    /// A UTF-8 string
    String(String),

    /// An arbitrary shared handle. Transmitted as null.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    /// Wraps any shareable value as an opaque handle.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        ContextValue::Opaque(Arc::new(value))
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ContextValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Downcasts an opaque handle to `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ContextValue::Opaque(handle) => handle.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Integer(i) => write!(f, "{}", i),
            ContextValue::Boolean(b) => write!(f, "{}", b),
            ContextValue::Float(fl) => write!(f, "{}", fl),
            ContextValue::String(s) => f.write_str(s),
            ContextValue::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            ContextValue::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            ContextValue::Float(fl) => f.debug_tuple("Float").field(fl).finish(),
            ContextValue::String(s) => f.debug_tuple("String").field(s).finish(),
            ContextValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

/// Opaque handles are equal only when they point at the same allocation.
impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ContextValue::Integer(a), ContextValue::Integer(b)) => a == b,
            (ContextValue::Boolean(a), ContextValue::Boolean(b)) => a == b,
            (ContextValue::Float(a), ContextValue::Float(b)) => a == b,
            (ContextValue::String(a), ContextValue::String(b)) => a == b,
            (ContextValue::Opaque(a), ContextValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Loggable for ContextValue {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        match self {
            ContextValue::Integer(i) => loggable::write_integer(*i, buf),
            ContextValue::Boolean(b) => loggable::write_boolean(*b, buf),
            ContextValue::Float(fl) => loggable::write_float(*fl, buf),
            ContextValue::String(s) => loggable::write_string(s, buf),
            ContextValue::Opaque(_) => return false,
        }
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        match payload.first()? {
            &TAG_INTEGER => loggable::read_integer(payload).map(ContextValue::Integer),
            &TAG_BOOLEAN => loggable::read_boolean(payload).map(ContextValue::Boolean),
            &TAG_FLOAT => loggable::read_float(payload).map(ContextValue::Float),
            &TAG_STRING => loggable::read_string(payload).map(ContextValue::String),
            _ => None,
        }
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        ContextValue::Integer(i64::from(value))
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Boolean(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_owned())
    }
}

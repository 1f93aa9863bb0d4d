//! Value, record and callback types exchanged across the module boundary.
//!
//! Everything here is transient: created at call time, read by the module
//! during the call, consumed by the caller for reporting. Ownership of a
//! [`SharedRecord`] stays with the caller; the module only reads it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Caller-supplied callable of two parameters, invoked zero or more times
/// by the module, synchronously within the call or scheduled onto the
/// cooperative queue.
pub type HostCallback = Arc<dyn Fn(&str, i64) + Send + Sync>;

/// Zero-argument callable carried inside a [`SharedRecord`].
pub type RecordAction = Arc<dyn Fn() + Send + Sync>;

/// The heterogeneous value type crossing the boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Duration(Duration),
    Null,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Map(map) => {
                // Sorted for a deterministic rendering.
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let rendered: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}: {}", k, map[k]))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Duration(d) => write!(f, "{}ms", d.as_millis()),
            Value::Null => write!(f, "null"),
        }
    }
}

/// The "plain object" passed into the module: a fixed numeric field plus a
/// callable field. The module reads the numeric field and may run the
/// action a bounded number of times during the call.
#[derive(Clone)]
pub struct SharedRecord {
    pub magnitude: f64,
    pub action: RecordAction,
}

impl SharedRecord {
    pub fn new(magnitude: f64, action: RecordAction) -> Self {
        Self { magnitude, action }
    }
}

impl fmt::Debug for SharedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRecord")
            .field("magnitude", &self.magnitude)
            .field("action", &"<callable>")
            .finish()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    #[error("Module bundle not found: {name}")]
    NotFound { name: String },
    #[error("Operation failed: {operation} - {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
    #[error("Deferred abandoned before settling")]
    Abandoned,
}

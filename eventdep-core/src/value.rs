//! Observed Values
//!
//! The instrumentation layer never hands the engine real program values. It
//! sends a coarse classification plus, for references, a numeric identity.
//! Two notifications carrying the same [`Handle`] refer to the same live
//! object (or function) in the observed program.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a live object or function in the observed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identity value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A value as reported by the instrumentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    #[default]
    Undefined,
    Null,
    /// Numbers, strings, booleans. Their contents are irrelevant to the analysis.
    Primitive,
    /// A non-function object.
    Object(Handle),
    /// A function value. Functions are objects too and can be field targets.
    Function(Handle),
}

impl Value {
    /// The identity of this value if it is a reference, `None` otherwise.
    pub fn reference(&self) -> Option<Handle> {
        match self {
            Value::Object(h) | Value::Function(h) => Some(*h),
            _ => None,
        }
    }

    /// The identity of this value if it is a function.
    pub fn function(&self) -> Option<Handle> {
        match self {
            Value::Function(h) => Some(*h),
            _ => None,
        }
    }
}

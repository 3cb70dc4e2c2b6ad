//! Values flowing between nodes and stored in the pool.

use core::fmt;
use core::slice;

use serde::{Deserialize, Serialize};

/// One emitted token: a scalar descriptor or a fixed-shape vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Real(f32),
    Vector(Vec<f32>),
}

/// The tag of a [`Value`], used in kind-mismatch errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Real,
    Vector,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Real => f.write_str("real"),
            ValueKind::Vector => f.write_str("vector"),
        }
    }
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Real(_) => ValueKind::Real,
            Value::Vector(_) => ValueKind::Vector,
        }
    }

    /// The scalar, if this is a `Real`.
    #[inline]
    pub fn as_real(&self) -> Option<f32> {
        match self {
            Value::Real(x) => Some(*x),
            Value::Vector(_) => None,
        }
    }

    /// The elements, if this is a `Vector`.
    #[inline]
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Value::Real(_) => None,
            Value::Vector(v) => Some(v),
        }
    }

    /// Either variant viewed as a slice. A `Real` is a one-element slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        match self {
            Value::Real(x) => slice::from_ref(x),
            Value::Vector(v) => v,
        }
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Real(x)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Vector(v)
    }
}

impl From<&[f32]> for Value {
    fn from(v: &[f32]) -> Self {
        Value::Vector(v.to_vec())
    }
}

//! The state tree value model.
//!
//! A state tree is an acyclic mapping from string keys to values. Each
//! value is classified at construction time as a primitive, an atomic
//! array, or a nested mapping. The classification is carried in the
//! variant tag, never inferred from the shape of the data. Atomic
//! arrays are compared and replaced as whole values; only mappings are
//! ever descended into by the diffing strategies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping from string keys to state values.
///
/// Iteration order is the key order, so diffs computed over the same
/// pair of trees are deterministic.
pub type StateMap = BTreeMap<String, Value>;

/// A leaf value in the state tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

// Floats compare by bit pattern so that state trees have a stable,
// total equality. The diffing strategies rely on `==` to decide
// whether a key changed.
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Primitive::Null, Primitive::Null) => true,
            (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
            (Primitive::Int(a), Primitive::Int(b)) => a == b,
            (Primitive::Float(a), Primitive::Float(b)) => a.to_bits() == b.to_bits(),
            (Primitive::Str(a), Primitive::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Primitive {}

/// A node in the state tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A primitive leaf.
    Primitive(Primitive),
    /// An array, treated as a single opaque value. Never diffed
    /// element-by-element.
    Atomic(Vec<Value>),
    /// A nested mapping, eligible for recursive diffing.
    Mapping(StateMap),
}

impl Eq for Value {}

impl Value {
    /// The null primitive.
    pub fn null() -> Self {
        Value::Primitive(Primitive::Null)
    }

    /// Whether this value is a mapping.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Borrow the inner mapping, if this value is one.
    pub fn as_mapping(&self) -> Option<&StateMap> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Primitive(Primitive::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Primitive(Primitive::Int(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Primitive(Primitive::Float(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Primitive(Primitive::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Primitive(Primitive::Str(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Atomic(items)
    }
}

impl From<StateMap> for Value {
    fn from(map: StateMap) -> Self {
        Value::Mapping(map)
    }
}

//! Dynamic Values
//!
//! The reactive layer works over plain, dynamically shaped data: objects with
//! named properties, arrays, and primitives. This module defines that data
//! model.
//!
//! # Equality
//!
//! `Value` equality is *strict equality*:
//!
//! - Primitives compare by value. `NaN` is not equal to itself, and `0.0`
//!   equals `-0.0`, exactly as `f64` comparison behaves.
//! - Handles (`Object`, `Observed`, `Cell`) compare by identity. A raw
//!   target and an observed wrapper of it are different values.
//!
//! Writes use this to decide whether anything changed.

mod key;
mod target;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use key::PropertyKey;
pub use target::{Target, TargetId};

use crate::reactive::{Cell, Observed};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value (missing property, empty cell).
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    /// A raw, unobserved object or array.
    Object(Target),
    /// An observed wrapper around a target.
    Observed(Observed),
    /// A reactive cell.
    Cell(Cell),
}

impl Value {
    /// Build a value from JSON. Objects and arrays become fresh raw targets.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Value::Object(Target::from_values(items.into_iter().map(Value::from_json)))
            }
            serde_json::Value::Object(props) => Value::Object(Target::from_pairs(
                props.into_iter().map(|(k, v)| (k, Value::from_json(v))),
            )),
        }
    }

    /// Untracked JSON snapshot. `Undefined` becomes `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = HashSet::new();
        self.to_json_inner(&mut path)
    }

    pub(crate) fn to_json_inner(&self, path: &mut HashSet<TargetId>) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Object(target) => target.to_json_inner(path),
            Value::Observed(observed) => observed.raw().to_json_inner(path),
            Value::Cell(cell) => cell.get_untracked().to_json_inner(path),
        }
    }

    /// Whether this is an object-like value (raw or observed target).
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Observed(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
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
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_observed(&self) -> Option<&Observed> {
        match self {
            Value::Observed(observed) => Some(observed),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            Value::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Value::Object(target) => Some(target),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Observed(a), Value::Observed(b)) => a == b,
            (Value::Cell(a), Value::Cell(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Object(target) => write!(f, "Object({})", target.id()),
            Value::Observed(observed) => write!(f, "Observed({})", observed.id()),
            Value::Cell(cell) => write!(f, "Cell({})", cell.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        Value::Object(target)
    }
}

impl From<Observed> for Value {
    fn from(observed: Observed) -> Self {
        Value::Observed(observed)
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        Value::Cell(cell)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_compare_by_value() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Null, Value::Undefined);
        assert_eq!(Value::from(0.0), Value::from(-0.0));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let nan = Value::from(f64::NAN);
        assert_ne!(nan, nan.clone());
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Target::from_pairs([("x", 1)]);
        let b = Target::from_pairs([("x", 1)]);

        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let source = json!({ "a": 1.0, "list": [true, null, "s"], "nested": { "b": 2.0 } });
        let value = Value::from_json(source.clone());

        assert!(value.as_target().is_some());
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn option_none_becomes_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::from(3));
    }
}

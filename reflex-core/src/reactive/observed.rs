//! Observed Objects
//!
//! An `Observed` wraps a raw `Target` and intercepts three operations:
//!
//! - **get**: records a dependency on `(target, key)`, then returns the
//!   stored value. Object-valued properties come back observed too, but only
//!   when read: wrapping is lazy, so `reactive` is O(1) whatever the size of
//!   the data.
//! - **set**: a write of a strictly equal value is dropped without
//!   triggering. Any other write is applied and then triggers `(target, key)`.
//! - **delete**: triggers only if the key existed and was removed.
//!
//! Wrappers hold no state of their own. Every wrapper of a target is
//! interchangeable with every other (`==` compares the target), so repeated
//! reads of the same nested object yield equal wrappers that share one set
//! of registry entries.

use std::fmt;

use super::registry::{track, trigger};
use crate::error::Result;
use crate::value::{PropertyKey, Target, TargetId, Value};

/// A tracked view of a raw target.
#[derive(Clone)]
pub struct Observed {
    target: Target,
}

impl Observed {
    /// Observe a raw target.
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    /// Build an observed object or array from JSON.
    ///
    /// Returns `None` for JSON primitives, which cannot be observed.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match Value::from_json(json) {
            Value::Object(target) => Some(Self::new(target)),
            _ => None,
        }
    }

    /// Identity shared with the underlying target.
    pub fn id(&self) -> TargetId {
        self.target.id()
    }

    /// The raw target. Reads and writes on it are not tracked.
    pub fn raw(&self) -> &Target {
        &self.target
    }

    /// Read a property, recording a dependency on it.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Value {
        let key = key.into();
        track(self.id(), key.clone());
        reactive(self.target.get(&key))
    }

    /// Read a property without recording a dependency.
    pub fn get_untracked(&self, key: impl Into<PropertyKey>) -> Value {
        reactive(self.target.get(&key.into()))
    }

    /// Write a property and re-run its dependents.
    ///
    /// Writing the value already stored is a no-op. Errors from the target
    /// (frozen object, invalid array key) are returned and nothing runs.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();

        if self.target.get(&key) == value {
            return Ok(());
        }

        self.target.set(key.clone(), value)?;
        trigger(self.id(), key);
        Ok(())
    }

    /// Delete a property. Dependents run only if something was removed.
    pub fn delete(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        let key = key.into();
        let existed = self.target.contains_key(&key);
        let deleted = self.target.delete(&key)?;

        if existed && deleted {
            trigger(self.id(), key);
        }
        Ok(deleted)
    }

    /// Untracked: whether `key` is an own property.
    pub fn contains_key(&self, key: impl Into<PropertyKey>) -> bool {
        self.target.contains_key(&key.into())
    }

    /// Untracked: own keys in enumeration order.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.target.keys()
    }

    /// Untracked: number of properties or array slots.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.target.is_array()
    }

    /// Untracked JSON snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        self.target.to_json()
    }
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target)
    }
}

impl Eq for Observed {}

impl From<Target> for Observed {
    fn from(target: Target) -> Self {
        Self::new(target)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed").field("target", &self.target).finish()
    }
}

/// Make a value reactive.
///
/// Raw objects and arrays come back observed. Everything else, including
/// values that are already observed and cells, is returned unchanged.
pub fn reactive(value: impl Into<Value>) -> Value {
    match value.into() {
        Value::Object(target) => Value::Observed(Observed::new(target)),
        other => other,
    }
}

/// Whether `value` is an observed object.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Observed(_))
}

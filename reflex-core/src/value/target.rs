//! Raw Targets
//!
//! A `Target` is the plain, unobserved storage behind every reactive object
//! or array. It knows nothing about dependency tracking: reads and writes
//! here are silent. The interception layer (`reactive::Observed`) wraps a
//! target and adds tracking on top.
//!
//! Each target carries a unique `TargetId`, which is the identity the
//! dependency registry keys on. When the last handle to a target is dropped,
//! its registry entry is released, so the registry never outlives the data
//! it describes.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{PropertyKey, Value};
use crate::error::{ReactiveError, Result};

/// Unique identity of anything the registry can key on: targets and cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shape-specific storage.
#[derive(Debug)]
enum TargetData {
    /// Insertion-ordered named properties.
    Object(IndexMap<Arc<str>, Value>),
    /// Array slots. `None` is a hole left behind by a delete.
    Array(Vec<Option<Value>>),
}

struct TargetInner {
    id: TargetId,
    data: RwLock<TargetData>,
    frozen: AtomicBool,
}

impl Drop for TargetInner {
    fn drop(&mut self) {
        crate::reactive::registry().release(self.id);
    }
}

/// A plain object or array, shared by handle.
///
/// Cloning a `Target` clones the handle, not the data.
#[derive(Clone)]
pub struct Target {
    inner: Arc<TargetInner>,
}

impl Target {
    fn with_data(data: TargetData) -> Self {
        Self {
            inner: Arc::new(TargetInner {
                id: TargetId::new(),
                data: RwLock::new(data),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Create an empty object.
    pub fn object() -> Self {
        Self::with_data(TargetData::Object(IndexMap::new()))
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Self::with_data(TargetData::Array(Vec::new()))
    }

    /// Create an object from `(name, value)` pairs, in order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let props = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_data(TargetData::Object(props))
    }

    /// Create an array from values, in order.
    pub fn from_values<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let slots = values.into_iter().map(|v| Some(v.into())).collect();
        Self::with_data(TargetData::Array(slots))
    }

    /// Get the target's identity.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Whether two handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Target) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this target is array-shaped.
    pub fn is_array(&self) -> bool {
        matches!(&*self.inner.data.read(), TargetData::Array(_))
    }

    /// Forbid all further writes and deletes.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::SeqCst);
    }

    /// Check whether the target is frozen.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    /// Number of properties (objects) or slots including holes (arrays).
    pub fn len(&self) -> usize {
        match &*self.inner.data.read() {
            TargetData::Object(props) => props.len(),
            TargetData::Array(slots) => slots.len(),
        }
    }

    /// Check whether there are no properties or slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a property. Missing properties read as `Undefined`.
    pub fn get(&self, key: &PropertyKey) -> Value {
        match &*self.inner.data.read() {
            TargetData::Object(props) => props
                .get(&*key.to_name())
                .cloned()
                .unwrap_or(Value::Undefined),
            TargetData::Array(slots) => key
                .as_index()
                .and_then(|index| slots.get(index))
                .and_then(|slot| slot.clone())
                .unwrap_or(Value::Undefined),
        }
    }

    /// Check whether a property exists as an own property.
    pub fn contains_key(&self, key: &PropertyKey) -> bool {
        match &*self.inner.data.read() {
            TargetData::Object(props) => props.contains_key(&*key.to_name()),
            TargetData::Array(slots) => key
                .as_index()
                .and_then(|index| slots.get(index))
                .is_some_and(Option::is_some),
        }
    }

    /// Own keys in enumeration order. Array holes are skipped.
    pub fn keys(&self) -> Vec<PropertyKey> {
        match &*self.inner.data.read() {
            TargetData::Object(props) => props
                .keys()
                .map(|name| PropertyKey::Name(Arc::clone(name)).normalized())
                .collect(),
            TargetData::Array(slots) => slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(|(index, _)| PropertyKey::Index(index))
                .collect(),
        }
    }

    /// Write a property.
    ///
    /// Writing past the end of an array grows it, leaving holes in between.
    /// An index that would grow the array to more than
    /// [`EngineConfig::max_array_len`](crate::config::EngineConfig::max_array_len)
    /// slots is rejected with [`ReactiveError::InvalidKey`].
    pub fn set(&self, key: PropertyKey, value: Value) -> Result<()> {
        if self.is_frozen() {
            return Err(ReactiveError::Frozen { key });
        }

        let max_len = crate::config::config().max_array_len;
        let mut data = self.inner.data.write();
        let previous = match &mut *data {
            TargetData::Object(props) => props.insert(key.to_name(), value),
            TargetData::Array(slots) => {
                let len = key
                    .as_index()
                    .and_then(|index| index.checked_add(1))
                    .filter(|&len| len <= max_len || len <= slots.len())
                    .ok_or_else(|| ReactiveError::InvalidKey { key: key.clone() })?;
                if len > slots.len() {
                    slots.resize(len, None);
                }
                slots[len - 1].replace(value)
            }
        };
        drop(data);

        // The old value may hold the last handle to another target; release
        // it outside the lock.
        drop(previous);
        Ok(())
    }

    /// Delete a property. Returns whether the property existed.
    pub fn delete(&self, key: &PropertyKey) -> Result<bool> {
        if !self.contains_key(key) {
            return Ok(false);
        }
        if self.is_frozen() {
            return Err(ReactiveError::Frozen { key: key.clone() });
        }

        let mut data = self.inner.data.write();
        let removed = match &mut *data {
            TargetData::Object(props) => props.shift_remove(&*key.to_name()),
            TargetData::Array(slots) => key
                .as_index()
                .and_then(|index| slots.get_mut(index))
                .and_then(Option::take),
        };
        drop(data);

        Ok(removed.is_some())
    }

    /// Untracked snapshot as JSON.
    ///
    /// Cells are read through, and self-referencing structures cut the
    /// cycle with `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = HashSet::new();
        self.to_json_inner(&mut path)
    }

    pub(crate) fn to_json_inner(&self, path: &mut HashSet<TargetId>) -> serde_json::Value {
        if !path.insert(self.id()) {
            return serde_json::Value::Null;
        }

        let json = match &*self.inner.data.read() {
            TargetData::Object(props) => serde_json::Value::Object(
                props
                    .iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined))
                    .map(|(k, v)| (k.to_string(), v.to_json_inner(path)))
                    .collect(),
            ),
            TargetData::Array(slots) => serde_json::Value::Array(
                slots
                    .iter()
                    .map(|slot| match slot {
                        Some(v) => v.to_json_inner(path),
                        None => serde_json::Value::Null,
                    })
                    .collect(),
            ),
        };

        path.remove(&self.id());
        json
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id())
            .field("array", &self.is_array())
            .field("len", &self.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ids_are_unique() {
        let a = Target::object();
        let b = Target::object();
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn object_get_set_delete() {
        let target = Target::object();
        let key = PropertyKey::from("a");

        assert_eq!(target.get(&key), Value::Undefined);
        target.set(key.clone(), Value::from(1)).unwrap();
        assert_eq!(target.get(&key), Value::from(1));
        assert!(target.contains_key(&key));

        assert!(target.delete(&key).unwrap());
        assert!(!target.contains_key(&key));
        assert!(!target.delete(&key).unwrap());
    }

    #[test]
    fn object_keys_keep_insertion_order() {
        let target = Target::from_pairs([("b", 2), ("a", 1), ("c", 3)]);
        let keys: Vec<String> = target.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn array_grows_with_holes() {
        let target = Target::from_values([1, 2]);
        target.set(PropertyKey::Index(4), Value::from(5)).unwrap();

        assert_eq!(target.len(), 5);
        assert!(!target.contains_key(&PropertyKey::Index(3)));
        assert_eq!(target.get(&PropertyKey::from("4")), Value::from(5));
        assert_eq!(target.keys().len(), 3);
    }

    #[test]
    fn array_rejects_indices_past_length_bound() {
        let target = Target::from_values([1, 2]);

        for key in [
            PropertyKey::Index(usize::MAX),
            PropertyKey::from("18446744073709551615"),
            PropertyKey::Index(1 << 40),
            PropertyKey::Index(crate::config::ARRAY_LEN_LIMIT),
        ] {
            let err = target.set(key, Value::from(1)).unwrap_err();
            assert!(matches!(err, ReactiveError::InvalidKey { .. }));
        }

        assert_eq!(target.len(), 2);
        assert_eq!(target.get(&PropertyKey::Index(1)), Value::from(2));
    }

    #[test]
    fn array_rejects_named_keys() {
        let target = Target::array();
        let err = target.set(PropertyKey::from("name"), Value::Null).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidKey { .. }));
    }

    #[test]
    fn array_delete_leaves_hole() {
        let target = Target::from_values(["x", "y"]);
        assert!(target.delete(&PropertyKey::Index(0)).unwrap());
        assert_eq!(target.len(), 2);
        assert_eq!(target.get(&PropertyKey::Index(0)), Value::Undefined);
        assert!(!target.delete(&PropertyKey::Index(0)).unwrap());
    }

    #[test]
    fn frozen_target_rejects_writes() {
        let target = Target::from_pairs([("a", 1)]);
        target.freeze();

        let err = target.set(PropertyKey::from("a"), Value::from(2)).unwrap_err();
        assert!(matches!(err, ReactiveError::Frozen { .. }));
        assert!(target.delete(&PropertyKey::from("a")).is_err());
        // Nothing to delete is still not an error.
        assert!(!target.delete(&PropertyKey::from("missing")).unwrap());
        assert_eq!(target.get(&PropertyKey::from("a")), Value::from(1));
    }

    #[test]
    fn json_snapshot_cuts_cycles() {
        let target = Target::from_pairs([("n", 1)]);
        target
            .set(PropertyKey::from("me"), Value::Object(target.clone()))
            .unwrap();

        assert_eq!(
            target.to_json(),
            serde_json::json!({ "n": 1, "me": null })
        );

        // Break the cycle so the storage can be freed.
        target.delete(&PropertyKey::from("me")).unwrap();
    }
}

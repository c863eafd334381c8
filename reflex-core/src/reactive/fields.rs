//! Field Projection
//!
//! Splits an observed object into one cell per field, so individual fields
//! can be handed around without losing reactivity. The handles own no
//! storage and do no tracking of their own; they forward to the observed
//! object.

use indexmap::IndexMap;

use super::cell::Cell;
use super::observed::Observed;
use crate::value::PropertyKey;

/// Field handles, shaped like the object they were taken from.
#[derive(Debug, Clone)]
pub enum FieldHandles {
    /// One handle per array slot, same length as the array.
    Array(Vec<Cell>),
    /// One handle per property, in enumeration order.
    Object(IndexMap<PropertyKey, Cell>),
}

impl FieldHandles {
    /// Look up the handle for `key`.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<&Cell> {
        let key = key.into();
        match self {
            FieldHandles::Array(cells) => key.as_index().and_then(|index| cells.get(index)),
            FieldHandles::Object(cells) => cells.get(&key.normalized()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldHandles::Array(cells) => cells.len(),
            FieldHandles::Object(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldHandles::Array(_))
    }
}

/// Project every field of `observed` into its own cell.
///
/// Keys are enumerated once, untracked; fields added later get no handle.
pub fn to_field_handles(observed: &Observed) -> FieldHandles {
    if observed.is_array() {
        let cells = (0..observed.len())
            .map(|index| Cell::field(observed.clone(), PropertyKey::Index(index)))
            .collect();
        FieldHandles::Array(cells)
    } else {
        let cells = observed
            .keys()
            .into_iter()
            .map(|key| (key.clone(), Cell::field(observed.clone(), key)))
            .collect();
        FieldHandles::Object(cells)
    }
}

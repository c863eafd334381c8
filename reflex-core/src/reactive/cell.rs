//! Reactive Cells
//!
//! A Cell is a single boxed reactive value. It exists for data that has no
//! containing object to observe, such as a lone number or string.
//!
//! A cell tracks and triggers under its own identity and the fixed key
//! `"value"`, reusing the same registry as observed objects. It keeps two
//! copies of its content:
//!
//! - the raw value last written, used for the equality check on write;
//! - the reactive form of that value (observed, if it is an object), which
//!   is what reads return.
//!
//! Cells also come in a second, storage-less kind produced by
//! [`to_field_handles`](super::to_field_handles): a handle onto one property
//! of an observed object. Reads and writes pass straight through to that
//! object, whose own tracking does all the work.
//!
//! A cell returned by [`make_derived`](super::make_derived) also carries the
//! effect that feeds it, so that it can be disposed.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::effect::Effect;
use super::observed::{reactive, Observed};
use super::registry::{registry, track, trigger};
use crate::error::Result;
use crate::value::{PropertyKey, TargetId, Value};

struct CellState {
    raw: Value,
    wrapped: Value,
}

struct CellInner {
    id: TargetId,
    state: RwLock<CellState>,
}

impl Drop for CellInner {
    fn drop(&mut self) {
        registry().release(self.id);
    }
}

#[derive(Clone)]
enum CellKind {
    /// A cell with its own storage.
    Owned(Arc<CellInner>),
    /// A handle onto `source[key]`.
    Field { source: Observed, key: PropertyKey },
}

/// A single reactive value.
///
/// Cloning a cell clones the handle; clones read and write the same value.
#[derive(Clone)]
pub struct Cell {
    kind: CellKind,
    /// The effect recomputing this cell, for derived values.
    driver: Option<Effect>,
}

impl Cell {
    fn owned(raw: Value) -> Self {
        let wrapped = reactive(raw.clone());
        Self {
            kind: CellKind::Owned(Arc::new(CellInner {
                id: TargetId::new(),
                state: RwLock::new(CellState { raw, wrapped }),
            })),
            driver: None,
        }
    }

    pub(crate) fn field(source: Observed, key: PropertyKey) -> Self {
        Self {
            kind: CellKind::Field { source, key },
            driver: None,
        }
    }

    /// Attach the effect that recomputes this cell.
    pub(crate) fn driven_by(self, effect: Effect) -> Self {
        Self {
            kind: self.kind,
            driver: Some(effect),
        }
    }

    /// The identity this cell tracks under. A field handle shares the
    /// identity of the object it projects.
    pub fn id(&self) -> TargetId {
        match &self.kind {
            CellKind::Owned(inner) => inner.id,
            CellKind::Field { source, .. } => source.id(),
        }
    }

    /// The key this cell tracks under: `"value"` for owned cells, the
    /// property name for field handles.
    pub fn key(&self) -> PropertyKey {
        match &self.kind {
            CellKind::Owned(_) => PropertyKey::value(),
            CellKind::Field { key, .. } => key.clone(),
        }
    }

    /// Whether this is a handle onto an object's property.
    pub fn is_field(&self) -> bool {
        matches!(self.kind, CellKind::Field { .. })
    }

    /// Whether this cell is recomputed by an effect.
    pub fn is_derived(&self) -> bool {
        self.driver.is_some()
    }

    /// Stop recomputing a derived value.
    ///
    /// The feeding effect is disposed, which removes it from the registry
    /// entries of everything it read. The cell keeps its last value. Once
    /// every handle is dropped, the inputs the compute function captured are
    /// dropped too. Does nothing for other cells.
    pub fn dispose(&self) {
        if let Some(effect) = &self.driver {
            effect.dispose();
        }
    }

    /// Read the value, recording a dependency on it.
    pub fn get(&self) -> Value {
        match &self.kind {
            CellKind::Owned(inner) => {
                track(inner.id, PropertyKey::value());
                inner.state.read().wrapped.clone()
            }
            CellKind::Field { source, key } => source.get(key.clone()),
        }
    }

    /// Read the value without recording a dependency.
    pub fn get_untracked(&self) -> Value {
        match &self.kind {
            CellKind::Owned(inner) => inner.state.read().wrapped.clone(),
            CellKind::Field { source, key } => source.get_untracked(key.clone()),
        }
    }

    /// Replace the value and re-run dependents.
    ///
    /// A value strictly equal to the last one written is ignored. Owned
    /// cells never fail; field handles return the error of the underlying
    /// object write.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match &self.kind {
            CellKind::Owned(inner) => {
                let mut state = inner.state.write();
                if state.raw == value {
                    return Ok(());
                }
                let wrapped = reactive(value.clone());
                let previous = std::mem::replace(&mut *state, CellState { raw: value, wrapped });
                drop(state);
                drop(previous);

                trigger(inner.id, PropertyKey::value());
                Ok(())
            }
            CellKind::Field { source, key } => source.set(key.clone(), value),
        }
    }

    /// Compute the next value from the current one (read untracked).
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = f(&self.get_untracked());
        self.set(next)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (CellKind::Owned(a), CellKind::Owned(b)) => Arc::ptr_eq(a, b),
            (
                CellKind::Field { source: a, key: ka },
                CellKind::Field { source: b, key: kb },
            ) => a == b && ka.clone().normalized() == kb.clone().normalized(),
            _ => false,
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id())
            .field("key", &self.key())
            .field("value", &self.get_untracked())
            .finish()
    }
}

/// Box a value into a reactive cell.
///
/// A value that is already a cell is returned as-is rather than boxed again.
/// Object values are stored observed, so reads through the cell are tracked
/// all the way down.
pub fn make_cell(initial: impl Into<Value>) -> Cell {
    match initial.into() {
        Value::Cell(cell) => cell,
        raw => Cell::owned(raw),
    }
}

/// Whether `value` is a cell (owned or field handle).
pub fn is_cell(value: &Value) -> bool {
    matches!(value, Value::Cell(_))
}

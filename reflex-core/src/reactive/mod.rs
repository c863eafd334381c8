//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: observed objects,
//! effects, cells, field handles and derived values.
//!
//! # Concepts
//!
//! ## Observed objects
//!
//! `reactive` wraps a raw object or array. Reading a property through the
//! wrapper inside a running computation records a dependency; writing or
//! deleting it re-runs every computation that recorded one.
//!
//! ## Effects
//!
//! `run_effect` runs a function once under tracking. Whatever it reads
//! becomes its dependencies, and it re-runs, synchronously, whenever one of
//! them is written.
//!
//! ## Cells
//!
//! A Cell is a standalone reactive value, for data with no containing object.
//! `to_field_handles` produces cells that project the fields of an observed
//! object, and `make_derived` produces a cell computed from other reactive
//! values.
//!
//! # Implementation Notes
//!
//! Tracking is implicit: the running computation is kept on a thread-local
//! context stack, and reads consult it. Dependencies live in one process-wide
//! registry keyed by `(target id, property key)`. The low-level `track` and
//! `trigger` operations are public, for building further primitives.

mod cell;
mod context;
mod derived;
mod effect;
mod fields;
mod observed;
mod registry;
mod subscriber;

pub use cell::{is_cell, make_cell, Cell};
pub use context::{untracked, ReactiveContext};
pub use derived::make_derived;
pub use effect::{run_effect, Effect};
pub use fields::{to_field_handles, FieldHandles};
pub use observed::{is_reactive, reactive, Observed};
pub use registry::{registry, track, trigger, DepRegistry, Dependents};
pub use subscriber::{Subscriber, SubscriberId};

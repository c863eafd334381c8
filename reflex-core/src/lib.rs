//! Reflex Core
//!
//! This crate provides a reactive dependency-tracking engine. It wraps plain
//! data so that reads are observed and writes re-run the computations that
//! depended on them. A computation declares its dependencies implicitly, by
//! reading properties, never through explicit subscription calls.
//!
//! It implements:
//!
//! - Observed objects and arrays with lazy deep reactivity
//! - A process-wide dependency registry (`track` / `trigger`)
//! - Effects that re-run synchronously when their inputs change
//! - Cells, field handles and derived values built on the same registry
//!
//! # Architecture
//!
//! - `value`: the dynamic data model (values, keys, raw targets)
//! - `reactive`: tracking context, registry and reactive primitives
//! - `config`: process-wide engine settings
//! - `error`: error taxonomy for failed writes and bad configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use reflex_core::reactive::{make_derived, run_effect, Observed};
//! use serde_json::json;
//!
//! let state = Observed::from_json(json!({ "count": 1 })).unwrap();
//!
//! // Create a derived value
//! let doubled = make_derived({
//!     let state = state.clone();
//!     move || state.get("count").as_f64().unwrap_or(0.0) * 2.0
//! });
//!
//! // Create an effect
//! run_effect({
//!     let doubled = doubled.clone();
//!     move || println!("doubled: {:?}", doubled.get())
//! });
//!
//! // Update the state
//! state.set("count", 5)?;
//! // Effect automatically runs, prints: "doubled: Number(10)"
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod value;

pub use config::{configure, EngineConfig};
pub use error::{ReactiveError, Result};
pub use reactive::{
    is_cell, is_reactive, make_cell, make_derived, reactive, run_effect, to_field_handles, track,
    trigger, untracked, Cell, Effect, FieldHandles, Observed,
};
pub use value::{PropertyKey, Target, TargetId, Value};

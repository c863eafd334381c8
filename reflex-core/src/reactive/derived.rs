//! Derived Values
//!
//! A derived value is a cell fed by an effect. The effect evaluates the
//! compute function, which records whatever it reads, and writes the result
//! into the cell. Whenever one of those reads is written elsewhere, the
//! effect re-runs and the cell is updated, which in turn re-runs anything
//! that reads the cell.
//!
//! Evaluation is eager: the function runs once when the derived value is
//! created and again on every relevant write, whether or not the result is
//! ever read. Results strictly equal to the previous one do not propagate.
//!
//! The effect lives as long as the returned cell and its clones. Until
//! [`Cell::dispose`] is called it stays subscribed to its inputs, and the
//! inputs captured by the compute function stay alive.

use super::cell::{make_cell, Cell};
use super::effect::run_effect;
use crate::value::Value;

/// Create a cell whose value is recomputed from `compute`.
///
/// The returned cell is read-only by convention. Writing to it works, but
/// the next recomputation overwrites the written value. Call
/// [`Cell::dispose`] to stop recomputing.
///
/// # Example
///
/// ```rust,ignore
/// let state = Observed::from_json(json!({ "a": 1 })).unwrap();
/// let doubled = make_derived({
///     let state = state.clone();
///     move || state.get("a").as_f64().unwrap_or(0.0) * 2.0
/// });
///
/// assert_eq!(doubled.get(), Value::from(2));
/// state.set("a", 5)?;
/// assert_eq!(doubled.get(), Value::from(10));
/// ```
pub fn make_derived<F, T>(compute: F) -> Cell
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Into<Value>,
{
    let cell = make_cell(Value::Undefined);
    let output = cell.clone();

    let effect = run_effect(move || {
        // Writing an owned cell cannot fail.
        if let Err(err) = output.set(compute()) {
            tracing::warn!(%err, cell = %output.id(), "derived value update failed");
        }
    });

    cell.driven_by(effect)
}

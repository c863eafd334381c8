//! Effect Implementation
//!
//! An Effect is a computation whose dependencies are discovered by running
//! it. Every reactive read it performs while running is recorded; a later
//! write to any of those properties runs it again.
//!
//! # How Effects Work
//!
//! 1. `run_effect` runs the function once, immediately, inside a reactive
//!    context, so its reads are attributed to it.
//!
//! 2. When a dependency is written, the registry invokes the function
//!    directly and synchronously, inside the write.
//!
//! 3. Dependencies only accumulate. A re-run that takes a different code
//!    path keeps the dependencies recorded by earlier runs.
//!
//! # Disposal
//!
//! The returned `Effect` handle does not need to be kept: the registry owns
//! the computation for as long as something it read is alive. Calling
//! `dispose` removes it from the registry and turns any pending invocation
//! into a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::context::ReactiveContext;
use super::registry::registry;
use super::subscriber::{Subscriber, SubscriberId};

/// Handle to a computation started with [`run_effect`].
#[derive(Clone)]
pub struct Effect {
    /// The subscriber the registry stores and invokes.
    subscriber: Subscriber,

    /// Whether the effect has been disposed.
    disposed: Arc<AtomicBool>,

    /// Number of times the effect has run, including the first run.
    run_count: Arc<AtomicUsize>,
}

impl Effect {
    fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let disposed = Arc::new(AtomicBool::new(false));
        let run_count = Arc::new(AtomicUsize::new(0));

        let subscriber = {
            let disposed = Arc::clone(&disposed);
            let run_count = Arc::clone(&run_count);
            Subscriber::new(move || {
                if disposed.load(Ordering::SeqCst) {
                    return;
                }
                run_count.fetch_add(1, Ordering::SeqCst);
                run();
            })
        };

        Self {
            subscriber,
            disposed,
            run_count,
        }
    }

    /// Run the computation inside its own reactive context.
    fn execute(&self) {
        let _ctx = ReactiveContext::enter(self.subscriber.clone());
        tracing::trace!(subscriber = %self.subscriber.id(), "running effect");
        self.subscriber.run();
    }

    /// Get the subscriber ID for this effect.
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Remove the effect from the registry. It will not run again.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            registry().remove_subscriber(self.subscriber.id());
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` once under dependency tracking and keep it subscribed.
///
/// The active context is restored when `f` returns or panics.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "count": 0 }));
/// let state = state.as_observed().unwrap().clone();
///
/// run_effect({
///     let state = state.clone();
///     move || println!("count = {:?}", state.get("count"))
/// });
///
/// state.set("count", 1)?; // prints "count = Number(1)"
/// ```
pub fn run_effect<F>(f: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    let effect = Effect::new(f);
    effect.execute();
    effect
}

//! Reactive Context
//!
//! The reactive context tracks which computation is currently running, so
//! that a property read can be attributed to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an effect pushes its subscriber;
//! the returned guard pops it on drop, including during unwinding, so a
//! panicking computation never leaves a stale entry behind.
//!
//! Because this is a stack and not a single slot, an effect started from
//! inside another effect tracks into the inner computation and, once it
//! returns, reads are attributed to the outer one again.
//!
//! An entry may also carry no subscriber at all: that is how `untracked`
//! suspends tracking for a stretch of code.

use std::cell::RefCell;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Subscriber>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a context in which reads are attributed to `subscriber`.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(subscriber: Subscriber) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { subscriber_id }
    }

    /// Enter a context in which reads are not attributed to anything.
    pub fn enter_untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { subscriber_id: None }
    }

    /// Check if there is an active computation to attribute reads to.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the active subscriber, if any.
    pub fn current() -> Option<Subscriber> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Get the active subscriber's ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(Subscriber::id))
        })
    }

    /// Number of entries on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        // Verify we're popping the right context.
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.as_ref().map(Subscriber::id),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }

        // The popped subscriber may own the last reference to its closure.
        // Drop it outside the thread-local borrow.
        drop(popped);
    }
}

/// Run `f` without attributing any reads to the active computation.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let subscriber = Subscriber::new(|| {});
        let id = subscriber.id();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(subscriber);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts() {
        let outer = Subscriber::new(|| {});
        let inner = Subscriber::new(|| {});
        let (outer_id, inner_id) = (outer.id(), inner.id());

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(inner_id));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_suspends_tracking() {
        let _ctx = ReactiveContext::enter(Subscriber::new(|| {}));
        assert!(ReactiveContext::is_active());

        let inside = untracked(ReactiveContext::is_active);
        assert!(!inside);
        assert!(ReactiveContext::is_active());
    }

    #[test]
    fn guard_pops_during_unwind() {
        let depth = ReactiveContext::depth();

        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(Subscriber::new(|| {}));
            panic!("computation failed");
        });

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), depth);
        assert!(!ReactiveContext::is_active());
    }
}

//! Dependency Registry
//!
//! The registry is the central store that connects reads to writes. It maps
//! every `(target, key)` pair that has been read inside a computation to the
//! set of computations that read it.
//!
//! # How It Works
//!
//! 1. When a computation reads `observed.key`, the registry records the
//!    active subscriber under `(target id, key)`.
//!
//! 2. When `observed.key` is written, the registry looks up the same pair
//!    and runs every recorded subscriber, synchronously, in the order they
//!    were first recorded.
//!
//! Recording is idempotent: a subscriber that reads the same property twice
//! (or re-runs and reads it again) is stored once and runs once per trigger.
//!
//! # Lifetime of entries
//!
//! Entries are keyed by `TargetId`, not by a strong handle, so the registry
//! never keeps data alive. Dropping the last handle to a target or cell
//! releases its entry through [`DepRegistry::release`]. Disposing an effect
//! removes it from every entry it appears in.
//!
//! # Thread Safety
//!
//! The process-wide registry is a sharded concurrent map. No shard lock is
//! held while a subscriber runs, so subscribers are free to read and write
//! reactive values themselves.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::value::{PropertyKey, TargetId};

/// Subscribers of one property, in first-recorded order.
type DepSet = IndexMap<SubscriberId, Subscriber>;

/// Per-target map of property key to subscribers.
type DepsMap = IndexMap<PropertyKey, DepSet>;

/// Snapshot of a dependency set, taken before running it.
pub type Dependents = SmallVec<[Subscriber; 4]>;

thread_local! {
    /// How many `notify` calls for each `(target, key)` are currently nested
    /// on this thread.
    static ACTIVE_TRIGGERS: RefCell<HashMap<(TargetId, PropertyKey), usize>> =
        RefCell::new(HashMap::new());
}

/// Counts one nested trigger of `(target, key)` for as long as it lives.
struct DepthGuard {
    slot: (TargetId, PropertyKey),
}

impl DepthGuard {
    /// Returns the guard and how many triggers of the same pair were
    /// already running.
    fn enter(target: TargetId, key: PropertyKey) -> (Self, usize) {
        let slot = (target, key);
        let depth = ACTIVE_TRIGGERS.with(|active| {
            let mut active = active.borrow_mut();
            let count = active.entry(slot.clone()).or_insert(0);
            *count += 1;
            *count - 1
        });
        (Self { slot }, depth)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        ACTIVE_TRIGGERS.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(count) = active.get_mut(&self.slot) {
                *count -= 1;
                if *count == 0 {
                    active.remove(&self.slot);
                }
            }
        });
    }
}

/// A store of `(target, key) -> subscribers` dependencies.
///
/// Most code uses the process-wide instance through [`track`] and
/// [`trigger`]. Separate instances are useful for isolation.
#[derive(Default)]
pub struct DepRegistry {
    targets: DashMap<TargetId, DepsMap>,
}

impl DepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the active computation depends on `(target, key)`.
    ///
    /// Does nothing when no computation is active.
    pub fn record(&self, target: TargetId, key: impl Into<PropertyKey>) {
        if let Some(subscriber) = ReactiveContext::current() {
            self.record_for(target, key, &subscriber);
        }
    }

    /// Record that `subscriber` depends on `(target, key)`.
    pub fn record_for(&self, target: TargetId, key: impl Into<PropertyKey>, subscriber: &Subscriber) {
        let key = key.into().normalized();
        let mut inserted = false;

        self.targets
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .entry(subscriber.id())
            .or_insert_with(|| {
                inserted = true;
                subscriber.clone()
            });

        if inserted {
            tracing::trace!(%target, %key, subscriber = %subscriber.id(), "dependency recorded");
        }
    }

    /// Snapshot the subscribers of `(target, key)` in insertion order.
    pub fn dependents(&self, target: TargetId, key: impl Into<PropertyKey>) -> Dependents {
        let key = key.into().normalized();
        self.targets
            .get(&target)
            .and_then(|deps| deps.get(&key).map(|set| set.values().cloned().collect()))
            .unwrap_or_default()
    }

    /// Run every subscriber of `(target, key)`.
    ///
    /// Subscribers are invoked directly, not through the effect runner: they
    /// run with whatever context is active at trigger time. Each runs once
    /// per call, in the order it was first recorded.
    ///
    /// A trigger of `(target, key)` nested inside another trigger of the
    /// same pair more than `max_trigger_depth` times is dropped with an
    /// error log.
    pub fn notify(&self, target: TargetId, key: impl Into<PropertyKey>) {
        let key = key.into().normalized();
        let dependents = self.dependents(target, key.clone());
        if dependents.is_empty() {
            return;
        }

        let (_guard, depth) = DepthGuard::enter(target, key.clone());
        let max_depth = crate::config::config().max_trigger_depth;
        if depth >= max_depth {
            tracing::error!(
                %target,
                %key,
                depth,
                max_depth,
                "trigger depth limit reached, dependents not run (does a computation write what it reads?)"
            );
            return;
        }

        tracing::trace!(%target, %key, dependents = dependents.len(), "triggering dependents");
        for subscriber in &dependents {
            subscriber.run();
        }
    }

    /// Number of subscribers recorded for `(target, key)`.
    pub fn dependent_count(&self, target: TargetId, key: impl Into<PropertyKey>) -> usize {
        let key = key.into().normalized();
        self.targets
            .get(&target)
            .and_then(|deps| deps.get(&key).map(IndexMap::len))
            .unwrap_or(0)
    }

    /// Whether anything is recorded for `target`.
    pub fn contains_target(&self, target: TargetId) -> bool {
        self.targets.contains_key(&target)
    }

    /// Number of targets with at least one recorded dependency.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Drop every dependency recorded for `target`.
    ///
    /// Called automatically when a target or cell is dropped.
    pub fn release(&self, target: TargetId) {
        // The removed map is dropped after the shard lock is released: it
        // may own the last handle to other targets, whose own release would
        // otherwise contend for the same shard.
        let removed = self.targets.remove(&target);
        if let Some((_, deps)) = removed {
            tracing::debug!(%target, keys = deps.len(), "registry entry released");
        }
    }

    /// Remove `subscriber` from every dependency set.
    pub fn remove_subscriber(&self, subscriber: SubscriberId) {
        let mut removed = Vec::new();

        for mut entry in self.targets.iter_mut() {
            let deps = entry.value_mut();
            for set in deps.values_mut() {
                if let Some(sub) = set.shift_remove(&subscriber) {
                    removed.push(sub);
                }
            }
            deps.retain(|_, set| !set.is_empty());
        }
        self.targets.retain(|_, deps| !deps.is_empty());

        tracing::debug!(%subscriber, entries = removed.len(), "subscriber removed");
        drop(removed);
    }

    /// Drop everything.
    pub fn clear(&self) {
        let ids: Vec<TargetId> = self.targets.iter().map(|entry| *entry.key()).collect();
        let removed: Vec<_> = ids.into_iter().filter_map(|id| self.targets.remove(&id)).collect();
        tracing::debug!(targets = removed.len(), "registry cleared");
        drop(removed);
    }
}

static REGISTRY: OnceLock<DepRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn registry() -> &'static DepRegistry {
    REGISTRY.get_or_init(DepRegistry::new)
}

/// Record that the active computation depends on `(target, key)`.
///
/// This is the building block for custom reactive primitives: call it from
/// a read path. Does nothing outside a computation.
pub fn track(target: TargetId, key: impl Into<PropertyKey>) {
    registry().record(target, key);
}

/// Run every computation that depends on `(target, key)`.
///
/// The write-path counterpart of [`track`].
pub fn trigger(target: TargetId, key: impl Into<PropertyKey>) {
    registry().notify(target, key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting_subscriber() -> (Subscriber, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let subscriber = Subscriber::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (subscriber, count)
    }

    #[test]
    fn record_without_active_computation_is_noop() {
        let registry = DepRegistry::new();
        let target = TargetId::new();

        registry.record(target, "a");

        assert_eq!(registry.dependent_count(target, "a"), 0);
        assert!(!registry.contains_target(target));
    }

    #[test]
    fn record_uses_active_computation() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let (subscriber, count) = counting_subscriber();

        {
            let _ctx = ReactiveContext::enter(subscriber);
            registry.record(target, "a");
        }

        assert_eq!(registry.dependent_count(target, "a"), 1);
        registry.notify(target, "a");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let (subscriber, count) = counting_subscriber();

        registry.record_for(target, "a", &subscriber);
        registry.record_for(target, "a", &subscriber);
        registry.record_for(target, "a", &subscriber.clone());

        assert_eq!(registry.dependent_count(target, "a"), 1);
        registry.notify(target, "a");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_runs_in_insertion_order() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            let subscriber = Subscriber::new(move || order.lock().unwrap().push(n));
            registry.record_for(target, "k", &subscriber);
        }

        registry.notify(target, "k");
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn notify_unknown_key_is_noop() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let (subscriber, count) = counting_subscriber();
        registry.record_for(target, "a", &subscriber);

        registry.notify(target, "b");
        registry.notify(TargetId::new(), "a");

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn keys_are_normalized() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let (subscriber, count) = counting_subscriber();

        registry.record_for(target, "0", &subscriber);
        registry.notify(target, 0usize);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_drops_target_entry() {
        let registry = DepRegistry::new();
        let target = TargetId::new();
        let (subscriber, count) = counting_subscriber();
        registry.record_for(target, "a", &subscriber);

        registry.release(target);

        assert!(!registry.contains_target(target));
        registry.notify(target, "a");
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_subscriber_prunes_empty_entries() {
        let registry = DepRegistry::new();
        let (t1, t2) = (TargetId::new(), TargetId::new());
        let (gone, _) = counting_subscriber();
        let (kept, kept_count) = counting_subscriber();

        registry.record_for(t1, "a", &gone);
        registry.record_for(t2, "a", &gone);
        registry.record_for(t2, "a", &kept);

        registry.remove_subscriber(gone.id());

        assert!(!registry.contains_target(t1));
        assert_eq!(registry.dependent_count(t2, "a"), 1);
        registry.notify(t2, "a");
        assert_eq!(kept_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_empties_registry() {
        let registry = DepRegistry::new();
        let (subscriber, _) = counting_subscriber();
        registry.record_for(TargetId::new(), "a", &subscriber);
        registry.record_for(TargetId::new(), "b", &subscriber);
        assert_eq!(registry.target_count(), 2);

        registry.clear();
        assert_eq!(registry.target_count(), 0);
    }

    #[test]
    fn runaway_triggers_stop_at_depth_limit() {
        let registry = Arc::new(DepRegistry::new());
        let target = TargetId::new();
        let count = Arc::new(AtomicI32::new(0));

        let registry_clone = registry.clone();
        let count_clone = count.clone();
        let subscriber = Subscriber::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            registry_clone.notify(target, "loop");
        });
        registry.record_for(target, "loop", &subscriber);

        registry.notify(target, "loop");

        let runs = count.load(Ordering::SeqCst) as usize;
        assert!(runs >= 1);
        assert!(runs <= crate::config::config().max_trigger_depth);

        // Break the Arc cycle between the registry and the subscriber.
        registry.clear();
    }

    #[test]
    fn long_acyclic_chain_is_not_cut_off() {
        let links = crate::config::DEFAULT_MAX_TRIGGER_DEPTH + 44;

        // Every link nests one more `notify`; give the chain room to recurse.
        let handle = std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(move || {
                let registry = Arc::new(DepRegistry::new());
                let targets: Vec<TargetId> = (0..=links).map(|_| TargetId::new()).collect();
                let reached = Arc::new(AtomicI32::new(0));

                for (i, pair) in targets.windows(2).enumerate() {
                    let (from, to) = (pair[0], pair[1]);
                    let registry_clone = registry.clone();
                    let reached_clone = reached.clone();
                    let subscriber = Subscriber::new(move || {
                        reached_clone.store(i as i32 + 1, Ordering::SeqCst);
                        registry_clone.notify(to, "n");
                    });
                    registry.record_for(from, "n", &subscriber);
                }

                registry.notify(targets[0], "n");
                let reached = reached.load(Ordering::SeqCst) as usize;
                registry.clear();
                reached
            })
            .unwrap();

        assert_eq!(handle.join().unwrap(), links);
    }
}

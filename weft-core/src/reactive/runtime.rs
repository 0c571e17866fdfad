//! Reactive Runtime
//!
//! The runtime is the boundary between the dependency-tracking core and
//! whatever intercepts reads and writes of state (the "observable
//! accessor"). The accessor makes two calls:
//!
//! 1. On every read, [`Runtime::track`]: if a computation is running, it is
//!    subscribed to the key and the key's subscriber set is appended to the
//!    computation's edge list.
//!
//! 2. After every write, [`Runtime::trigger`]: the key's subscribers are
//!    copied into a notify-set and each one is handed to its scheduler hook
//!    or re-run synchronously.
//!
//! # Notification Rules
//!
//! - The notify-set is a snapshot. Subscriptions added or removed while the
//!   round runs do not affect it.
//! - The computation on top of the execution stack is left out of the
//!   notify-set. A body that reads and then writes the same key does not
//!   re-enter itself.
//! - Deeper cycles (A writes what B reads, B writes what A reads) are
//!   bounded by [`RuntimeConfig::max_reentrancy`]; see
//!   [`Effect::run`](super::Effect::run).
//!
//! # Thread Safety
//!
//! All runtime state is thread-local, and every handle built on it is
//! `!Send`. Each thread that uses the crate gets an independent runtime.

use std::cell::RefCell;

use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::key::{ObservableKey, PropertyKey, TargetId};
use super::store::DepStore;
use crate::config::RuntimeConfig;

thread_local! {
    static STORE: RefCell<DepStore> = RefCell::new(DepStore::new());
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Install `config` for the current thread.
    pub fn configure(config: RuntimeConfig) {
        CONFIG.with(|current| *current.borrow_mut() = config);
    }

    /// The configuration in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(|current| current.borrow().clone())
    }

    /// Record a read of `key` by the running computation, if any.
    ///
    /// Reads outside any computation are untracked.
    pub fn track(key: &ObservableKey) {
        let Some(active) = ReactiveContext::current() else {
            return;
        };

        if CONFIG.with(|config| config.borrow().log_reads) {
            trace!(%key, subscriber = %active.id(), "tracked read");
        }

        let joined = STORE.with(|store| store.borrow_mut().subscribe(key, &active));
        if let Some(set) = joined {
            trace!(%key, subscriber = %active.id(), "subscribed");
            active.link(set);
        }
    }

    /// Notify every computation subscribed to `key`.
    ///
    /// Call after the write has been applied, so re-runs observe it.
    pub fn trigger(key: &ObservableKey) {
        let Some(set) = STORE.with(|store| store.borrow().subscribers_of(key)) else {
            return;
        };

        let active = ReactiveContext::current_subscriber();
        let notify: Vec<_> = set
            .snapshot()
            .into_iter()
            .filter(|subscriber| Some(subscriber.id()) != active)
            .collect();

        if notify.is_empty() {
            return;
        }
        debug!(%key, count = notify.len(), "trigger");

        for subscriber in notify {
            subscriber.notify();
        }
    }

    /// Host hook for a property read: `track(target.key)`.
    pub fn on_read(target: TargetId, key: impl Into<PropertyKey>) {
        Self::track(&ObservableKey::new(target, key));
    }

    /// Host hook for a property write: `trigger(target.key)`.
    ///
    /// The host applies the mutation before calling this.
    pub fn on_write(target: TargetId, key: impl Into<PropertyKey>) {
        Self::trigger(&ObservableKey::new(target, key));
    }

    /// Evict every subscriber set of `target`.
    ///
    /// Targets call this when they are reclaimed. Computations that still
    /// list an evicted set on their edge list drop it at their next run.
    pub fn forget_target(target: TargetId) {
        // The thread-local may already be gone when a target drops during
        // thread teardown; nothing is left to evict then.
        let evicted = STORE
            .try_with(|store| store.borrow_mut().forget_target(target))
            .unwrap_or(0);
        if evicted > 0 {
            debug!(%target, evicted, "forgot target");
        }
    }

    /// Number of computations subscribed to `key`.
    pub fn subscriber_count(key: &ObservableKey) -> usize {
        STORE.with(|store| {
            store
                .borrow()
                .subscribers_of(key)
                .map_or(0, |set| set.len())
        })
    }

    /// Check whether computation `id` is subscribed to `key`.
    pub fn is_subscribed(key: &ObservableKey, id: super::SubscriberId) -> bool {
        STORE.with(|store| {
            store
                .borrow()
                .subscribers_of(key)
                .is_some_and(|set| set.contains(id))
        })
    }

    /// Number of targets the store holds subscriber sets for.
    pub fn tracked_target_count() -> usize {
        STORE.with(|store| store.borrow().target_count())
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<super::SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that can be credited with reads and
//! notified when what it read changes. Effects, computed values and
//! watchers are all subscribers underneath.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::store::{Edges, SubscriberSet};

/// Unique identifier for a subscriber.
///
/// Each computation gets a unique ID when created. Subscriber sets are keyed
/// by it, which is what makes subscription idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter so IDs stay unique across threads, even though
    /// every runtime is thread-local.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A computation as seen by the dependency store and the trigger path.
///
/// Implementors own their edge list: the subscriber sets they joined during
/// their latest run.
pub(crate) trait Subscriber {
    /// The subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// Record that this subscriber joined `set` during the current run.
    fn link(&self, set: Rc<SubscriberSet>);

    /// Detach and return the edge list accumulated so far.
    fn take_edges(&self) -> Edges;

    /// React to a change in one of the subscriber's dependencies.
    ///
    /// Either hands the computation to its scheduler hook or re-runs it.
    fn notify(self: Rc<Self>);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Minimal subscriber that counts notifications.
    pub(crate) struct Probe {
        pub(crate) id: SubscriberId,
        pub(crate) edges: RefCell<Edges>,
        pub(crate) notified: Cell<usize>,
    }

    impl Probe {
        pub(crate) fn new() -> Rc<Self> {
            Rc::new(Self {
                id: SubscriberId::new(),
                edges: RefCell::new(Edges::new()),
                notified: Cell::new(0),
            })
        }
    }

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn link(&self, set: Rc<SubscriberSet>) {
            self.edges.borrow_mut().push(set);
        }

        fn take_edges(&self) -> Edges {
            std::mem::take(&mut *self.edges.borrow_mut())
        }

        fn notify(self: Rc<Self>) {
            self.notified.set(self.notified.get() + 1);
        }
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_display_with_prefix() {
        let id = SubscriberId::new();
        assert_eq!(id.to_string(), format!("#{}", id.raw()));
    }

    #[test]
    fn probe_counts_notifications() {
        let probe = Probe::new();
        Rc::clone(&probe).notify();
        Rc::clone(&probe).notify();
        assert_eq!(probe.notified.get(), 2);
    }
}

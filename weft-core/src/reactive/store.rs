//! Dependency Store
//!
//! Maps every observable key to the set of computations currently
//! subscribed to it:
//!
//! ```text
//! TargetId ──► PropertyKey ──► SubscriberSet { SubscriberId ──► Weak<dyn Subscriber> }
//! ```
//!
//! Subscriber sets are shared (`Rc`) between the store and the edge lists of
//! their members. Cleanup walks a computation's own edge list instead of
//! scanning the store, so it costs O(dependencies of that computation).
//!
//! The store owns neither targets nor computations. Targets are referenced
//! by [`TargetId`] and evicted through [`DepStore::forget_target`];
//! computations are held weakly and simply disappear from a notify-set once
//! their last handle is gone.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::key::{ObservableKey, PropertyKey, TargetId};
use super::subscriber::{Subscriber, SubscriberId};

/// A computation's edge list. Most computations read only a handful of keys.
pub(crate) type Edges = SmallVec<[Rc<SubscriberSet>; 4]>;

/// The computations subscribed to one observable key.
///
/// Members keep insertion order, so notification order is reproducible.
pub(crate) struct SubscriberSet {
    key: ObservableKey,
    members: RefCell<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl SubscriberSet {
    fn new(key: ObservableKey) -> Self {
        Self {
            key,
            members: RefCell::new(IndexMap::new()),
        }
    }

    /// The key this set belongs to.
    pub(crate) fn key(&self) -> &ObservableKey {
        &self.key
    }

    /// Add a member. Returns false if it was already present.
    pub(crate) fn insert(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        let mut members = self.members.borrow_mut();
        if members.contains_key(&subscriber.id()) {
            return false;
        }
        members.insert(subscriber.id(), Rc::downgrade(subscriber));
        true
    }

    pub(crate) fn remove(&self, id: SubscriberId) {
        self.members.borrow_mut().shift_remove(&id);
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.members.borrow().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.members.borrow().len()
    }

    /// Copy out the live members.
    ///
    /// Notification iterates this copy, never the set itself: the members it
    /// runs will unsubscribe and resubscribe while the round is in progress.
    pub(crate) fn snapshot(&self) -> Vec<Rc<dyn Subscriber>> {
        self.members
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("key", &self.key)
            .field("members", &self.members.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-target subscriber sets.
#[derive(Debug, Default)]
pub(crate) struct DepStore {
    targets: HashMap<TargetId, HashMap<PropertyKey, Rc<SubscriberSet>>>,
}

impl DepStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribe `subscriber` to `key`, creating the set on first use.
    ///
    /// Returns the set when the subscriber was newly added, so the caller
    /// can append it to the subscriber's edge list. Returns `None` when the
    /// subscriber was already a member.
    pub(crate) fn subscribe(
        &mut self,
        key: &ObservableKey,
        subscriber: &Rc<dyn Subscriber>,
    ) -> Option<Rc<SubscriberSet>> {
        let set = self
            .targets
            .entry(key.target)
            .or_default()
            .entry(key.key.clone())
            .or_insert_with(|| Rc::new(SubscriberSet::new(key.clone())));

        set.insert(subscriber).then(|| Rc::clone(set))
    }

    /// Remove `subscriber` from every set on its edge list.
    ///
    /// Leaves the edge list empty.
    pub(crate) fn unsubscribe_all(subscriber: &dyn Subscriber) {
        let id = subscriber.id();
        for set in subscriber.take_edges() {
            set.remove(id);
        }
    }

    /// The current subscriber set for `key`, if anyone ever subscribed.
    pub(crate) fn subscribers_of(&self, key: &ObservableKey) -> Option<Rc<SubscriberSet>> {
        self.targets
            .get(&key.target)
            .and_then(|props| props.get(&key.key))
            .cloned()
    }

    /// Drop every set belonging to `target`.
    ///
    /// Returns the number of sets evicted.
    pub(crate) fn forget_target(&mut self, target: TargetId) -> usize {
        self.targets.remove(&target).map_or(0, |props| props.len())
    }

    /// Number of targets with at least one subscriber set.
    pub(crate) fn target_count(&self) -> usize {
        self.targets.len()
    }
}

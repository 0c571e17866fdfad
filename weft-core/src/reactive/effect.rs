//! Effect Implementation
//!
//! An Effect is a re-runnable computation that keeps track of what it read.
//! It is the building block for everything else: computed values and
//! watchers are effects with a particular scheduler.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately (unless created
//!    with [`EffectOptions::deferred`]) to establish initial dependencies.
//!
//! 2. Each run starts by leaving every subscriber set the previous run
//!    joined, then runs the body inside a [`ReactiveContext`] so every read
//!    subscribes it afresh. A body that switches branches (reads `a` on one
//!    run and `b` on the next) therefore never keeps a stale subscription.
//!
//! 3. When a dependency changes, the effect's scheduler hook is called with
//!    the effect, or, without a hook, the effect re-runs synchronously.
//!
//! # Failure
//!
//! If the body panics, the panic propagates to whoever started the run (the
//! caller of [`Effect::run`], or the writer whose trigger notified it). By
//! then the stale edges are already gone and the context guard pops the
//! execution stack during unwinding, so unrelated computations keep working.
//!
//! # Ownership
//!
//! Subscriber sets hold effects weakly. An effect lives as long as one of
//! its handles; dropping the last handle unsubscribes it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace_span, warn};

use super::context::ReactiveContext;
use super::key::ObservableKey;
use super::runtime::Runtime;
use super::store::{DepStore, Edges, SubscriberSet};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::ReactiveError;

/// Hook that replaces the immediate re-run of a notified effect.
///
/// It receives the effect and decides whether and when to run it.
pub type Scheduler<T> = Rc<dyn Fn(&Effect<T>)>;

/// Options recognized when creating an effect.
pub struct EffectOptions<T: 'static> {
    /// Do not run at creation.
    pub deferred_start: bool,
    /// Called instead of re-running when a dependency changes.
    pub scheduler: Option<Scheduler<T>>,
    /// Label attached to the effect's tracing span.
    pub name: Option<String>,
}

impl<T: 'static> EffectOptions<T> {
    pub fn new() -> Self {
        Self {
            deferred_start: false,
            scheduler: None,
            name: None,
        }
    }

    /// Do not run the effect at creation.
    pub fn deferred(mut self) -> Self {
        self.deferred_start = true;
        self
    }

    /// Route notifications through `scheduler`.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&Effect<T>) + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<T: 'static> Default for EffectOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for EffectOptions<T> {
    fn clone(&self) -> Self {
        Self {
            deferred_start: self.deferred_start,
            scheduler: self.scheduler.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for EffectOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("deferred_start", &self.deferred_start)
            .field("has_scheduler", &self.scheduler.is_some())
            .field("name", &self.name)
            .finish()
    }
}

struct EffectInner<T: 'static> {
    id: SubscriberId,
    body: Box<dyn Fn() -> T>,
    options: EffectOptions<T>,
    /// Subscriber sets joined during the latest run.
    edges: RefCell<Edges>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
    this: Weak<EffectInner<T>>,
}

impl<T: 'static> Subscriber for EffectInner<T> {
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
        if self.disposed.get() {
            return;
        }
        let effect = Effect { inner: self };
        match effect.inner.options.scheduler.clone() {
            Some(scheduler) => scheduler(&effect),
            None => {
                if let Err(err) = effect.run() {
                    warn!(%err, "skipped notified run");
                }
            }
        }
    }
}

impl<T: 'static> Drop for EffectInner<T> {
    fn drop(&mut self) {
        for set in self.edges.get_mut().drain(..) {
            set.remove(self.id);
        }
    }
}

/// A re-runnable computation with tracked dependencies.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_core::reactive::{Effect, Ref};
///
/// let count = Ref::new(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let effect = Effect::new({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// # drop(effect);
/// ```
#[must_use = "an effect is disposed when its last handle is dropped"]
pub struct Effect<T: 'static = ()> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it once.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::with_options(body, EffectOptions::new())
    }

    /// Create an effect without running it.
    pub fn new_lazy<F>(body: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::with_options(body, EffectOptions::new().deferred())
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(body: F, options: EffectOptions<T>) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let deferred = options.deferred_start;
        let inner = Rc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            body: Box::new(body),
            options,
            edges: RefCell::new(Edges::new()),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
            this: this.clone(),
        });
        let effect = Self { inner };

        if !deferred {
            if let Err(err) = effect.run() {
                warn!(%err, "initial run refused");
            }
        }

        effect
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the body now and return its result.
    ///
    /// Stale subscriptions from the previous run are dropped first, and the
    /// run is tracked afresh.
    ///
    /// # Errors
    ///
    /// - [`ReactiveError::Disposed`] after [`dispose`](Self::dispose).
    /// - [`ReactiveError::ReentrancyLimit`] if this effect is already on the
    ///   execution stack more than `max_reentrancy` times.
    pub fn run(&self) -> Result<T, ReactiveError> {
        let inner = &self.inner;
        if inner.disposed.get() {
            return Err(ReactiveError::Disposed { id: inner.id });
        }

        let depth = ReactiveContext::depth_of(inner.id);
        let limit = Runtime::config().max_reentrancy;
        if depth > limit {
            return Err(ReactiveError::ReentrancyLimit {
                id: inner.id,
                depth,
                limit,
            });
        }

        let _span = trace_span!(
            "effect",
            id = %inner.id,
            name = inner.options.name.as_deref().unwrap_or(""),
            depth
        )
        .entered();

        DepStore::unsubscribe_all(&**inner);
        let node = Rc::clone(inner) as Rc<dyn Subscriber>;
        let _ctx = ReactiveContext::enter(node);

        let value = (inner.body)();
        inner.run_count.set(inner.run_count.get() + 1);
        Ok(value)
    }

    /// Stop the effect: leave every subscriber set and refuse further runs.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        DepStore::unsubscribe_all(&*self.inner);
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// The keys read during the latest run, in first-read order.
    pub fn dependencies(&self) -> Vec<ObservableKey> {
        self.inner
            .edges
            .borrow()
            .iter()
            .map(|set| set.key().clone())
            .collect()
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.inner.edges.borrow().len()
    }

    pub fn options(&self) -> &EffectOptions<T> {
        &self.inner.options
    }

    /// A non-owning handle, for schedulers that must not keep the effect alive.
    pub fn downgrade(&self) -> WeakEffect<T> {
        WeakEffect {
            inner: self.inner.this.clone(),
        }
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("name", &self.inner.options.name)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Weak counterpart of [`Effect`].
pub struct WeakEffect<T: 'static> {
    inner: Weak<EffectInner<T>>,
}

impl<T: 'static> WeakEffect<T> {
    pub fn upgrade(&self) -> Option<Effect<T>> {
        self.inner.upgrade().map(|inner| Effect { inner })
    }
}

impl<T: 'static> Clone for WeakEffect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create an effect and run it once. Shorthand for [`Effect::new`].
pub fn effect<T, F>(body: F) -> Effect<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Effect::new(body)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

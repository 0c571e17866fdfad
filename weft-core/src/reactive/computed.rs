//! Computed Values
//!
//! A Computed is a cached derived value that re-evaluates only when it is
//! read after one of its dependencies changed.
//!
//! # How Computed Values Work
//!
//! 1. The getter is wrapped in a deferred [`Effect`]. Nothing runs at
//!    construction; the value starts dirty.
//!
//! 2. On read, a dirty computed runs the effect, caches the result and
//!    becomes clean. A clean computed returns the cache.
//!
//! 3. When a dependency changes, the effect's scheduler only marks the
//!    computed dirty. Recomputation waits for the next read.
//!
//! 4. Every read also tracks the computed's own value slot, and the
//!    clean-to-dirty transition triggers it. A computed read inside another
//!    computation is therefore a dependency like any other: computed values
//!    compose.
//!
//! ```text
//! DIRTY ──read──► COMPUTING ──► CLEAN ──dependency changed──► DIRTY
//! ```

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::effect::{Effect, EffectOptions};
use super::key::{ObservableKey, TargetId};
use super::runtime::Runtime;
use crate::error::ReactiveError;

struct ComputedInner<T: 'static> {
    target: TargetId,
    effect: Effect<T>,
    value: RefCell<Option<T>>,
    dirty: Rc<Cell<bool>>,
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.dispose();
        Runtime::forget_target(self.target);
    }
}

/// A lazily evaluated, memoized derived value.
///
/// Clones share the same cache.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Computed, Ref};
///
/// let a = Ref::new(1);
/// let b = Ref::new(1);
/// let sum = Computed::new({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + b.get()
/// });
///
/// assert_eq!(sum.get(), 2);
/// a.set(2);
/// assert_eq!(sum.get(), 3);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value. The getter first runs on the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let target = TargetId::new();
        let dirty = Rc::new(Cell::new(true));

        let options = EffectOptions::new().deferred().named("computed").scheduler({
            let dirty = Rc::clone(&dirty);
            move |_: &Effect<T>| {
                if !dirty.replace(true) {
                    Runtime::trigger(&ObservableKey::value(target));
                }
            }
        });

        Self {
            inner: Rc::new(ComputedInner {
                target,
                effect: Effect::with_options(getter, options),
                value: RefCell::new(None),
                dirty,
            }),
        }
    }

    /// Get the current value, recomputing if dirty.
    ///
    /// # Panics
    ///
    /// Panics if recomputation is refused, which only happens when the
    /// getter depends on itself deeper than the re-entrancy limit. Use
    /// [`try_get`](Self::try_get) to handle that case.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("computed value unavailable: {err}"),
        }
    }

    /// Get the current value, recomputing if dirty.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        let inner = &self.inner;

        let cached = if inner.dirty.get() {
            None
        } else {
            inner.value.borrow().clone()
        };

        let value = match cached {
            Some(value) => value,
            None => {
                let fresh = inner.effect.run()?;
                *inner.value.borrow_mut() = Some(fresh.clone());
                inner.dirty.set(false);
                fresh
            }
        };

        Runtime::track(&self.key());
        Ok(value)
    }

    /// Mark the computed dirty, as if a dependency had changed.
    pub fn invalidate(&self) {
        if !self.inner.dirty.replace(true) {
            Runtime::trigger(&self.key());
        }
    }
}

impl<T: 'static> Computed<T> {
    /// The observable key of this computed's value slot.
    pub fn key(&self) -> ObservableKey {
        ObservableKey::value(self.inner.target)
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Number of times the getter has run.
    pub fn compute_count(&self) -> usize {
        self.inner.effect.run_count()
    }

    /// The keys read by the latest computation.
    pub fn dependencies(&self) -> Vec<ObservableKey> {
        self.inner.effect.dependencies()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("target", &self.inner.target)
            .field("dirty", &self.is_dirty())
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Create a computed value. Shorthand for [`Computed::new`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

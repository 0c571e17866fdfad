//! Tracked Cell
//!
//! A [`Ref`] wraps a single value so that reads and writes of it can be
//! tracked, which plain values (numbers, strings) cannot be on their own.
//! It is the simplest observable accessor: one target, one
//! [`PropertyKey::Value`](super::PropertyKey::Value) slot.
//!
//! # How Cells Work
//!
//! 1. [`Ref::get`] tracks the cell's value slot, then returns a clone.
//!
//! 2. [`Ref::set`] stores the new value, then triggers the value slot.
//!
//! Writes always trigger, even if the new value equals the old one.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::key::{ObservableKey, TargetId};
use super::runtime::Runtime;

struct CellInner<T> {
    target: TargetId,
    value: RefCell<T>,
}

impl<T> Drop for CellInner<T> {
    fn drop(&mut self) {
        Runtime::forget_target(self.target);
    }
}

/// A tracked cell holding a value of type `T`.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Ref;
///
/// let count = Ref::new(0);
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Ref<T: 'static> {
    inner: Rc<CellInner<T>>,
}

impl<T: 'static> Ref<T> {
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                target: TargetId::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the cell's target identity.
    pub fn target_id(&self) -> TargetId {
        self.inner.target
    }

    /// The observable key of the cell's value slot.
    pub fn key(&self) -> ObservableKey {
        ObservableKey::value(self.inner.target)
    }

    /// Read the value by reference, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(&self.key());
        f(&self.inner.value.borrow())
    }

    /// Read the value by reference without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store a new value and notify subscribers.
    pub fn set(&self, value: T) {
        // Release the borrow before triggering: subscribers will read.
        drop(self.inner.value.replace(value));
        Runtime::trigger(&self.key());
    }

    /// Update the value using a function of the current value.
    ///
    /// The current value is read without tracking.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Number of computations subscribed to this cell.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(&self.key())
    }

    /// Check whether two handles share one cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Ref<T> {
    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: 'static> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("target", &self.inner.target)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Watchers
//!
//! A watcher observes a source and calls back with `(new, old)` whenever the
//! source changes.
//!
//! # How Watchers Work
//!
//! 1. The source becomes a getter. An explicit getter is used as is; a
//!    [`Value`], [`ReactiveObject`] or `Ref<Value>` is read in full by
//!    [`traverse`], so every reachable field becomes a dependency (deep
//!    watch). Cells of leaf types are read by value.
//!
//! 2. The getter runs inside a deferred [`Effect`] whose scheduler re-runs
//!    it for the new value, hands `(new, old)` to the callback, and keeps
//!    the new value as the next round's old value.
//!
//! 3. At construction the effect is run once by hand, outside the
//!    scheduler, to capture the initial old value.
//!
//! A callback that writes what its watcher reads starts a nested round.
//! Rounds nest at most [`RuntimeConfig::max_reentrancy`] deep; a change
//! arriving deeper than that is skipped with a warning.
//!
//! [`RuntimeConfig::max_reentrancy`]: crate::RuntimeConfig::max_reentrancy
//!
//! # Deep Traversal
//!
//! [`traverse`] builds a JSON snapshot while reading. It keeps a per-call
//! visited map keyed by target identity, so reference cycles end the branch
//! (rendered as `null`) instead of recursing forever, and an object shared
//! by two fields is read once and repeated in the snapshot.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value as Json};
use tracing::warn;

use super::cell::Ref;
use super::effect::{Effect, EffectOptions};
use super::key::TargetId;
use super::object::{ReactiveObject, Value};
use super::runtime::Runtime;
use crate::error::ReactiveError;

/// Targets seen during one traversal.
///
/// `None` marks a target whose snapshot is still being built.
type Visited = HashMap<TargetId, Option<Json>>;

/// Read every field reachable from `value`, tracking each read, and return
/// the resulting snapshot.
pub fn traverse(value: &Value) -> Json {
    traverse_with(value, &mut Visited::new())
}

fn traverse_with(value: &Value, visited: &mut Visited) -> Json {
    match value {
        Value::Plain(json) => json.clone(),
        Value::Object(object) => {
            let target = object.target_id();
            if let Some(seen) = visited.get(&target) {
                return seen.clone().unwrap_or(Json::Null);
            }
            visited.insert(target, None);

            let mut map = Map::new();
            for name in object.keys() {
                if let Some(field) = object.get(&name) {
                    map.insert(name, traverse_with(&field, visited));
                }
            }

            let json = Json::Object(map);
            visited.insert(target, Some(json.clone()));
            json
        }
        Value::Cell(cell) => {
            let target = cell.target_id();
            if let Some(seen) = visited.get(&target) {
                return seen.clone().unwrap_or(Json::Null);
            }
            visited.insert(target, None);

            let json = traverse_with(&cell.get(), visited);
            visited.insert(target, Some(json.clone()));
            json
        }
    }
}

/// What a watcher observes: a getter producing `T`.
pub struct WatchSource<T: 'static> {
    getter: Box<dyn Fn() -> T>,
}

impl<T: 'static> WatchSource<T> {
    /// Watch whatever `getter` reads.
    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            getter: Box::new(getter),
        }
    }
}

impl WatchSource<Json> {
    /// Watch everything reachable from `value`.
    pub fn deep(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::getter(move || traverse(&value))
    }
}

impl From<ReactiveObject> for WatchSource<Json> {
    fn from(object: ReactiveObject) -> Self {
        Self::deep(object)
    }
}

impl From<Value> for WatchSource<Json> {
    fn from(value: Value) -> Self {
        Self::deep(value)
    }
}

/// A cell of [`Value`] may hold an object, so it is traversed like any
/// other value.
impl From<Ref<Value>> for WatchSource<Json> {
    fn from(cell: Ref<Value>) -> Self {
        Self::deep(Value::Cell(cell))
    }
}

/// Cells of leaf types are watched by value.
macro_rules! leaf_cell_source {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Ref<$ty>> for WatchSource<$ty> {
                fn from(cell: Ref<$ty>) -> Self {
                    Self::getter(move || cell.get())
                }
            }
        )*
    };
}

leaf_cell_source!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, Json);

/// Handle of a registered watcher. Dropping it stops the watcher.
#[must_use = "a watcher stops when its handle is dropped"]
pub struct Watcher<T: 'static> {
    effect: Effect<T>,
    old: Rc<RefCell<Option<T>>>,
}

impl<T: Clone + 'static> Watcher<T> {
    /// Stop watching.
    pub fn stop(&self) {
        self.effect.dispose();
    }

    pub fn is_stopped(&self) -> bool {
        self.effect.is_disposed()
    }

    /// The value the next callback will receive as `old`.
    pub fn current(&self) -> Option<T> {
        self.old.borrow().clone()
    }

    /// The underlying computation.
    pub fn effect(&self) -> &Effect<T> {
        &self.effect
    }
}

impl<T: 'static> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("effect", &self.effect)
            .finish()
    }
}

/// Watch `source` and call `callback(new, old)` after each change.
///
/// # Errors
///
/// Fails if the initial read is refused, which only happens when the
/// watcher is created from deep inside a re-entrant computation.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use serde_json::json;
/// use weft_core::reactive::{watch, ReactiveObject};
///
/// let object = ReactiveObject::from_json(json!({ "x": 1 }));
/// let calls = Rc::new(RefCell::new(Vec::new()));
///
/// let _watcher = watch(object.clone(), {
///     let calls = calls.clone();
///     move |new: &serde_json::Value, old: &serde_json::Value| {
///         calls.borrow_mut().push((new.clone(), old.clone()))
///     }
/// })?;
///
/// object.set("x", 2);
/// assert_eq!(*calls.borrow(), vec![(json!({ "x": 2 }), json!({ "x": 1 }))]);
/// # Ok::<(), weft_core::ReactiveError>(())
/// ```
pub fn watch<T, S, F>(source: S, callback: F) -> Result<Watcher<T>, ReactiveError>
where
    T: Clone + 'static,
    S: Into<WatchSource<T>>,
    F: Fn(&T, &T) + 'static,
{
    let getter = source.into().getter;
    let old: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));

    let options = EffectOptions::new().deferred().named("watch").scheduler({
        let old = Rc::clone(&old);
        let rounds = Rc::new(Cell::new(0));
        move |effect: &Effect<T>| {
            let limit = Runtime::config().max_reentrancy;
            if rounds.get() > limit {
                warn!(id = %effect.id(), limit, "watcher re-entered too deeply, change skipped");
                return;
            }
            let _round = RoundGuard::enter(&rounds);

            let fresh = match effect.run() {
                Ok(fresh) => fresh,
                Err(err) => {
                    warn!(%err, "watcher skipped a change");
                    return;
                }
            };
            // Store before calling back: the callback may itself cause
            // another round, which must see `fresh` as its old value.
            let previous = old.replace(Some(fresh.clone()));
            if let Some(previous) = previous {
                callback(&fresh, &previous);
            }
        }
    });

    let effect = Effect::with_options(getter, options);
    let initial = effect.run()?;
    *old.borrow_mut() = Some(initial);

    Ok(Watcher { effect, old })
}

/// Counts nested scheduler rounds of one watcher.
struct RoundGuard<'a>(&'a Cell<usize>);

impl<'a> RoundGuard<'a> {
    fn enter(rounds: &'a Cell<usize>) -> Self {
        rounds.set(rounds.get() + 1);
        Self(rounds)
    }
}

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

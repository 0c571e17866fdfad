//! Reactive Primitives
//!
//! This module implements the dependency-tracking core: which computations
//! read which state, and re-running exactly those computations when that
//! state changes.
//!
//! # Concepts
//!
//! ## Observable keys
//!
//! State is addressed by an [`ObservableKey`]: a target identity plus a
//! property. Whatever intercepts reads and writes of state calls
//! [`Runtime::track`] on every read and [`Runtime::trigger`] after every
//! write. [`ReactiveObject`] and [`Ref`] are interceptors shipped with the
//! crate; hosts can write their own against the same two calls.
//!
//! ## Effects
//!
//! An [`Effect`] is a re-runnable computation. While it runs, every tracked
//! read subscribes it to the key read. Before each run it leaves every set
//! it joined last time, so its subscriptions always match its latest run.
//!
//! ## Computed values
//!
//! A [`Computed`] is a lazy, memoized effect: a change only marks it dirty,
//! and the next read recomputes.
//!
//! ## Watchers
//!
//! [`watch`] calls back with `(new, old)` whenever a getter's result, or
//! anything reachable from a value, changes.
//!
//! # Implementation Notes
//!
//! The runtime is thread-local: a dependency store and an execution stack
//! per thread. Handles are `Rc`-based, so the single-thread contract is
//! enforced by the compiler rather than by locks.

mod cell;
mod computed;
mod context;
mod effect;
mod key;
mod object;
mod queue;
mod runtime;
mod store;
mod subscriber;
mod watch;

pub use cell::Ref;
pub use computed::{computed, Computed};
pub use context::ReactiveContext;
pub use effect::{effect, Effect, EffectOptions, Scheduler, WeakEffect};
pub use key::{ObservableKey, PropertyKey, TargetId};
pub use object::{FieldRef, ReactiveObject, Value};
pub use queue::JobQueue;
pub use runtime::Runtime;
pub use subscriber::SubscriberId;
pub use watch::{traverse, watch, WatchSource, Watcher};

//! Weft Core
//!
//! This crate provides a fine-grained dependency-tracking runtime. It
//! discovers which computations read which pieces of mutable state, and
//! re-runs (or schedules) exactly the computations affected when that state
//! changes.
//!
//! It implements:
//!
//! - Dependency tracking over (target, property) keys
//! - Effects with stale-edge cleanup and pluggable scheduling
//! - Lazy, memoized computed values
//! - Deep watchers delivering old and new values
//!
//! # Architecture
//!
//! - `reactive`: the store, execution context, track/trigger protocol and
//!   every primitive built on them
//! - `config`: per-thread runtime settings
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use serde_json::json;
//! use weft_core::reactive::{Effect, ReactiveObject};
//!
//! let state = ReactiveObject::from_json(json!({ "ok": true, "text": "a" }));
//! let result = Rc::new(RefCell::new(String::new()));
//!
//! let _effect = Effect::new({
//!     let (state, result) = (state.clone(), result.clone());
//!     move || {
//!         let ok = state.get_plain("ok") == Some(json!(true));
//!         *result.borrow_mut() = if ok {
//!             state.get_plain("text").and_then(|t| t.as_str().map(str::to_owned)).unwrap_or_default()
//!         } else {
//!             "fallback".to_owned()
//!         };
//!     }
//! });
//! assert_eq!(*result.borrow(), "a");
//!
//! state.set("ok", false);
//! assert_eq!(*result.borrow(), "fallback");
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::ReactiveError;

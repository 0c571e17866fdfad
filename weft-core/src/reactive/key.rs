//! Observable keys.
//!
//! An [`ObservableKey`] names one trackable slot of state: a target (an
//! object, a cell, a computed value) plus a property of that target. The
//! dependency store keeps exactly one subscriber set per key.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a trackable target.
///
/// Targets are compared by identity, never by content: two objects holding
/// equal values still have distinct IDs. The store only ever holds IDs, so
/// it never keeps a target alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh target identity.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A property of a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// A named field.
    Name(String),
    /// The single slot of a cell or computed value.
    Value,
    /// The key set of a target; read by iteration, written by insert/remove.
    Keys,
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Value => f.write_str("<value>"),
            Self::Keys => f.write_str("<keys>"),
        }
    }
}

/// A (target, property) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservableKey {
    pub target: TargetId,
    pub key: PropertyKey,
}

impl ObservableKey {
    pub fn new(target: TargetId, key: impl Into<PropertyKey>) -> Self {
        Self {
            target,
            key: key.into(),
        }
    }

    /// The value slot of `target`.
    pub fn value(target: TargetId) -> Self {
        Self::new(target, PropertyKey::Value)
    }

    /// The key-set slot of `target`.
    pub fn keys(target: TargetId) -> Self {
        Self::new(target, PropertyKey::Keys)
    }
}

impl fmt::Display for ObservableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.key)
    }
}

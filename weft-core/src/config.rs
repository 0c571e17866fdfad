//! Runtime Configuration
//!
//! The runtime has very few knobs. They are grouped in [`RuntimeConfig`],
//! which can be built in code or loaded from JSON and installed for the
//! current thread with [`Runtime::configure`](crate::reactive::Runtime::configure).
//!
//! ```json
//! { "max_reentrancy": 4, "log_reads": true }
//! ```
//!
//! Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;

/// Default bound on stacked activations of one computation.
pub const DEFAULT_MAX_REENTRANCY: usize = 8;

/// Per-thread settings for the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many extra activations of one computation may be stacked on top
    /// of its first one before further runs are refused.
    ///
    /// A computation is re-entered when its own writes reach it through
    /// another computation (A writes what B reads, B writes what A reads).
    /// Zero forbids any re-entry.
    pub max_reentrancy: usize,

    /// Emit a `trace!` event for every tracked read.
    pub log_reads: bool,
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ReactiveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the re-entrancy bound.
    pub fn with_max_reentrancy(mut self, max_reentrancy: usize) -> Self {
        self.max_reentrancy = max_reentrancy;
        self
    }

    /// Enable or disable per-read tracing.
    pub fn with_log_reads(mut self, log_reads: bool) -> Self {
        self.log_reads = log_reads;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reentrancy: DEFAULT_MAX_REENTRANCY,
            log_reads: false,
        }
    }
}

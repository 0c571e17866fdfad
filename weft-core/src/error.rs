//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Errors surfaced by computations and runtime configuration.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The computation was disposed and can no longer run.
    #[error("computation {id} has been disposed")]
    Disposed { id: SubscriberId },

    /// Running the computation would exceed the configured re-entrancy bound.
    ///
    /// `depth` counts the activations of this computation already on the
    /// execution stack.
    #[error("computation {id} is already active {depth} times (limit {limit})")]
    ReentrancyLimit {
        id: SubscriberId,
        depth: usize,
        limit: usize,
    },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

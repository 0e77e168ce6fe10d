//! Error types for learner operations.

use thiserror::Error;

/// Errors raised by agents and solvers.
///
/// These are returned wrapped in [`anyhow::Error`]; use `downcast_ref::<GameError>()`
/// to recover the variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// Supplied strategy is not a probability vector.
    #[error("invalid strategy: {reason}")]
    InvalidStrategy { reason: String },

    /// Fewer than two actions.
    #[error("action count must be at least 2, but is {count}")]
    InvalidActionCount { count: usize },

    /// `update` was called without a preceding `action`.
    #[error("update called before an action was selected")]
    UncalledAction,

    /// Gradient dynamics did not meet the stopping criterion in time.
    #[error("no convergence after {iterations} iterations")]
    NonConvergence { iterations: usize },
}

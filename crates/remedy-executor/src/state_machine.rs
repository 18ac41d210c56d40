//! Execution status transitions
//!
//! ```text
//! NotStarted -> InProgress -> Completed -> RolledBack
//!                          -> Failed | Timeout | Cancelled | ValidationFailed
//! ```

use crate::error::TransitionError;
use remedy_model::ExecutionStatus;

/// Validate a status change
///
/// Illegal transitions return an error; with the `strict-debug` feature
/// they panic instead.
///
/// # Errors
/// [`TransitionError`] if `to` is not reachable from `from`.
pub fn validate_transition(from: ExecutionStatus, to: ExecutionStatus) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal execution transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(TransitionError { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: ExecutionStatus) -> Vec<ExecutionStatus> {
    use ExecutionStatus::*;
    match from {
        NotStarted => vec![InProgress],
        InProgress => vec![Completed, Failed, Timeout, Cancelled, ValidationFailed],
        Completed => vec![RolledBack],
        Failed | Timeout | Cancelled | ValidationFailed | RolledBack => vec![],
    }
}

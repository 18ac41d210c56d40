//! Error types for execution

use remedy_model::{ActionId, ContextError, CorrelationId, ExecutionId, ExecutionStatus, PlanId};

/// Illegal execution status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal execution transition {from} -> {to}")]
pub struct TransitionError {
    /// Current status
    pub from: ExecutionStatus,
    /// Requested status
    pub to: ExecutionStatus,
}

/// Executor failures
///
/// Action failures, timeouts and cancellations are not errors: they end
/// up in the returned execution record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// Context is malformed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContextError),

    /// Plan targets a different incident
    #[error("plan {plan_id} does not target incident {correlation_id}")]
    PlanMismatch {
        /// Plan id
        plan_id: PlanId,
        /// Incident passed to the executor
        correlation_id: CorrelationId,
    },

    /// Another execution for the incident is running
    #[error("an execution for incident {0} is already in progress")]
    AlreadyInProgress(CorrelationId),

    /// Action is not in the ledger of completed actions
    #[error("no completed action {0} for this incident")]
    UnknownAction(ActionId),

    /// Execution is not known to this executor
    #[error("unknown execution {0}")]
    UnknownExecution(ExecutionId),

    /// State machine violation
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
}

impl ExecutorError {
    /// Check if the same call may succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyInProgress(_))
    }
}

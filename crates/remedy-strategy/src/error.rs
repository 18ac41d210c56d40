//! Error types for strategies and actions

use remedy_model::{ActionId, ContextError, CorrelationId};

/// Action execution failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Action has no rollback
    #[error("action {0} cannot be rolled back")]
    NotReversible(ActionId),

    /// Required parameters are absent
    #[error("action {action_id} is missing parameters: {}", missing.join(", "))]
    MissingParameters {
        /// Offending action
        action_id: ActionId,
        /// Absent parameter names
        missing: Vec<String>,
    },

    /// Side effect failed
    #[error("{action_type} failed: {reason}")]
    Effector {
        /// Action type tag
        action_type: String,
        /// Failure reason
        reason: String,
    },
}

impl ActionError {
    /// Create effector failure
    #[must_use]
    pub fn effector(action_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Effector {
            action_type: action_type.into(),
            reason: reason.into(),
        }
    }

    /// Check if a new execution could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Effector { .. })
    }
}

/// Strategy selection and plan construction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// Context is malformed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContextError),

    /// No registered strategy applies
    #[error("no applicable strategy for incident {0}")]
    NoApplicableStrategy(CorrelationId),
}

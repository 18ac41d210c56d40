//! Pipeline error taxonomy

use crate::config::ConfigError;
use remedy_analysis::{ClassificationError, GraphError};
use remedy_executor::ExecutorError;
use remedy_model::{
    BudgetExceeded, ContextError, CorrelationId, ExecutionId, ExecutionStatus, RemediationExecution,
};
use remedy_strategy::StrategyError;
use remedy_validation::ValidationError;

/// Errors surfaced by [`RemediationEngine`](crate::RemediationEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed context or plan; never retried
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Upstream analysis unreachable or unusable
    #[error("analysis failure: {0}")]
    AnalysisFailure(ClassificationError),

    /// Missing node or edge reference
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// No registered strategy applies to the incident
    #[error("no applicable remediation strategy for incident {0}")]
    NoApplicableStrategy(CorrelationId),

    /// Plan rejected by validation
    #[error("plan rejected: {0}")]
    ValidationFailure(String),

    /// An action failed and prior actions were rolled back
    #[error("execution {execution_id} failed: {reason}")]
    ActionExecution {
        /// Execution record
        execution_id: ExecutionId,
        /// Failure reason
        reason: String,
    },

    /// Some rollback steps failed
    #[error("rollback of execution {execution_id} incomplete: {failed} step(s) failed")]
    Rollback {
        /// Execution record
        execution_id: ExecutionId,
        /// Failed rollback steps
        failed: usize,
    },

    /// Deadline elapsed
    #[error("timed out")]
    Timeout,

    /// Caller cancelled
    #[error("cancelled")]
    Cancelled,

    /// Executor refused the request
    #[error(transparent)]
    Execution(ExecutorError),

    /// Bad configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Typed failure for a finished execution record, `None` on success
    ///
    /// Incomplete rollbacks take precedence over the status that caused
    /// them.
    #[must_use]
    pub fn from_execution(execution: &RemediationExecution) -> Option<Self> {
        if let Some(rollback) = &execution.rollback {
            if !rollback.is_clean() {
                return Some(Self::Rollback {
                    execution_id: execution.id,
                    failed: rollback.failed_rollback_steps.len(),
                });
            }
        }
        let reason = || execution.error.clone().unwrap_or_default();
        match execution.status {
            ExecutionStatus::ValidationFailed => Some(Self::ValidationFailure(reason())),
            ExecutionStatus::Failed => Some(Self::ActionExecution {
                execution_id: execution.id,
                reason: reason(),
            }),
            ExecutionStatus::Timeout => Some(Self::Timeout),
            ExecutionStatus::Cancelled => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if the same call may succeed later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AnalysisFailure(e) => e.allows_fallback(),
            Self::ActionExecution { .. } | Self::Timeout => true,
            Self::Execution(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error is the caller's fault
    #[inline]
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<ContextError> for EngineError {
    fn from(value: ContextError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<BudgetExceeded> for EngineError {
    fn from(value: BudgetExceeded) -> Self {
        match value {
            BudgetExceeded::DeadlineElapsed => Self::Timeout,
            BudgetExceeded::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ClassificationError> for EngineError {
    fn from(value: ClassificationError) -> Self {
        match value {
            ClassificationError::InvalidInput(e) => e.into(),
            ClassificationError::Interrupted(e) => e.into(),
            other @ ClassificationError::AnalysisUnavailable(_) => Self::AnalysisFailure(other),
        }
    }
}

impl From<StrategyError> for EngineError {
    fn from(value: StrategyError) -> Self {
        match value {
            StrategyError::InvalidInput(e) => e.into(),
            StrategyError::NoApplicableStrategy(id) => Self::NoApplicableStrategy(id),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::TimedOut => Self::Timeout,
            ValidationError::Cancelled => Self::Cancelled,
            ValidationError::InvalidPriority { .. } => Self::InvalidInput(value.to_string()),
        }
    }
}

impl From<ExecutorError> for EngineError {
    fn from(value: ExecutorError) -> Self {
        match value {
            ExecutorError::InvalidInput(e) => e.into(),
            e @ ExecutorError::PlanMismatch { .. } => Self::InvalidInput(e.to_string()),
            other => Self::Execution(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_analysis::GeneratorError;
    use remedy_model::{PlanId, RollbackFailure, RollbackStatus};

    fn finished(status: ExecutionStatus) -> RemediationExecution {
        let mut e = RemediationExecution::new(PlanId::new(), CorrelationId::new());
        e.status = status;
        e.error = Some("boom".to_string());
        e
    }

    #[test]
    fn execution_status_maps_to_taxonomy() {
        assert!(EngineError::from_execution(&finished(ExecutionStatus::Completed)).is_none());
        assert!(matches!(
            EngineError::from_execution(&finished(ExecutionStatus::ValidationFailed)),
            Some(EngineError::ValidationFailure(msg)) if msg == "boom"
        ));
        assert!(matches!(
            EngineError::from_execution(&finished(ExecutionStatus::Failed)),
            Some(EngineError::ActionExecution { .. })
        ));
        assert!(matches!(
            EngineError::from_execution(&finished(ExecutionStatus::Timeout)),
            Some(EngineError::Timeout)
        ));
        assert!(matches!(
            EngineError::from_execution(&finished(ExecutionStatus::Cancelled)),
            Some(EngineError::Cancelled)
        ));
    }

    #[test]
    fn incomplete_rollback_takes_precedence() {
        let mut e = finished(ExecutionStatus::Failed);
        e.rollback = Some(RollbackStatus {
            failed_rollback_steps: vec![RollbackFailure {
                action_id: remedy_model::ActionId::new(),
                reason: "stuck".to_string(),
            }],
            ..RollbackStatus::default()
        });
        assert!(matches!(
            EngineError::from_execution(&e),
            Some(EngineError::Rollback { failed: 1, .. })
        ));
    }

    #[test]
    fn conversions_keep_categories() {
        let err = EngineError::from(ClassificationError::from(ContextError::MissingService));
        assert!(err.is_invalid_input());

        let err = EngineError::from(ClassificationError::from(GeneratorError::Unavailable("down".into())));
        assert!(matches!(err, EngineError::AnalysisFailure(_)));
        assert!(err.is_retryable());

        let err = EngineError::from(ValidationError::Cancelled);
        assert!(matches!(err, EngineError::Cancelled));

        let cid = CorrelationId::new();
        let err = EngineError::from(StrategyError::NoApplicableStrategy(cid));
        assert!(matches!(err, EngineError::NoApplicableStrategy(id) if id == cid));
    }
}

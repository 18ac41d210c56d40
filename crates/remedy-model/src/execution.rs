//! Execution records
//!
//! A [`RemediationExecution`] is created when a plan run starts and
//! finalized exactly once at a terminal status. Retries create a new
//! record referencing the same plan id.

use crate::action::{ActionStatus, RemediationResult};
use crate::ids::{ActionId, CorrelationId, ExecutionId, PlanId};
use crate::metrics::RemediationMetrics;
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Overall status of a plan execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Created, not started
    #[default]
    NotStarted,
    /// Running
    InProgress,
    /// Every action succeeded
    Completed,
    /// An action failed
    Failed,
    /// Caller deadline elapsed
    Timeout,
    /// Caller cancelled
    Cancelled,
    /// Plan rejected by validation
    ValidationFailed,
    /// A completed execution was undone on request
    RolledBack,
}

impl ExecutionStatus {
    /// Check if status is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::InProgress)
    }

    /// Check if status counts as success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Stable lowercase label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::ValidationFailed => "validation_failed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution sub-record for one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecution {
    /// Action id
    pub action_id: ActionId,
    /// Action type tag
    pub action_type: String,
    /// Final action status
    pub status: ActionStatus,
    /// Execute result
    pub result: Option<RemediationResult>,
    /// Rollback result, if rolled back or attempted
    pub rollback_result: Option<RemediationResult>,
}

impl ActionExecution {
    /// Pending sub-record
    #[must_use]
    pub fn pending(action_id: ActionId, action_type: impl Into<String>) -> Self {
        Self {
            action_id,
            action_type: action_type.into(),
            status: ActionStatus::Pending,
            result: None,
            rollback_result: None,
        }
    }
}

/// One failed rollback step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackFailure {
    /// Action whose rollback failed
    pub action_id: ActionId,
    /// Reason
    pub reason: String,
}

/// Outcome of a rollback pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackStatus {
    /// Actions successfully rolled back, in rollback order
    pub rolled_back_steps: Vec<ActionId>,
    /// Rollback steps that failed
    pub failed_rollback_steps: Vec<RollbackFailure>,
    /// Completed actions that declare no rollback
    pub skipped_steps: Vec<ActionId>,
    /// When the pass finished
    pub completed_at: Option<DateTime<Utc>>,
}

impl RollbackStatus {
    /// Check if every attempted rollback step succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_rollback_steps.is_empty()
    }

    /// Number of rollback steps attempted
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.rolled_back_steps.len() + self.failed_rollback_steps.len()
    }
}

/// Execution-time record of one plan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationExecution {
    /// Execution id
    pub id: ExecutionId,
    /// Plan that was run
    pub plan_id: PlanId,
    /// Incident the plan targets
    pub correlation_id: CorrelationId,
    /// Start time
    pub started_at: Option<DateTime<Utc>>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Status
    pub status: ExecutionStatus,
    /// Per-action sub-records, in execution order
    pub actions: Vec<ActionExecution>,
    /// Plan validation outcome
    pub validation: Option<ValidationResult>,
    /// Rollback outcome, if a rollback pass ran
    pub rollback: Option<RollbackStatus>,
    /// Attached metrics
    pub metrics: Option<RemediationMetrics>,
    /// Failure reason for non-successful terminal states
    pub error: Option<String>,
}

impl RemediationExecution {
    /// New record in `NotStarted`
    #[must_use]
    pub fn new(plan_id: PlanId, correlation_id: CorrelationId) -> Self {
        Self {
            id: ExecutionId::new(),
            plan_id,
            correlation_id,
            started_at: None,
            completed_at: None,
            status: ExecutionStatus::NotStarted,
            actions: Vec::new(),
            validation: None,
            rollback: None,
            metrics: None,
            error: None,
        }
    }

    /// Sub-record for an action
    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&ActionExecution> {
        self.actions.iter().find(|a| a.action_id == id)
    }

    /// Ids of actions that were attempted, in order
    #[must_use]
    pub fn attempted_actions(&self) -> Vec<ActionId> {
        self.actions
            .iter()
            .filter(|a| a.result.is_some())
            .map(|a| a.action_id)
            .collect()
    }

    /// Fraction of actions that completed (rolled-back ones included)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.actions.is_empty() {
            return if self.status.is_success() { 1.0 } else { 0.0 };
        }
        let ok = self
            .actions
            .iter()
            .filter(|a| a.result.as_ref().is_some_and(|r| r.success))
            .count();
        ok as f64 / self.actions.len() as f64
    }

    /// Wall-clock duration, zero until finished
    #[must_use]
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.completed_at) {
            (Some(s), Some(e)) => (e - s).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!ExecutionStatus::NotStarted.is_terminal());
        assert!(!ExecutionStatus::InProgress.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::ValidationFailed.is_terminal());
        assert!(ExecutionStatus::RolledBack.is_terminal());
    }

    #[test]
    fn success_rate_counts_successful_results() {
        let mut exec = RemediationExecution::new(PlanId::new(), CorrelationId::new());
        let started = Utc::now();

        let mut a = ActionExecution::pending(ActionId::new(), "a");
        a.result = Some(RemediationResult::success(a.action_id, started, "ok"));
        let mut b = ActionExecution::pending(ActionId::new(), "b");
        b.result = Some(RemediationResult::failure(b.action_id, started, "no"));
        let c = ActionExecution::pending(ActionId::new(), "c");
        let first = a.action_id;
        exec.actions = vec![a, b, c];

        assert!((exec.success_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(exec.attempted_actions().len(), 2);
        assert_eq!(exec.attempted_actions()[0], first);
    }

    #[test]
    fn status_labels() {
        assert_eq!(ExecutionStatus::ValidationFailed.to_string(), "validation_failed");
    }
}

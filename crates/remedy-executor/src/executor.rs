//! Remediation executor
//!
//! One execution per plan run:
//!
//! 1. `NotStarted -> InProgress`, start time recorded
//! 2. plan validated; rejection ends in `ValidationFailed` with no action run
//! 3. actions run one at a time in ascending priority, ties in plan order
//! 4. first failure ends in `Failed`; completed actions are rolled back in
//!    reverse completion order, preceded by the failed action itself when
//!    it declares a partial-effect rollback
//! 5. all actions succeed: `Completed`
//! 6. deadline or cancellation: `Timeout` / `Cancelled`, rollback as in 4
//!
//! Rollback is best effort and ignores the caller's budget. Completed
//! actions of successful runs stay in a ledger so a caller can undo them
//! later, one by one or as a whole execution.

use crate::error::{ExecutorError, TransitionError};
use crate::state_machine::validate_transition;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use remedy_model::{
    ActionExecution, ActionId, ActionStatus, BudgetExceeded, CorrelationId, ErrorContext, ExecutionBudget,
    ExecutionId, ExecutionStatus, PlanId, RemediationExecution, RemediationResult, RollbackFailure, RollbackStatus,
};
use remedy_strategy::{RemediationAction, RemediationPlan};
use remedy_validation::{ValidationError, ValidationRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct LedgerEntry {
    action: Arc<dyn RemediationAction>,
    correlation_id: CorrelationId,
    execution_id: ExecutionId,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    record: RemediationExecution,
    completed: Vec<Arc<dyn RemediationAction>>,
    seq: u64,
}

struct InFlight<'a> {
    map: &'a DashMap<CorrelationId, ExecutionId>,
    key: CorrelationId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

enum Stop {
    Failed(String),
    Interrupted(BudgetExceeded),
}

/// Executes remediation plans
#[derive(Debug)]
pub struct RemediationExecutor {
    validator: Arc<ValidationRegistry>,
    in_flight: DashMap<CorrelationId, ExecutionId>,
    ledger: DashMap<ActionId, LedgerEntry>,
    history: DashMap<ExecutionId, HistoryEntry>,
    history_limit: Option<usize>,
    finished: AtomicU64,
}

impl RemediationExecutor {
    /// Create executor gated by `validator`
    #[must_use]
    pub fn new(validator: Arc<ValidationRegistry>) -> Self {
        Self {
            validator,
            in_flight: DashMap::new(),
            ledger: DashMap::new(),
            history: DashMap::new(),
            history_limit: None,
            finished: AtomicU64::new(0),
        }
    }

    /// Keep at most `limit` finished executions
    ///
    /// The oldest records are dropped first, together with their undo
    /// ledger entries.
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Validation registry gating every run
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &Arc<ValidationRegistry> {
        &self.validator
    }

    /// Execute `plan` for `context`
    ///
    /// Action failures, timeouts and cancellations are reported through the
    /// returned record's status, not as errors.
    ///
    /// # Errors
    /// - [`ExecutorError::InvalidInput`] for malformed contexts
    /// - [`ExecutorError::PlanMismatch`] if the plan targets another incident
    /// - [`ExecutorError::AlreadyInProgress`] if the incident is already executing
    pub async fn execute(
        &self,
        plan: &RemediationPlan,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<RemediationExecution, ExecutorError> {
        context.validate()?;
        if plan.context_id != context.correlation_id {
            return Err(ExecutorError::PlanMismatch {
                plan_id: plan.id,
                correlation_id: context.correlation_id,
            });
        }

        let mut record = RemediationExecution::new(plan.id, context.correlation_id);
        let _guard = self.acquire(context.correlation_id, record.id)?;

        transition(&mut record, ExecutionStatus::InProgress)?;
        record.started_at = Some(Utc::now());
        tracing::info!(
            correlation_id = %context.correlation_id,
            plan_id = %plan.id,
            execution_id = %record.id,
            actions = plan.len(),
            "Starting remediation"
        );

        match self.validator.validate(plan, context, budget).await {
            Ok(report) => {
                let passed = report.outcome.success;
                if !passed {
                    record.error = Some(report.outcome.message.clone());
                }
                record.validation = Some(report.outcome);
                if !passed {
                    tracing::warn!(
                        correlation_id = %context.correlation_id,
                        plan_id = %plan.id,
                        reason = record.error.as_deref().unwrap_or_default(),
                        "Plan rejected by validation"
                    );
                    return self.finish(record, ExecutionStatus::ValidationFailed, Vec::new());
                }
            }
            Err(e) => {
                let status = match e {
                    ValidationError::Cancelled => ExecutionStatus::Cancelled,
                    _ => ExecutionStatus::Timeout,
                };
                record.error = Some(e.to_string());
                return self.finish(record, status, Vec::new());
            }
        }

        let ordered = plan.ordered_actions();
        record.actions = ordered
            .iter()
            .map(|a| ActionExecution::pending(a.id(), &a.descriptor().action_type))
            .collect();

        let mut completed: Vec<Arc<dyn RemediationAction>> = Vec::new();
        let mut stop = None;

        for (idx, action) in ordered.iter().enumerate() {
            let descriptor = action.descriptor();
            if let Err(exceeded) = budget.check() {
                stop = Some((idx, Stop::Interrupted(exceeded), false));
                break;
            }

            record.actions[idx].status = ActionStatus::Running;
            let started_at = Utc::now();
            tracing::debug!(
                correlation_id = %context.correlation_id,
                action_id = %descriptor.id,
                action_type = %descriptor.action_type,
                "Executing action"
            );

            let outcome = budget.run(action.execute(context)).await;
            let (result, failure) = match outcome {
                Ok(Ok(result)) if result.success => (result, None),
                Ok(Ok(result)) => {
                    let reason = result.message.clone();
                    (result, Some(Stop::Failed(reason)))
                }
                Ok(Err(e)) => (
                    RemediationResult::failure(descriptor.id, started_at, e.to_string()),
                    Some(Stop::Failed(e.to_string())),
                ),
                Err(exceeded) => (
                    RemediationResult::failure(descriptor.id, started_at, format!("interrupted: {exceeded}")),
                    Some(Stop::Interrupted(exceeded)),
                ),
            };

            let slot = &mut record.actions[idx];
            slot.result = Some(result);
            match failure {
                None => {
                    slot.status = ActionStatus::Completed;
                    completed.push(Arc::clone(action));
                }
                Some(reason) => {
                    slot.status = ActionStatus::Failed;
                    stop = Some((idx, reason, true));
                    break;
                }
            }
        }

        let Some((idx, reason, ran)) = stop else {
            tracing::info!(
                correlation_id = %context.correlation_id,
                plan_id = %plan.id,
                execution_id = %record.id,
                "Remediation completed"
            );
            return self.finish(record, ExecutionStatus::Completed, completed);
        };

        let (status, message) = match reason {
            Stop::Failed(message) => (ExecutionStatus::Failed, message),
            Stop::Interrupted(BudgetExceeded::DeadlineElapsed) => {
                (ExecutionStatus::Timeout, BudgetExceeded::DeadlineElapsed.to_string())
            }
            Stop::Interrupted(BudgetExceeded::Cancelled) => {
                (ExecutionStatus::Cancelled, BudgetExceeded::Cancelled.to_string())
            }
        };
        tracing::error!(
            correlation_id = %context.correlation_id,
            plan_id = %plan.id,
            action_id = %ordered[idx].id(),
            status = %status,
            reason = %message,
            "Remediation stopped; rolling back"
        );
        record.error = Some(message);

        let mut steps: Vec<Arc<dyn RemediationAction>> = Vec::with_capacity(completed.len() + 1);
        let failed = &ordered[idx];
        if ran
            && status == ExecutionStatus::Failed
            && failed.descriptor().can_rollback
            && failed.descriptor().partial_effect_rollback
        {
            steps.push(Arc::clone(failed));
        }
        steps.extend(completed.iter().rev().cloned());

        let rollback = rollback_steps(&steps, context, &mut record).await;
        record.rollback = Some(rollback);
        self.finish(record, status, Vec::new())
    }

    /// Undo one completed action of a successful execution
    ///
    /// # Errors
    /// [`ExecutorError::UnknownAction`] if the action is not a completed,
    /// not yet undone action of this incident.
    pub async fn rollback_action(
        &self,
        action_id: ActionId,
        context: &ErrorContext,
    ) -> Result<RollbackStatus, ExecutorError> {
        let (_, entry) = self
            .ledger
            .remove(&action_id)
            .ok_or(ExecutorError::UnknownAction(action_id))?;
        if entry.correlation_id != context.correlation_id {
            self.ledger.insert(action_id, entry);
            return Err(ExecutorError::UnknownAction(action_id));
        }

        let mut record = self
            .history
            .get(&entry.execution_id)
            .map(|h| h.record.clone())
            .unwrap_or_else(|| RemediationExecution::new(PlanId::new(), context.correlation_id));

        let status = rollback_steps(std::slice::from_ref(&entry.action), context, &mut record).await;
        if status.is_clean() {
            if let Some(mut h) = self.history.get_mut(&entry.execution_id) {
                h.record.actions = record.actions;
                h.completed.retain(|a| a.id() != action_id);
            }
        } else {
            self.ledger.insert(action_id, entry);
        }
        Ok(status)
    }

    /// Undo every remaining action of a completed execution
    ///
    /// Actions whose rollback fails stay in the ledger and can be retried
    /// with [`RemediationExecutor::rollback_action`].
    ///
    /// # Errors
    /// - [`ExecutorError::UnknownExecution`] for unknown ids or other incidents
    /// - [`ExecutorError::IllegalTransition`] unless the execution completed
    pub async fn rollback_execution(
        &self,
        execution_id: ExecutionId,
        context: &ErrorContext,
    ) -> Result<RemediationExecution, ExecutorError> {
        let HistoryEntry { mut record, completed, .. } = self
            .history
            .get(&execution_id)
            .map(|h| h.value().clone())
            .filter(|h| h.record.correlation_id == context.correlation_id)
            .ok_or(ExecutorError::UnknownExecution(execution_id))?;
        validate_transition(record.status, ExecutionStatus::RolledBack)?;

        let mut taken: Vec<(Arc<dyn RemediationAction>, LedgerEntry)> = Vec::with_capacity(completed.len());
        for action in completed.iter().rev() {
            if let Some((_, entry)) = self.ledger.remove(&action.id()) {
                taken.push((Arc::clone(action), entry));
            }
        }
        let steps: Vec<_> = taken.iter().map(|(a, _)| Arc::clone(a)).collect();
        let rollback = rollback_steps(&steps, context, &mut record).await;

        // failed steps stay undoable one by one
        let mut remaining = Vec::new();
        for (action, entry) in taken {
            if rollback.failed_rollback_steps.iter().any(|f| f.action_id == action.id()) {
                self.ledger.insert(action.id(), entry);
                remaining.push(action);
            }
        }
        tracing::info!(
            correlation_id = %context.correlation_id,
            execution_id = %execution_id,
            rolled_back = rollback.rolled_back_steps.len(),
            failed = rollback.failed_rollback_steps.len(),
            "Execution rolled back"
        );

        record.rollback = Some(rollback);
        record.status = ExecutionStatus::RolledBack;
        record.completed_at = Some(Utc::now());
        self.history.insert(
            execution_id,
            HistoryEntry {
                record: record.clone(),
                completed: remaining,
                seq: self.finished.fetch_add(1, Ordering::Relaxed),
            },
        );
        Ok(record)
    }

    /// Finalized execution record
    #[must_use]
    pub fn execution(&self, id: ExecutionId) -> Option<RemediationExecution> {
        self.history.get(&id).map(|h| h.record.clone())
    }

    /// Completed actions of an incident that can still be undone
    #[must_use]
    pub fn ledger_for(&self, correlation_id: CorrelationId) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self
            .ledger
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .map(|e| *e.key())
            .collect();
        ids.sort();
        ids
    }

    /// Number of finished executions on record
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop all records of an incident
    pub fn forget(&self, correlation_id: CorrelationId) {
        self.ledger.retain(|_, e| e.correlation_id != correlation_id);
        self.history.retain(|_, h| h.record.correlation_id != correlation_id);
    }

    /// Check if an incident is currently executing
    #[must_use]
    pub fn is_in_flight(&self, correlation_id: CorrelationId) -> bool {
        self.in_flight.contains_key(&correlation_id)
    }

    fn acquire(&self, correlation_id: CorrelationId, execution_id: ExecutionId) -> Result<InFlight<'_>, ExecutorError> {
        match self.in_flight.entry(correlation_id) {
            Entry::Occupied(_) => Err(ExecutorError::AlreadyInProgress(correlation_id)),
            Entry::Vacant(slot) => {
                slot.insert(execution_id);
                Ok(InFlight {
                    map: &self.in_flight,
                    key: correlation_id,
                })
            }
        }
    }

    fn finish(
        &self,
        mut record: RemediationExecution,
        status: ExecutionStatus,
        completed: Vec<Arc<dyn RemediationAction>>,
    ) -> Result<RemediationExecution, ExecutorError> {
        transition(&mut record, status)?;
        record.completed_at = Some(Utc::now());

        for action in &completed {
            self.ledger.insert(
                action.id(),
                LedgerEntry {
                    action: Arc::clone(action),
                    correlation_id: record.correlation_id,
                    execution_id: record.id,
                },
            );
        }
        self.history.insert(
            record.id,
            HistoryEntry {
                record: record.clone(),
                completed,
                seq: self.finished.fetch_add(1, Ordering::Relaxed),
            },
        );
        self.evict_surplus();
        Ok(record)
    }

    fn evict_surplus(&self) {
        let Some(limit) = self.history_limit else {
            return;
        };
        let surplus = self.history.len().saturating_sub(limit);
        if surplus == 0 {
            return;
        }

        let mut by_age: Vec<(u64, ExecutionId)> = self.history.iter().map(|h| (h.seq, *h.key())).collect();
        by_age.sort_unstable();
        for (_, id) in by_age.into_iter().take(surplus) {
            self.history.remove(&id);
            self.ledger.retain(|_, e| e.execution_id != id);
            tracing::debug!(execution_id = %id, "Evicted execution record");
        }
    }
}

fn transition(record: &mut RemediationExecution, to: ExecutionStatus) -> Result<(), TransitionError> {
    validate_transition(record.status, to)?;
    record.status = to;
    Ok(())
}

async fn rollback_steps(
    steps: &[Arc<dyn RemediationAction>],
    context: &ErrorContext,
    record: &mut RemediationExecution,
) -> RollbackStatus {
    let mut status = RollbackStatus::default();

    for action in steps {
        let id = action.id();
        if !action.descriptor().can_rollback {
            status.skipped_steps.push(id);
            continue;
        }

        let outcome = match action.rollback(context).await {
            Ok(result) if result.success => Ok(result),
            Ok(result) => Err((result.message.clone(), Some(result))),
            Err(e) => Err((e.to_string(), None)),
        };

        let slot = record.actions.iter_mut().find(|a| a.action_id == id);
        match outcome {
            Ok(result) => {
                tracing::debug!(correlation_id = %context.correlation_id, action_id = %id, "Rolled back action");
                status.rolled_back_steps.push(id);
                if let Some(slot) = slot {
                    slot.status = ActionStatus::RolledBack;
                    slot.rollback_result = Some(result);
                }
            }
            Err((reason, result)) => {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    action_id = %id,
                    reason = %reason,
                    "Rollback step failed"
                );
                if let Some(slot) = slot {
                    slot.rollback_result = result;
                }
                status.failed_rollback_steps.push(RollbackFailure { action_id: id, reason });
            }
        }
    }

    status.completed_at = Some(Utc::now());
    status
}

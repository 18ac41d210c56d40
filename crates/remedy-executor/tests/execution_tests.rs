use remedy_executor::{ExecutorError, RemediationExecutor};
use remedy_model::{ActionStatus, ExecutionBudget, ExecutionStatus};
use remedy_test_utils::{context, plan_for, ActionLog, RecordingAction};
use remedy_validation::rules::NonEmptyPlanRule;
use remedy_validation::ValidationRegistry;
use std::sync::Arc;
use std::time::Duration;

fn executor() -> RemediationExecutor {
    RemediationExecutor::new(Arc::new(ValidationRegistry::default()))
}

#[tokio::test]
async fn second_action_failure_rolls_back_first_only() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2).failing();
    let a3 = RecordingAction::new(&log, 3);
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared(), a3.shared()]);

    let execution = executor().execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(log.rolled_back(), vec![id1]);
    assert_eq!(log.executed(), vec![id1, id2]);
    assert_eq!(execution.attempted_actions(), vec![id1, id2]);
    assert_eq!(execution.actions[2].status, ActionStatus::Pending);
    let rollback = execution.rollback.unwrap();
    assert_eq!(rollback.rolled_back_steps, vec![id1]);
    assert!(rollback.is_clean());
    assert!(execution.completed_at.is_some());
}

#[tokio::test]
async fn all_actions_succeed() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(
        &ctx,
        vec![RecordingAction::new(&log, 2).shared(), RecordingAction::new(&log, 1).shared()],
    );
    let order: Vec<_> = plan.ordered_actions().iter().map(|a| a.id()).collect();

    let execution = executor().execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(log.executed(), order);
    assert!(log.rolled_back().is_empty());
    assert_eq!(execution.success_rate(), 1.0);
    assert!(execution.rollback.is_none());
}

#[tokio::test]
async fn validation_failure_runs_nothing() {
    let registry = ValidationRegistry::default();
    registry.register(Arc::new(NonEmptyPlanRule)).unwrap();
    let executor = RemediationExecutor::new(Arc::new(registry));
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(&ctx, Vec::new());

    let execution = executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::ValidationFailed);
    assert!(execution.actions.is_empty());
    assert!(!execution.validation.unwrap().success);
}

#[tokio::test]
async fn partial_effect_rollback_undoes_failed_action_first() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2).failing().partial_effect();
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared()]);

    let execution = executor().execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(log.rolled_back(), vec![id2, id1]);
}

#[tokio::test]
async fn irreversible_steps_are_skipped_and_rollback_failures_recorded() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1).failing_rollback();
    let a2 = RecordingAction::new(&log, 2).irreversible();
    let a3 = RecordingAction::new(&log, 3).failing();
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared(), a3.shared()]);

    let execution = executor().execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let rollback = execution.rollback.unwrap();
    assert_eq!(rollback.skipped_steps, vec![id2]);
    assert_eq!(rollback.failed_rollback_steps.len(), 1);
    assert_eq!(rollback.failed_rollback_steps[0].action_id, id1);
    assert!(log.rolled_back().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_mid_action_times_out_and_rolls_back() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2).with_delay(Duration::from_secs(60));
    let a3 = RecordingAction::new(&log, 3);
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared(), a3.shared()]);

    let execution = executor()
        .execute(&plan, &ctx, &ExecutionBudget::with_timeout(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Timeout);
    assert_eq!(execution.action(id2).unwrap().status, ActionStatus::Failed);
    assert_eq!(log.rolled_back(), vec![id1]);
    assert_eq!(log.executed(), vec![id1, id2]);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(&ctx, vec![RecordingAction::new(&log, 1).shared()]);
    let budget = ExecutionBudget::unbounded();
    budget.cancel();

    let execution = executor().execute(&plan, &ctx, &budget).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    assert!(log.executed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_execution_per_incident_at_a_time() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(
        &ctx,
        vec![RecordingAction::new(&log, 1).with_delay(Duration::from_secs(1)).shared()],
    );
    let executor = executor();
    let budget = ExecutionBudget::unbounded();

    let (first, second) = tokio::join!(
        executor.execute(&plan, &ctx, &budget),
        executor.execute(&plan, &ctx, &budget)
    );

    assert_eq!(first.unwrap().status, ExecutionStatus::Completed);
    assert_eq!(second.unwrap_err(), ExecutorError::AlreadyInProgress(ctx.correlation_id));
    assert!(!executor.is_in_flight(ctx.correlation_id));

    let retry = executor.execute(&plan, &ctx, &budget).await.unwrap();
    assert_eq!(retry.plan_id, plan.id);
}

#[tokio::test]
async fn plan_for_other_incident_is_rejected() {
    let ctx = context("orders", "Boom", "boom");
    let other = context("billing", "Boom", "boom");
    let plan = plan_for(&other, Vec::new());

    let err = executor().execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap_err();
    assert!(matches!(err, ExecutorError::PlanMismatch { .. }));
}

#[tokio::test]
async fn rollback_single_completed_action() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2);
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared()]);
    let executor = executor();

    let execution = executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
    assert_eq!(executor.ledger_for(ctx.correlation_id).len(), 2);

    let status = executor.rollback_action(id2, &ctx).await.unwrap();
    assert_eq!(status.rolled_back_steps, vec![id2]);
    assert_eq!(log.rolled_back(), vec![id2]);
    assert_eq!(
        executor.execution(execution.id).unwrap().action(id2).unwrap().status,
        ActionStatus::RolledBack
    );

    assert_eq!(
        executor.rollback_action(id2, &ctx).await.unwrap_err(),
        ExecutorError::UnknownAction(id2)
    );
    let stranger = context("billing", "Boom", "boom");
    assert_eq!(
        executor.rollback_action(id1, &stranger).await.unwrap_err(),
        ExecutorError::UnknownAction(id1)
    );
}

#[tokio::test]
async fn rollback_whole_execution() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2);
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared()]);
    let executor = executor();

    let execution = executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
    let undone = executor.rollback_execution(execution.id, &ctx).await.unwrap();

    assert_eq!(undone.status, ExecutionStatus::RolledBack);
    assert_eq!(log.rolled_back(), vec![id2, id1]);
    assert!(executor.ledger_for(ctx.correlation_id).is_empty());
    assert!(matches!(
        executor.rollback_execution(execution.id, &ctx).await,
        Err(ExecutorError::IllegalTransition(_))
    ));
}

#[tokio::test]
async fn failed_execution_cannot_be_rolled_back_again() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(&ctx, vec![RecordingAction::new(&log, 1).failing().shared()]);
    let executor = executor();

    let execution = executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
    assert!(matches!(
        executor.rollback_execution(execution.id, &ctx).await,
        Err(ExecutorError::IllegalTransition(_))
    ));
}

#[tokio::test]
async fn failed_rollback_step_stays_in_ledger() {
    let log = ActionLog::new();
    let ctx = context("orders", "Boom", "boom");
    let a1 = RecordingAction::new(&log, 1);
    let a2 = RecordingAction::new(&log, 2).failing_rollback();
    let (id1, id2) = (a1.id_hint(), a2.id_hint());
    let plan = plan_for(&ctx, vec![a1.shared(), a2.shared()]);
    let executor = executor();

    let execution = executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
    let undone = executor.rollback_execution(execution.id, &ctx).await.unwrap();

    let rollback = undone.rollback.unwrap();
    assert_eq!(rollback.rolled_back_steps, vec![id1]);
    assert_eq!(rollback.failed_rollback_steps.len(), 1);
    assert_eq!(executor.ledger_for(ctx.correlation_id), vec![id2]);

    let retry = executor.rollback_action(id2, &ctx).await.unwrap();
    assert_eq!(retry.failed_rollback_steps.len(), 1);
    assert_eq!(executor.ledger_for(ctx.correlation_id), vec![id2]);
}

#[tokio::test]
async fn history_limit_drops_oldest_executions() {
    let log = ActionLog::new();
    let executor = executor().with_history_limit(2);
    let mut executions = Vec::new();
    let mut contexts = Vec::new();
    for _ in 0..3 {
        let ctx = context("orders", "Boom", "boom");
        let plan = plan_for(&ctx, vec![RecordingAction::new(&log, 1).shared()]);
        executions.push(executor.execute(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap());
        contexts.push(ctx);
    }

    assert_eq!(executor.history_len(), 2);
    assert!(executor.execution(executions[0].id).is_none());
    assert!(executor.ledger_for(contexts[0].correlation_id).is_empty());
    assert!(executor.execution(executions[2].id).is_some());
    assert_eq!(executor.ledger_for(contexts[2].correlation_id).len(), 1);
}

//! Built-in rules running through the registry

use remedy_model::{ErrorCategory, ErrorSeverity, ErrorSubcategory, ExecutionBudget, ValidationLevel};
use remedy_strategy::{DryRunEffector, StrategyProvider};
use remedy_test_utils::{classified_context, context, plan_for, ActionLog, RecordingAction};
use remedy_validation::{rules, ValidationRegistry};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> ValidationRegistry {
    let registry = ValidationRegistry::new(100);
    for rule in rules::builtin(0.8, Duration::from_secs(600)) {
        registry.register(rule).unwrap();
    }
    registry
}

#[tokio::test]
async fn builtin_strategy_plan_passes() {
    let ctx = classified_context(ErrorCategory::Database, ErrorSubcategory::Timeout, ErrorSeverity::High);
    let plan = StrategyProvider::with_builtin(Arc::new(DryRunEffector::new()))
        .create_plan(&ctx)
        .unwrap();

    let report = registry().validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert!(report.outcome.success, "{}", report.outcome.message);
    assert_eq!(
        report.evaluated,
        vec!["non-empty-plan", "required-parameters", "max-risk", "max-duration", "rollback-coverage"]
    );
}

#[tokio::test]
async fn empty_plan_stops_at_first_rule() {
    let ctx = context("orders", "Boom", "boom");
    let plan = plan_for(&ctx, Vec::new());

    let report = registry().validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert!(!report.outcome.success);
    assert!(report.short_circuited);
    assert_eq!(report.evaluated, vec!["non-empty-plan"]);
    assert_eq!(report.outcome.level, ValidationLevel::Critical);
}

#[tokio::test]
async fn risky_plan_is_rejected_before_advisory_rules() {
    let ctx = context("orders", "Boom", "boom");
    let log = ActionLog::new();
    let plan = plan_for(&ctx, vec![RecordingAction::new(&log, 1).shared()]).with_risk(0.95);

    let report = registry().validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

    assert!(!report.outcome.success);
    assert_eq!(report.evaluated, vec!["non-empty-plan", "required-parameters", "max-risk"]);
    assert!(report.result_for("rollback-coverage").is_none());
}

#[tokio::test]
async fn required_parameters_result_is_cached() {
    let ctx = context("orders", "Boom", "boom");
    let log = ActionLog::new();
    let plan = plan_for(&ctx, vec![RecordingAction::new(&log, 1).shared()]);
    let registry = registry();
    let budget = ExecutionBudget::unbounded();

    registry.validate(&plan, &ctx, &budget).await.unwrap();
    let second = registry.validate(&plan, &ctx, &budget).await.unwrap();

    assert!(second.result_for("required-parameters").unwrap().is_from_cache);
    assert!(second.result_for("max-duration").unwrap().is_from_cache);
    assert!(!second.result_for("max-risk").unwrap().is_from_cache);
}

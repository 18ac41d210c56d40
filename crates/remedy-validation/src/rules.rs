//! Built-in validation rules
//!
//! | Rule | Priority | Cached |
//! |------|----------|--------|
//! | `non-empty-plan` | 5 | no |
//! | `required-parameters` | 4 | yes |
//! | `max-risk` | 4 | no |
//! | `max-duration` | 3 | yes |
//! | `rollback-coverage` | 2 | no, advisory |

use crate::error::RuleError;
use crate::rule::ValidationRule;
use async_trait::async_trait;
use remedy_model::{ErrorContext, ValidationLevel, ValidationResult};
use remedy_strategy::RemediationPlan;
use std::sync::Arc;
use std::time::Duration;

/// All built-in rules
#[must_use]
pub fn builtin(max_risk: f64, max_duration: Duration) -> Vec<Arc<dyn ValidationRule>> {
    vec![
        Arc::new(NonEmptyPlanRule),
        Arc::new(RequiredParametersRule),
        Arc::new(MaxRiskRule::new(max_risk)),
        Arc::new(MaxDurationRule::new(max_duration)),
        Arc::new(RollbackCoverageRule),
    ]
}

/// Rejects plans without actions
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyPlanRule;

#[async_trait]
impl ValidationRule for NonEmptyPlanRule {
    fn name(&self) -> &str {
        "non-empty-plan"
    }

    fn priority(&self) -> u8 {
        5
    }

    async fn evaluate(&self, plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
        Ok(if plan.is_empty() {
            ValidationResult::fail(
                ValidationLevel::Critical,
                format!("plan from '{}' has no actions", plan.strategy_id),
            )
        } else {
            ValidationResult::pass(format!("plan has {} actions", plan.len()))
        })
    }
}

/// Runs every action's own pre-execution check
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredParametersRule;

#[async_trait]
impl ValidationRule for RequiredParametersRule {
    fn name(&self) -> &str {
        "required-parameters"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    async fn evaluate(&self, plan: &RemediationPlan, context: &ErrorContext) -> Result<ValidationResult, RuleError> {
        let mut failures = Vec::new();
        for action in &plan.actions {
            let check = action.validate(context).await;
            if !check.success {
                failures.push(check.message);
            }
        }

        Ok(if failures.is_empty() {
            ValidationResult::pass("all action parameters present")
        } else {
            let mut result = ValidationResult::fail(ValidationLevel::Error, failures.join("; "));
            result.messages = failures;
            result
        })
    }
}

/// Rejects plans whose advisory risk exceeds a ceiling
#[derive(Debug, Clone, Copy)]
pub struct MaxRiskRule {
    max: f64,
}

impl MaxRiskRule {
    /// Create rule with ceiling `max`
    #[must_use]
    pub fn new(max: f64) -> Self {
        Self { max }
    }
}

#[async_trait]
impl ValidationRule for MaxRiskRule {
    fn name(&self) -> &str {
        "max-risk"
    }

    fn priority(&self) -> u8 {
        4
    }

    async fn evaluate(&self, plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
        Ok(if plan.risk > self.max {
            ValidationResult::fail(
                ValidationLevel::Error,
                format!("plan risk {:.2} exceeds {:.2}", plan.risk, self.max),
            )
        } else {
            ValidationResult::pass(format!("plan risk {:.2} within {:.2}", plan.risk, self.max))
        })
    }
}

/// Flags plans expected to run too long
#[derive(Debug, Clone, Copy)]
pub struct MaxDurationRule {
    max: Duration,
}

impl MaxDurationRule {
    /// Create rule with ceiling `max`
    #[must_use]
    pub fn new(max: Duration) -> Self {
        Self { max }
    }
}

#[async_trait]
impl ValidationRule for MaxDurationRule {
    fn name(&self) -> &str {
        "max-duration"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    async fn evaluate(&self, plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
        Ok(if plan.estimated_duration > self.max {
            ValidationResult::fail(
                ValidationLevel::Error,
                format!(
                    "estimated duration {}s exceeds {}s",
                    plan.estimated_duration.as_secs(),
                    self.max.as_secs()
                ),
            )
        } else {
            ValidationResult::pass(format!("estimated duration {}s", plan.estimated_duration.as_secs()))
        })
    }
}

/// Warns about actions that cannot be undone
#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackCoverageRule;

#[async_trait]
impl ValidationRule for RollbackCoverageRule {
    fn name(&self) -> &str {
        "rollback-coverage"
    }

    fn priority(&self) -> u8 {
        2
    }

    async fn evaluate(&self, plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
        let irreversible: Vec<&str> = plan
            .descriptors()
            .filter(|d| !d.can_rollback)
            .map(|d| d.action_type.as_str())
            .collect();

        Ok(if irreversible.is_empty() {
            ValidationResult::pass("every action can be rolled back")
        } else {
            ValidationResult::warn(format!("irreversible actions: {}", irreversible.join(", ")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_test_utils::{context, plan_for, ActionLog, RecordingAction};

    fn plan_with(actions: Vec<Arc<dyn remedy_strategy::RemediationAction>>) -> (RemediationPlan, ErrorContext) {
        let ctx = context("orders", "Boom", "boom");
        (plan_for(&ctx, actions), ctx)
    }

    #[tokio::test]
    async fn empty_plan_is_critical() {
        let (plan, ctx) = plan_with(Vec::new());
        let result = NonEmptyPlanRule.evaluate(&plan, &ctx).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.level, ValidationLevel::Critical);
    }

    #[tokio::test]
    async fn missing_parameters_are_listed() {
        let log = ActionLog::new();
        let (plan, ctx) = plan_with(vec![
            RecordingAction::new(&log, 1).requires("service").shared(),
            RecordingAction::new(&log, 2).shared(),
        ]);
        let result = RequiredParametersRule.evaluate(&plan, &ctx).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.messages.len(), 1);
        assert!(result.message.contains("service"));
    }

    #[tokio::test]
    async fn risk_ceiling() {
        let (plan, ctx) = plan_with(Vec::new());
        let risky = plan.clone().with_risk(0.9);
        assert!(MaxRiskRule::new(0.8).evaluate(&plan, &ctx).await.unwrap().success);
        assert!(!MaxRiskRule::new(0.8).evaluate(&risky, &ctx).await.unwrap().success);
    }

    #[tokio::test]
    async fn duration_ceiling() {
        let (plan, ctx) = plan_with(Vec::new());
        let long = plan.clone().with_estimated_duration(Duration::from_secs(900));
        let rule = MaxDurationRule::new(Duration::from_secs(600));
        assert!(rule.evaluate(&plan, &ctx).await.unwrap().success);
        assert!(!rule.evaluate(&long, &ctx).await.unwrap().success);
    }

    #[tokio::test]
    async fn irreversible_actions_only_warn() {
        let log = ActionLog::new();
        let (plan, ctx) = plan_with(vec![
            RecordingAction::new(&log, 1).shared(),
            RecordingAction::new(&log, 2).irreversible().shared(),
        ]);
        let result = RollbackCoverageRule.evaluate(&plan, &ctx).await.unwrap();
        assert!(result.success);
        assert_eq!(result.level, ValidationLevel::Warning);
    }

    #[test]
    fn builtin_set_is_well_formed() {
        let rules = builtin(0.8, Duration::from_secs(600));
        assert_eq!(rules.len(), 5);
        assert!(rules.iter().all(|r| (1..=5).contains(&r.priority())));
    }
}

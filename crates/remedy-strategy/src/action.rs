//! Remediation actions
//!
//! An action pairs an [`ActionDescriptor`] with the behaviour that runs
//! it. Built-in strategies emit [`EffectorAction`]s, which delegate the
//! actual side effect to a host-supplied [`ActionEffector`].

use crate::error::ActionError;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use remedy_model::{ActionDescriptor, ActionId, ErrorContext, RemediationResult, ValidationLevel, ValidationResult};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// One reversible unit of remediation work
///
/// `execute` must be safe to call again after a failure: either
/// idempotent or reporting failure, never silently applying twice.
#[async_trait]
pub trait RemediationAction: Send + Sync + std::fmt::Debug {
    /// Static description of the action
    fn descriptor(&self) -> &ActionDescriptor;

    /// Action id
    fn id(&self) -> ActionId {
        self.descriptor().id
    }

    /// Pre-execution sanity check
    async fn validate(&self, _context: &ErrorContext) -> ValidationResult {
        let descriptor = self.descriptor();
        let missing = descriptor.missing_parameters();
        if missing.is_empty() {
            ValidationResult::pass(format!("{} parameters present", descriptor.action_type))
        } else {
            ValidationResult::fail(
                ValidationLevel::Error,
                format!("{} is missing parameters: {}", descriptor.action_type, missing.join(", ")),
            )
        }
    }

    /// Perform the action
    ///
    /// A result with `success == false` is a failure just like `Err`.
    async fn execute(&self, context: &ErrorContext) -> Result<RemediationResult, ActionError>;

    /// Undo the action
    async fn rollback(&self, context: &ErrorContext) -> Result<RemediationResult, ActionError>;
}

/// Host hook that performs an action's side effect
#[async_trait]
pub trait ActionEffector: Send + Sync + std::fmt::Debug {
    /// Apply `action` for `context`, returning output to record
    async fn apply(&self, action: &ActionDescriptor, context: &ErrorContext) -> Result<Value, ActionError>;
}

/// Action whose side effect is delegated to an [`ActionEffector`]
///
/// Rollback applies the paired rollback descriptor. A reversible action
/// without one has nothing to undo.
#[derive(Debug, Clone)]
pub struct EffectorAction {
    descriptor: ActionDescriptor,
    effector: Arc<dyn ActionEffector>,
}

impl EffectorAction {
    /// Create action
    #[inline]
    #[must_use]
    pub fn new(descriptor: ActionDescriptor, effector: Arc<dyn ActionEffector>) -> Self {
        Self { descriptor, effector }
    }

    /// Wrap into a shareable trait object
    #[inline]
    #[must_use]
    pub fn shared(self) -> Arc<dyn RemediationAction> {
        Arc::new(self)
    }
}

#[async_trait]
impl RemediationAction for EffectorAction {
    fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &ErrorContext) -> Result<RemediationResult, ActionError> {
        let missing = self.descriptor.missing_parameters();
        if !missing.is_empty() {
            return Err(ActionError::MissingParameters {
                action_id: self.descriptor.id,
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let started_at = Utc::now();
        let output = self.effector.apply(&self.descriptor, context).await?;
        Ok(RemediationResult::success(self.descriptor.id, started_at, &self.descriptor.description).with_output(output))
    }

    async fn rollback(&self, context: &ErrorContext) -> Result<RemediationResult, ActionError> {
        if !self.descriptor.can_rollback {
            return Err(ActionError::NotReversible(self.descriptor.id));
        }

        let started_at = Utc::now();
        match &self.descriptor.rollback {
            Some(undo) => {
                let output = self.effector.apply(undo, context).await?;
                Ok(RemediationResult::success(self.descriptor.id, started_at, &undo.description).with_output(output))
            }
            None => Ok(RemediationResult::success(
                self.descriptor.id,
                started_at,
                format!("{} has no effect to undo", self.descriptor.action_type),
            )),
        }
    }
}

/// Effector that only logs and records what it was asked to do
///
/// Action types registered with [`DryRunEffector::failing_on`] fail.
#[derive(Debug, Default)]
pub struct DryRunEffector {
    applied: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl DryRunEffector {
    /// Create effector that succeeds on everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever `action_type` is applied
    #[inline]
    #[must_use]
    pub fn failing_on(mut self, action_type: impl Into<String>) -> Self {
        self.failing.insert(action_type.into());
        self
    }

    /// Action types applied so far, in order
    #[must_use]
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }
}

#[async_trait]
impl ActionEffector for DryRunEffector {
    async fn apply(&self, action: &ActionDescriptor, context: &ErrorContext) -> Result<Value, ActionError> {
        self.applied.lock().push(action.action_type.clone());

        if self.failing.contains(&action.action_type) {
            tracing::warn!(
                correlation_id = %context.correlation_id,
                action_id = %action.id,
                action_type = %action.action_type,
                "Dry run failure"
            );
            return Err(ActionError::effector(&action.action_type, "dry run failure"));
        }

        tracing::info!(
            correlation_id = %context.correlation_id,
            action_id = %action.id,
            action_type = %action.action_type,
            "Dry run"
        );
        Ok(serde_json::json!({
            "dry_run": true,
            "action_type": action.action_type,
            "parameters": action.parameters,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_model::RuntimeError;

    fn context() -> ErrorContext {
        ErrorContext::new("orders", "checkout", RuntimeError::new("Boom", "boom"))
    }

    #[tokio::test]
    async fn execute_delegates_to_effector() {
        let effector = Arc::new(DryRunEffector::new());
        let action = EffectorAction::new(
            ActionDescriptor::new("restart-service", "Restart orders", 1).with_parameter("service", "orders"),
            effector.clone(),
        );

        let result = action.execute(&context()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output["parameters"]["service"], "orders");
        assert_eq!(effector.applied(), vec!["restart-service"]);
    }

    #[tokio::test]
    async fn missing_parameters_fail_before_effect() {
        let effector = Arc::new(DryRunEffector::new());
        let action = EffectorAction::new(
            ActionDescriptor::new("restart-service", "Restart", 1).requires("service"),
            effector.clone(),
        );

        assert!(!action.validate(&context()).await.success);
        let err = action.execute(&context()).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingParameters { .. }));
        assert!(effector.applied().is_empty());
    }

    #[tokio::test]
    async fn rollback_applies_paired_action() {
        let effector = Arc::new(DryRunEffector::new());
        let action = EffectorAction::new(
            ActionDescriptor::new("open-circuit", "Open", 1)
                .with_rollback(ActionDescriptor::new("close-circuit", "Close", 1)),
            effector.clone(),
        );

        action.execute(&context()).await.unwrap();
        action.rollback(&context()).await.unwrap();
        assert_eq!(effector.applied(), vec!["open-circuit", "close-circuit"]);
    }

    #[tokio::test]
    async fn rollback_of_irreversible_action_is_refused() {
        let action = EffectorAction::new(
            ActionDescriptor::new("restart-service", "Restart", 1),
            Arc::new(DryRunEffector::new()),
        );
        assert_eq!(
            action.rollback(&context()).await.unwrap_err(),
            ActionError::NotReversible(action.id())
        );
    }

    #[tokio::test]
    async fn failing_effector() {
        let action = EffectorAction::new(
            ActionDescriptor::new("reset-connections", "Reset", 1),
            Arc::new(DryRunEffector::new().failing_on("reset-connections")),
        );
        let err = action.execute(&context()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}

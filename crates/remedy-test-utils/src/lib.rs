//! Testing utilities for the remedy workspace
//!
//! Shared fixtures: scripted suggestion generator, recording actions,
//! context and snapshot builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use remedy_analysis::{
    AnalysisReport, ComponentObservation, DependencyObservation, GeneratorError, RuntimeSnapshot, SuggestionGenerator,
};
use remedy_model::{
    ActionDescriptor, ActionId, ErrorCategory, ErrorClassification, ErrorContext, ErrorSeverity, ErrorSubcategory,
    RemediationResult, RuntimeError,
};
use remedy_strategy::{ActionError, RemediationAction, RemediationPlan};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Suggestion generator replaying canned answers
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GeneratorError>>>,
    fallback: Option<Result<String, GeneratorError>>,
    remediation: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    /// Always answer `text`
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(text.into())),
            remediation: "no remediation".to_string(),
            ..Self::default()
        }
    }

    /// Always fail as unavailable
    pub fn failing() -> Self {
        Self {
            fallback: Some(Err(GeneratorError::Unavailable("scripted outage".to_string()))),
            remediation: "no remediation".to_string(),
            ..Self::default()
        }
    }

    /// Answer with a JSON analysis
    pub fn analysis(root_cause: &str, severity: f64) -> Self {
        Self::replying(
            serde_json::json!({
                "root_cause": root_cause,
                "severity": severity,
                "confidence": 0.9,
                "suggested_actions": ["reset connections"],
            })
            .to_string(),
        )
    }

    /// Queue a one-off reply served before the fallback
    pub fn then_reply(self, reply: Result<String, GeneratorError>) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SuggestionGenerator for ScriptedGenerator {
    async fn analyze_error(&self, _prompt: &str) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let queued = self.replies.lock().pop_front();
        queued
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(GeneratorError::InvalidResponse("script exhausted".to_string())))
    }

    async fn generate_remediation(&self, analysis: &AnalysisReport) -> Result<String, GeneratorError> {
        Ok(format!("{}: {}", self.remediation, analysis.root_cause))
    }
}

/// Shared record of executed and rolled back actions
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    executed: Arc<Mutex<Vec<ActionId>>>,
    rolled_back: Arc<Mutex<Vec<ActionId>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<ActionId> {
        self.executed.lock().clone()
    }

    pub fn rolled_back(&self) -> Vec<ActionId> {
        self.rolled_back.lock().clone()
    }
}

/// Action that records calls into an [`ActionLog`]
#[derive(Debug, Clone)]
pub struct RecordingAction {
    descriptor: ActionDescriptor,
    log: ActionLog,
    fail: bool,
    fail_rollback: bool,
    delay: Duration,
}

impl RecordingAction {
    /// Reversible action that succeeds
    pub fn new(log: &ActionLog, priority: i32) -> Self {
        Self {
            descriptor: ActionDescriptor::new("recording", format!("recording action {priority}"), priority)
                .reversible(),
            log: log.clone(),
            fail: false,
            fail_rollback: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.descriptor.can_rollback = false;
        self
    }

    pub fn partial_effect(mut self) -> Self {
        self.descriptor.partial_effect_rollback = true;
        self
    }

    pub fn requires(mut self, key: &str) -> Self {
        self.descriptor = self.descriptor.requires(key);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Id the action will report once shared
    pub fn id_hint(&self) -> ActionId {
        self.descriptor.id
    }

    pub fn shared(self) -> Arc<dyn RemediationAction> {
        Arc::new(self)
    }
}

#[async_trait]
impl RemediationAction for RecordingAction {
    fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _context: &ErrorContext) -> Result<RemediationResult, ActionError> {
        let started_at = Utc::now();
        self.log.executed.lock().push(self.descriptor.id);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ActionError::effector("recording", "scripted failure"));
        }
        Ok(RemediationResult::success(self.descriptor.id, started_at, "recorded"))
    }

    async fn rollback(&self, _context: &ErrorContext) -> Result<RemediationResult, ActionError> {
        let started_at = Utc::now();
        if !self.descriptor.can_rollback {
            return Err(ActionError::NotReversible(self.descriptor.id));
        }
        if self.fail_rollback {
            return Err(ActionError::effector("recording", "scripted rollback failure"));
        }
        self.log.rolled_back.lock().push(self.descriptor.id);
        Ok(RemediationResult::success(self.descriptor.id, started_at, "undone"))
    }
}

pub fn runtime_error(error_type: &str, message: &str) -> RuntimeError {
    RuntimeError::new(error_type, message)
}

pub fn context(service: &str, error_type: &str, message: &str) -> ErrorContext {
    ErrorContext::new(service, "handle", runtime_error(error_type, message))
}

pub fn classified_context(
    category: ErrorCategory,
    subcategory: ErrorSubcategory,
    severity: ErrorSeverity,
) -> ErrorContext {
    let mut ctx = context("orders", "TestError", "test failure");
    ctx.apply_classification(ErrorClassification {
        category,
        subcategory,
        severity,
        error_type: "TestError".to_string(),
        confidence: 0.9,
    });
    ctx
}

pub fn plan_for(context: &ErrorContext, actions: Vec<Arc<dyn RemediationAction>>) -> RemediationPlan {
    RemediationPlan::new("test", context.correlation_id, actions)
}

/// Snapshot with the given component ids and `source -> target` edges
pub fn snapshot(ids: &[&str], edges: &[(&str, &str)]) -> RuntimeSnapshot {
    let mut s = RuntimeSnapshot::new();
    for id in ids {
        s = s.with_component(ComponentObservation::new(*id, "service"));
    }
    for (source, target) in edges {
        s = s.with_dependency(DependencyObservation::new(*source, *target));
    }
    s
}

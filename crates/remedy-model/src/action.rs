//! Remediation action data
//!
//! [`ActionDescriptor`] is the data half of an action; behaviour lives
//! behind the `RemediationAction` trait in `remedy-strategy`.

use crate::ids::ActionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Lifecycle of a single action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Not yet run
    #[default]
    Pending,
    /// Running
    Running,
    /// Finished successfully
    Completed,
    /// Finished with failure
    Failed,
    /// Undone after completing
    RolledBack,
}

/// Description of one reversible unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Unique action id
    pub id: ActionId,
    /// Type tag (e.g. `restart_component`)
    pub action_type: String,
    /// Human description
    pub description: String,
    /// Lower executes first; ties keep insertion order
    pub priority: i32,
    /// Parameters
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Parameters that must be present before execution
    pub required_parameters: Vec<String>,
    /// Whether the action can be undone
    pub can_rollback: bool,
    /// Whether a failed run may have left effects that rollback should undo
    pub partial_effect_rollback: bool,
    /// Paired rollback action
    pub rollback: Option<Box<ActionDescriptor>>,
    /// Advisory duration estimate
    pub estimated_duration: Duration,
}

impl ActionDescriptor {
    /// Create a non-reversible action
    #[must_use]
    pub fn new(action_type: impl Into<String>, description: impl Into<String>, priority: i32) -> Self {
        Self {
            id: ActionId::new(),
            action_type: action_type.into(),
            description: description.into(),
            priority,
            parameters: BTreeMap::new(),
            required_parameters: Vec::new(),
            can_rollback: false,
            partial_effect_rollback: false,
            rollback: None,
            estimated_duration: Duration::from_secs(1),
        }
    }

    /// Add a parameter
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Declare a required parameter
    #[inline]
    #[must_use]
    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.required_parameters.push(key.into());
        self
    }

    /// Pair with a rollback action; marks this action reversible
    #[inline]
    #[must_use]
    pub fn with_rollback(mut self, rollback: ActionDescriptor) -> Self {
        self.can_rollback = true;
        self.rollback = Some(Box::new(rollback));
        self
    }

    /// Mark reversible without a paired action
    #[inline]
    #[must_use]
    pub fn reversible(mut self) -> Self {
        self.can_rollback = true;
        self
    }

    /// Roll this action back even when it fails part-way
    #[inline]
    #[must_use]
    pub fn with_partial_effect_rollback(mut self) -> Self {
        self.partial_effect_rollback = true;
        self
    }

    /// Set duration estimate
    #[inline]
    #[must_use]
    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    /// Required parameters that are absent
    #[must_use]
    pub fn missing_parameters(&self) -> Vec<&str> {
        self.required_parameters
            .iter()
            .filter(|k| !self.parameters.contains_key(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Outcome of running (or rolling back) one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationResult {
    /// Action that ran
    pub action_id: ActionId,
    /// Whether it succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// Structured output
    pub output: serde_json::Value,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: DateTime<Utc>,
}

impl RemediationResult {
    /// Successful result finishing now
    #[must_use]
    pub fn success(action_id: ActionId, started_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            action_id,
            success: true,
            message: message.into(),
            output: serde_json::Value::Null,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Failed result finishing now
    #[must_use]
    pub fn failure(action_id: ActionId, started_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(action_id, started_at, message)
        }
    }

    /// Attach structured output
    #[inline]
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    /// Wall-clock duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.completed_at - self.started_at).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_rollback_marks_reversible() {
        let d = ActionDescriptor::new("open_circuit", "open", 1)
            .with_rollback(ActionDescriptor::new("close_circuit", "close", 1));
        assert!(d.can_rollback);
        assert_eq!(d.rollback.as_ref().unwrap().action_type, "close_circuit");
    }

    #[test]
    fn missing_parameters_lists_absent_keys() {
        let d = ActionDescriptor::new("restart", "restart", 1)
            .requires("component")
            .requires("grace_secs")
            .with_parameter("component", "orders");
        assert_eq!(d.missing_parameters(), vec!["grace_secs"]);
    }

    #[test]
    fn failure_result_is_unsuccessful() {
        let r = RemediationResult::failure(ActionId::new(), Utc::now(), "boom");
        assert!(!r.success);
        assert_eq!(r.message, "boom");
    }
}

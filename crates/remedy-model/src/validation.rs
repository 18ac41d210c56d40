//! Validation results

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// Informational
    #[default]
    Info,
    /// Advisory
    Warning,
    /// Blocks execution
    Error,
    /// Blocks execution, requires attention
    Critical,
}

/// Outcome of one rule evaluation or an aggregate plan validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether validation passed
    pub success: bool,
    /// Summary message
    pub message: String,
    /// Severity
    pub level: ValidationLevel,
    /// Rule that produced the result (absent for aggregates)
    pub rule: Option<String>,
    /// Individual messages (aggregates collect one per rule)
    pub messages: Vec<String>,
    /// Whether the result was served from cache
    pub is_from_cache: bool,
    /// Evaluation time
    pub duration: Duration,
}

impl ValidationResult {
    /// Passing result
    #[must_use]
    pub fn pass(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: true,
            messages: vec![message.clone()],
            message,
            level: ValidationLevel::Info,
            rule: None,
            is_from_cache: false,
            duration: Duration::ZERO,
        }
    }

    /// Failing result at `level`
    #[must_use]
    pub fn fail(level: ValidationLevel, message: impl Into<String>) -> Self {
        Self {
            success: false,
            level,
            ..Self::pass(message)
        }
    }

    /// Passing result carrying a warning
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Warning,
            ..Self::pass(message)
        }
    }

    /// Attribute to a rule
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Set evaluation time
    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an individual message
    #[inline]
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Mark as served from cache
    #[inline]
    #[must_use]
    pub fn from_cache(mut self) -> Self {
        self.is_from_cache = true;
        self
    }
}

//! Remediation metrics

use crate::impact::ImpactLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric name
    pub name: String,
    /// Value
    pub value: f64,
    /// Record time
    pub recorded_at: DateTime<Utc>,
}

/// Metric attributed to one remediation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetric {
    /// Step (action type or id)
    pub step: String,
    /// Metric name
    pub name: String,
    /// Value
    pub value: f64,
    /// Record time
    pub recorded_at: DateTime<Utc>,
}

/// Metrics for one remediation, or an aggregate over many
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationMetrics {
    /// Remediation id (empty for aggregates)
    pub remediation_id: String,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Success rate in `[0, 1]`
    pub success_rate: f64,
    /// Impact observed
    pub impact: ImpactLevel,
    /// Severity observed; must be `None` when impact is `None`
    pub severity: ImpactLevel,
    /// Per-step metrics
    pub steps: Vec<StepMetric>,
    /// Record time
    pub recorded_at: DateTime<Utc>,
}

impl RemediationMetrics {
    /// Empty metrics for a remediation
    #[must_use]
    pub fn new(remediation_id: impl Into<String>) -> Self {
        Self {
            remediation_id: remediation_id.into(),
            duration_secs: 0.0,
            success_rate: 0.0,
            impact: ImpactLevel::None,
            severity: ImpactLevel::None,
            steps: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Set duration
    #[inline]
    #[must_use]
    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Set success rate
    #[inline]
    #[must_use]
    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate;
        self
    }

    /// Set impact and severity
    #[inline]
    #[must_use]
    pub fn with_impact(mut self, impact: ImpactLevel, severity: ImpactLevel) -> Self {
        self.impact = impact;
        self.severity = severity;
        self
    }

    /// Add a step metric
    #[inline]
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        self.steps.push(StepMetric {
            step: step.into(),
            name: name.into(),
            value,
            recorded_at: Utc::now(),
        });
        self
    }

    /// Override record time
    #[inline]
    #[must_use]
    pub fn at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }
}

/// Inclusive time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start (inclusive)
    pub start: DateTime<Utc>,
    /// End (inclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create range
    #[inline]
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range ending now and spanning `window`
    #[must_use]
    pub fn last(window: chrono::Duration) -> Self {
        let end = Utc::now();
        Self { start: end - window, end }
    }

    /// Check if `t` falls in range
    #[inline]
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

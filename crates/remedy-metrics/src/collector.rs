//! Metrics collector
//!
//! History is held in two concurrent maps keyed by remediation id: raw
//! metric points, and the summarised [`RemediationMetrics`] record that
//! aggregation reads.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use remedy_model::{
    ImpactLevel, MetricPoint, RemediationExecution, RemediationMetrics, StepMetric, TimeRange,
    ValidationLevel, ValidationResult,
};

/// Histogram receiving every recorded step value
pub const STEP_HISTOGRAM: &str = "remedy.step.value";

/// Counter of finished executions, labelled by status
pub const EXECUTIONS_COUNTER: &str = "remedy.executions";

/// Concurrent in-memory metrics history
#[derive(Debug, Default)]
pub struct MetricsCollector {
    points: DashMap<String, Vec<MetricPoint>>,
    remediations: DashMap<String, RemediationMetrics>,
}

impl MetricsCollector {
    /// Create empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped value to a remediation's history
    ///
    /// The value is also attached as a step metric to the remediation's
    /// summary record, creating the record on first use.
    pub fn record_metric(&self, remediation_id: &str, name: &str, value: f64) {
        let now = Utc::now();
        self.points
            .entry(remediation_id.to_string())
            .or_default()
            .push(MetricPoint {
                name: name.to_string(),
                value,
                recorded_at: now,
            });

        self.remediations
            .entry(remediation_id.to_string())
            .or_insert_with(|| RemediationMetrics::new(remediation_id).at(now))
            .steps
            .push(StepMetric {
                step: name.to_string(),
                name: name.to_string(),
                value,
                recorded_at: now,
            });

        metrics::histogram!(STEP_HISTOGRAM, "name" => name.to_string()).record(value);
        tracing::trace!(remediation_id, name, value, "metric recorded");
    }

    /// Summarise a finished execution and store it under the execution id
    ///
    /// Each attempted action contributes a `duration_secs` step metric.
    pub fn record_execution(
        &self,
        execution: &RemediationExecution,
        impact: ImpactLevel,
        severity: ImpactLevel,
    ) -> RemediationMetrics {
        let mut summary = RemediationMetrics::new(execution.id.to_string())
            .with_duration_secs(execution.duration().as_secs_f64())
            .with_success_rate(execution.success_rate())
            .with_impact(impact, severity)
            .at(execution.completed_at.unwrap_or_else(Utc::now));

        for action in &execution.actions {
            if let Some(result) = &action.result {
                summary = summary.with_step(
                    action.action_type.clone(),
                    "duration_secs",
                    result.duration().as_secs_f64(),
                );
            }
        }

        metrics::counter!(EXECUTIONS_COUNTER, "status" => execution.status.as_str()).increment(1);
        self.record_remediation(summary.clone());
        summary
    }

    /// Store a summary record, replacing any earlier one for the same id
    ///
    /// Invalid records are still stored; the returned result says what is
    /// wrong with them.
    pub fn record_remediation(&self, summary: RemediationMetrics) -> ValidationResult {
        let check = Self::validate_metrics(&summary);
        if !check.success {
            tracing::warn!(
                remediation_id = %summary.remediation_id,
                problems = %check.message,
                "storing invalid remediation metrics"
            );
        }
        for step in &summary.steps {
            metrics::histogram!(STEP_HISTOGRAM, "name" => step.name.clone()).record(step.value);
        }
        self.remediations.insert(summary.remediation_id.clone(), summary);
        check
    }

    /// Summary record for a remediation
    #[must_use]
    pub fn get_metrics(&self, remediation_id: &str) -> Option<RemediationMetrics> {
        self.remediations.get(remediation_id).map(|m| m.value().clone())
    }

    /// Raw metric points for a remediation, oldest first
    #[must_use]
    pub fn history(&self, remediation_id: &str) -> Vec<MetricPoint> {
        self.points
            .get(remediation_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    /// Fold every summary recorded within `range`
    ///
    /// Duration and success rate are averaged, impact and severity take the
    /// maximum observed, step metrics are concatenated in record order. An
    /// empty range yields zeros.
    #[must_use]
    pub fn get_aggregated_metrics(&self, range: TimeRange) -> RemediationMetrics {
        let mut records: Vec<RemediationMetrics> = self
            .remediations
            .iter()
            .filter(|m| range.contains(m.recorded_at))
            .map(|m| m.value().clone())
            .collect();
        records.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.remediation_id.cmp(&b.remediation_id))
        });
        aggregate(&records, range.end)
    }

    /// Number of remediations with a summary record
    #[must_use]
    pub fn len(&self) -> usize {
        self.remediations.len()
    }

    /// Check if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remediations.is_empty()
    }

    /// Drop all history for a remediation
    pub fn forget(&self, remediation_id: &str) {
        self.points.remove(remediation_id);
        self.remediations.remove(remediation_id);
    }

    /// Check a metrics record for sanity
    ///
    /// Every violated bound is reported; any violation fails the result at
    /// [`ValidationLevel::Error`].
    #[must_use]
    pub fn validate_metrics(metrics: &RemediationMetrics) -> ValidationResult {
        let mut problems = Vec::new();

        if metrics.duration_secs.is_nan() || metrics.duration_secs < 0.0 {
            problems.push(format!("duration must be >= 0 (got {})", metrics.duration_secs));
        }
        if !(0.0..=1.0).contains(&metrics.success_rate) {
            problems.push(format!(
                "success rate must be within [0, 1] (got {})",
                metrics.success_rate
            ));
        }
        if metrics.impact == ImpactLevel::None && metrics.severity != ImpactLevel::None {
            problems.push(format!(
                "severity must be None when impact is None (got {:?})",
                metrics.severity
            ));
        }
        if metrics.steps.is_empty() {
            problems.push("at least one step metric is required".to_string());
        }

        if problems.is_empty() {
            return ValidationResult::pass("metrics valid").with_rule("metrics");
        }
        let mut result =
            ValidationResult::fail(ValidationLevel::Error, problems.join("; ")).with_rule("metrics");
        result.messages = problems;
        result
    }
}

fn aggregate(records: &[RemediationMetrics], at: DateTime<Utc>) -> RemediationMetrics {
    let mut summary = RemediationMetrics::new("").at(at);
    if records.is_empty() {
        return summary;
    }

    let n = records.len() as f64;
    summary.duration_secs = records.iter().map(|m| m.duration_secs).sum::<f64>() / n;
    summary.success_rate = records.iter().map(|m| m.success_rate).sum::<f64>() / n;
    summary.impact = records.iter().map(|m| m.impact).max().unwrap_or_default();
    summary.severity = records.iter().map(|m| m.severity).max().unwrap_or_default();
    summary.steps = records.iter().flat_map(|m| m.steps.iter().cloned()).collect();
    summary
}

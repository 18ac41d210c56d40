//! Error classification
//!
//! Root-cause text from the suggestion generator is run through three
//! independent rules:
//!
//! - category: first of `database`, `network`, `file`, `memory` found
//!   (case-insensitive), default `General`
//! - subcategory: first of `timeout`, `permission`, `connection` found,
//!   default `Unknown`
//! - severity: the generator's severity score bucketed by
//!   [`ErrorSeverity::from_score`]

use crate::error::{ClassificationError, GeneratorError};
use crate::generator::SuggestionGenerator;
use crate::graph::ComponentObservation;
use crate::report::AnalysisReport;
use remedy_model::{
    ErrorCategory, ErrorClassification, ErrorContext, ErrorSeverity, ErrorSubcategory, ExecutionBudget,
};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

const CATEGORY_KEYWORDS: [(&str, ErrorCategory); 4] = [
    ("database", ErrorCategory::Database),
    ("network", ErrorCategory::Network),
    ("file", ErrorCategory::FileSystem),
    ("memory", ErrorCategory::Resource),
];

const SUBCATEGORY_KEYWORDS: [(&str, ErrorSubcategory); 3] = [
    ("timeout", ErrorSubcategory::Timeout),
    ("permission", ErrorSubcategory::Permission),
    ("connection", ErrorSubcategory::Connection),
];

/// Maximum trace lines forwarded to the generator
const PROMPT_TRACE_LINES: usize = 10;

/// Map root-cause text to a category
#[must_use]
pub fn determine_category(root_cause: &str) -> ErrorCategory {
    let text = root_cause.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(kw, _)| text.contains(kw))
        .map_or(ErrorCategory::General, |(_, c)| *c)
}

/// Map root-cause text to a subcategory
#[must_use]
pub fn determine_subcategory(root_cause: &str) -> ErrorSubcategory {
    let text = root_cause.to_lowercase();
    SUBCATEGORY_KEYWORDS
        .iter()
        .find(|(kw, _)| text.contains(kw))
        .map_or(ErrorSubcategory::Unknown, |(_, c)| *c)
}

/// Bucket a severity score
#[inline]
#[must_use]
pub fn determine_severity(score: f64) -> ErrorSeverity {
    ErrorSeverity::from_score(score)
}

/// Build the analysis prompt for a context
#[must_use]
pub fn build_prompt(context: &ErrorContext) -> String {
    let err = &context.error;
    let mut prompt = String::from(
        "Analyze the following runtime error. Respond with a JSON object with fields \
         root_cause (string), severity (0-1), confidence (0-1) and suggested_actions (list of strings).\n",
    );
    let _ = writeln!(prompt, "Service: {}", context.service_name);
    let _ = writeln!(prompt, "Operation: {}", context.operation_name);
    let _ = writeln!(prompt, "Error type: {}", err.error_type);
    let _ = writeln!(prompt, "Message: {}", err.message);
    if let Some(component) = &err.component {
        let _ = writeln!(prompt, "Component: {component}");
    }
    for cause in err.chain().skip(1) {
        let _ = writeln!(prompt, "Caused by: {cause}");
    }
    if let Some(trace) = &err.stack_trace {
        prompt.push_str("Trace:\n");
        for line in trace.lines().take(PROMPT_TRACE_LINES) {
            let _ = writeln!(prompt, "  {}", line.trim_end());
        }
    }
    for (key, value) in &context.additional_context {
        let _ = writeln!(prompt, "Context {key}: {value}");
    }
    prompt
}

/// Estimates a component's error probability
pub trait ProbabilityEstimator: Send + Sync + std::fmt::Debug {
    /// Probability in `[0, 1]`
    fn error_probability(&self, component: &ComponentObservation) -> f64;
}

/// Probability from an explicit rate hint, else observed errors / requests
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservedRateEstimator;

impl ProbabilityEstimator for ObservedRateEstimator {
    fn error_probability(&self, component: &ComponentObservation) -> f64 {
        ErrorClassifier::calculate_error_probability(component)
    }
}

/// Classifier backed by a suggestion generator
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    generator: Arc<dyn SuggestionGenerator>,
    call_timeout: Option<Duration>,
}

impl ErrorClassifier {
    /// Create classifier
    #[inline]
    #[must_use]
    pub fn new(generator: Arc<dyn SuggestionGenerator>) -> Self {
        Self {
            generator,
            call_timeout: None,
        }
    }

    /// Limit each generator call to `timeout`
    ///
    /// Expiry is reported as an unavailable generator, independent of the
    /// caller's budget.
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    async fn limited<F>(&self, call: F) -> Result<String, GeneratorError>
    where
        F: std::future::Future<Output = Result<String, GeneratorError>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(GeneratorError::Unavailable(format!("analysis timed out after {limit:?}")))),
            None => call.await,
        }
    }

    /// Ask the generator for an analysis of `context`
    ///
    /// # Errors
    /// - [`ClassificationError::InvalidInput`] for malformed contexts
    /// - [`ClassificationError::AnalysisUnavailable`] if the generator fails
    ///   or exceeds the call timeout
    /// - [`ClassificationError::Interrupted`] if the budget is spent
    pub async fn analyze(
        &self,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<AnalysisReport, ClassificationError> {
        context.validate()?;
        let prompt = build_prompt(context);

        let text = match budget.run(self.limited(self.generator.analyze_error(&prompt))).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(
                    correlation_id = %context.correlation_id,
                    error = %e,
                    "Error analysis failed"
                );
                return Err(e.into());
            }
            Err(exceeded) => {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    reason = %exceeded,
                    "Error analysis interrupted"
                );
                return Err(exceeded.into());
            }
        };

        if text.trim().is_empty() {
            let err = GeneratorError::InvalidResponse("empty analysis".to_string());
            tracing::error!(correlation_id = %context.correlation_id, error = %err, "Error analysis failed");
            return Err(err.into());
        }

        Ok(AnalysisReport::parse(&text))
    }

    /// Apply the determination rules to an analysis
    #[must_use]
    pub fn classify_report(context: &ErrorContext, report: &AnalysisReport) -> ErrorClassification {
        ErrorClassification {
            category: determine_category(&report.root_cause),
            subcategory: determine_subcategory(&report.root_cause),
            severity: determine_severity(report.severity),
            error_type: context.error.error_type.clone(),
            confidence: report.confidence,
        }
    }

    /// Classify an incident
    ///
    /// # Errors
    /// See [`ErrorClassifier::analyze`].
    pub async fn classify(
        &self,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<ErrorClassification, ClassificationError> {
        let report = self.analyze(context, budget).await?;
        let classification = Self::classify_report(context, &report);
        tracing::debug!(
            correlation_id = %context.correlation_id,
            category = ?classification.category,
            subcategory = ?classification.subcategory,
            severity = ?classification.severity,
            "Classified error"
        );
        Ok(classification)
    }

    /// Confidence of the upstream analysis for `context`
    ///
    /// # Errors
    /// See [`ErrorClassifier::analyze`].
    pub async fn get_confidence_score(
        &self,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<f64, ClassificationError> {
        Ok(self.analyze(context, budget).await?.confidence)
    }

    /// Ask the generator for remediation text
    ///
    /// # Errors
    /// - [`ClassificationError::AnalysisUnavailable`] if the generator fails
    /// - [`ClassificationError::Interrupted`] if the budget is spent
    pub async fn suggest_remediation(
        &self,
        report: &AnalysisReport,
        budget: &ExecutionBudget,
    ) -> Result<String, ClassificationError> {
        match budget.run(self.limited(self.generator.generate_remediation(report))).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Remediation suggestion failed");
                Err(e.into())
            }
            Err(exceeded) => Err(exceeded.into()),
        }
    }

    /// Error probability of a component, clamped to `[0, 1]`
    ///
    /// Uses the explicit rate hint when present, otherwise
    /// `error_count / request_count`, otherwise `0`.
    #[must_use]
    pub fn calculate_error_probability(component: &ComponentObservation) -> f64 {
        let raw = match component.error_rate {
            Some(rate) => rate,
            None if component.request_count > 0 => {
                component.error_count as f64 / component.request_count as f64
            }
            None => 0.0,
        };
        if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, 1.0)
        }
    }
}

impl ProbabilityEstimator for ErrorClassifier {
    fn error_probability(&self, component: &ComponentObservation) -> f64 {
        Self::calculate_error_probability(component)
    }
}

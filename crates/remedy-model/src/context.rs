//! Per-incident error context
//!
//! The [`ErrorContext`] is created at ingestion and enriched in place by
//! classification and graph analysis. Once a plan is handed to the
//! executor it is only ever borrowed immutably.

use crate::classification::{ErrorCategory, ErrorClassification, ErrorSeverity, ErrorSubcategory};
use crate::error::RuntimeError;
use crate::execution::ExecutionStatus;
use crate::ids::{CorrelationId, ExecutionId, PlanId};
use crate::impact::ImpactAnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit of work flowing through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique per incident
    pub correlation_id: CorrelationId,
    /// Service the failure was observed in
    pub service_name: String,
    /// Operation being performed
    pub operation_name: String,
    /// The observed failure
    pub error: RuntimeError,
    /// Current severity estimate
    pub severity: ErrorSeverity,
    /// Arbitrary caller-supplied context
    pub additional_context: BTreeMap<String, serde_json::Value>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last enrichment time
    pub updated_at: DateTime<Utc>,
    /// Root-cause text from upstream analysis
    pub root_cause: Option<String>,
    /// Classification, once produced
    pub classification: Option<ErrorClassification>,
    /// Impact analysis, once produced
    pub impact: Option<ImpactAnalysisResult>,
    /// Reference to the remediation outcome, once produced
    pub outcome: Option<OutcomeRef>,
}

/// Back-reference from a context to its remediation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRef {
    /// Plan that was executed
    pub plan_id: PlanId,
    /// Execution record
    pub execution_id: ExecutionId,
    /// Final execution status
    pub status: ExecutionStatus,
}

/// Malformed context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Service name is blank
    #[error("error context has no service name")]
    MissingService,

    /// Error type is blank
    #[error("error context has no error type")]
    MissingErrorType,
}

impl ErrorContext {
    /// Create context for a newly observed failure
    #[must_use]
    pub fn new(service_name: impl Into<String>, operation_name: impl Into<String>, error: RuntimeError) -> Self {
        let now = Utc::now();
        Self {
            correlation_id: CorrelationId::new(),
            service_name: service_name.into(),
            operation_name: operation_name.into(),
            error,
            severity: ErrorSeverity::Unknown,
            additional_context: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            root_cause: None,
            classification: None,
            impact: None,
            outcome: None,
        }
    }

    /// Use a caller-supplied correlation id
    #[inline]
    #[must_use]
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set initial severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Add a context entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_context.insert(key.into(), value.into());
        self
    }

    /// Check that the context is well formed
    ///
    /// # Errors
    /// Returns [`ContextError`] when the service name or error type is blank.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.service_name.trim().is_empty() {
            return Err(ContextError::MissingService);
        }
        if self.error.error_type.trim().is_empty() {
            return Err(ContextError::MissingErrorType);
        }
        Ok(())
    }

    /// Component the failure originated in, falling back to the service
    #[must_use]
    pub fn component(&self) -> &str {
        self.error.component.as_deref().unwrap_or(&self.service_name)
    }

    /// Record classification and adopt its severity
    pub fn apply_classification(&mut self, classification: ErrorClassification) {
        self.severity = classification.severity;
        self.classification = Some(classification);
        self.touch();
    }

    /// Record root-cause text
    pub fn set_root_cause(&mut self, root_cause: impl Into<String>) {
        self.root_cause = Some(root_cause.into());
        self.touch();
    }

    /// Record impact analysis
    pub fn apply_impact(&mut self, impact: ImpactAnalysisResult) {
        self.impact = Some(impact);
        self.touch();
    }

    /// Record remediation outcome
    pub fn set_outcome(&mut self, outcome: OutcomeRef) {
        self.outcome = Some(outcome);
        self.touch();
    }

    /// Category from classification, `General` if unclassified
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.classification.as_ref().map(|c| c.category).unwrap_or_default()
    }

    /// Subcategory from classification, `Unknown` if unclassified
    #[must_use]
    pub fn subcategory(&self) -> ErrorSubcategory {
        self.classification.as_ref().map(|c| c.subcategory).unwrap_or_default()
    }

    /// Blast radius from impact analysis, 0 if not analysed
    #[must_use]
    pub fn blast_radius(&self) -> usize {
        self.impact.as_ref().map_or(0, |i| i.blast_radius)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

//! Remedy data model
//!
//! Plain data shared by every stage of the remediation pipeline.
//!
//! # Core Types
//!
//! - [`RuntimeError`]: immutable record of one observed failure
//! - [`ErrorContext`]: per-incident unit of work, enriched by each stage
//! - [`DependencyGraph`]: component graph built fresh for each analysis
//! - [`ImpactAnalysisResult`]: blast radius of a failing component
//! - [`ActionDescriptor`]: data half of a remediation action
//! - [`RemediationExecution`]: execution record of one plan run
//! - [`ValidationResult`]: outcome of a rule or whole-plan validation
//! - [`RemediationMetrics`]: per-remediation metrics and aggregates
//! - [`ExecutionBudget`]: cancellation token plus optional deadline

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod action;
pub mod budget;
pub mod classification;
pub mod context;
pub mod error;
pub mod execution;
pub mod graph;
pub mod ids;
pub mod impact;
pub mod metrics;
pub mod validation;

pub use action::{ActionDescriptor, ActionStatus, RemediationResult};
pub use budget::{BudgetExceeded, ExecutionBudget};
pub use classification::{ErrorCategory, ErrorClassification, ErrorSeverity, ErrorSubcategory};
pub use context::{ContextError, ErrorContext, OutcomeRef};
pub use error::RuntimeError;
pub use execution::{ActionExecution, ExecutionStatus, RemediationExecution, RollbackFailure, RollbackStatus};
pub use graph::{DependencyEdge, DependencyGraph, DependencyKind, DependencyNode, GraphMetadata, GraphModelError};
pub use ids::{ActionId, CorrelationId, ExecutionId, PlanId};
pub use impact::{ImpactAnalysisResult, ImpactLevel, ImpactScope, ImpactSeverity};
pub use metrics::{MetricPoint, RemediationMetrics, StepMetric, TimeRange};
pub use validation::{ValidationLevel, ValidationResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

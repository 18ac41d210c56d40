//! Error types for analysis

use remedy_model::{BudgetExceeded, ContextError, GraphModelError};

/// Failures of the external suggestion generator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// Service unreachable or erroring
    #[error("suggestion generator unavailable: {0}")]
    Unavailable(String),

    /// Service answered with something unusable
    #[error("suggestion generator returned unusable data: {0}")]
    InvalidResponse(String),
}

/// Classification failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    /// Context is malformed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContextError),

    /// Upstream analysis failed
    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(#[from] GeneratorError),

    /// Caller deadline or cancellation
    #[error("analysis interrupted: {0}")]
    Interrupted(#[from] BudgetExceeded),
}

impl ClassificationError {
    /// Check if the pipeline may continue with fallback defaults
    #[inline]
    #[must_use]
    pub fn allows_fallback(&self) -> bool {
        matches!(self, Self::AnalysisUnavailable(_))
    }
}

/// Graph construction and traversal failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Requested node is not in the graph
    #[error("node not found in graph: {0}")]
    NodeNotFound(String),

    /// Snapshot violates a graph invariant
    #[error("invalid graph: {0}")]
    Invalid(#[from] GraphModelError),
}

/// Pattern store backend failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternStoreError {
    /// Backend unreachable or erroring
    #[error("pattern store error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded
    #[error("pattern serialization error: {0}")]
    Serialization(String),
}

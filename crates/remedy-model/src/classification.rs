//! Error classification types

use serde::{Deserialize, Serialize};

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Minor, no user impact
    Low,
    /// Degraded behaviour
    Medium,
    /// Significant user impact
    High,
    /// Outage of a critical path
    Critical,
    /// Process cannot continue
    Fatal,
    /// Not yet determined
    #[default]
    Unknown,
}

impl ErrorSeverity {
    /// Bucket a severity score in `[0, 1]`
    ///
    /// Boundary values map to the higher bucket: `0.8` is `Critical`,
    /// `0.6` is `High`, `0.4` is `Medium`, `0.2` is `Low`. Anything lower,
    /// and NaN, is `Unknown`.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else if score >= 0.2 {
            Self::Low
        } else {
            Self::Unknown
        }
    }

    /// Numeric rank for ordering (`Unknown` ranks lowest)
    #[inline]
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
            Self::Fatal => 5,
        }
    }

    /// Check if this severity is at least `other`
    #[inline]
    #[must_use]
    pub fn is_at_least(&self, other: ErrorSeverity) -> bool {
        self.rank() >= other.rank()
    }
}

/// Broad failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Database access
    Database,
    /// Network transport
    Network,
    /// File system access
    FileSystem,
    /// Memory or other resource exhaustion
    Resource,
    /// Anything else
    #[default]
    General,
}

/// Finer failure kind within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSubcategory {
    /// Operation timed out
    Timeout,
    /// Access denied
    Permission,
    /// Connection could not be established or was lost
    Connection,
    /// Not determined
    #[default]
    Unknown,
}

/// Outcome of classifying an incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    /// Broad category
    pub category: ErrorCategory,
    /// Finer kind
    pub subcategory: ErrorSubcategory,
    /// Bucketed severity
    pub severity: ErrorSeverity,
    /// Type name of the classified failure
    pub error_type: String,
    /// Confidence of the upstream analysis in `[0, 1]`
    pub confidence: f64,
}

impl ErrorClassification {
    /// Classification used when upstream analysis is unavailable
    #[must_use]
    pub fn fallback(error_type: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::General,
            subcategory: ErrorSubcategory::Unknown,
            severity: ErrorSeverity::Unknown,
            error_type: error_type.into(),
            confidence: 0.0,
        }
    }
}

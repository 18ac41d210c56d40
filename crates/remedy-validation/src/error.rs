//! Error types for validation

use remedy_model::BudgetExceeded;

/// Failure inside a single rule
///
/// Never propagated: the registry turns it into a failed result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Rule could not reach a collaborator
    #[error("rule backend unavailable: {0}")]
    Unavailable(String),

    /// Rule hit an internal error
    #[error("rule failed: {0}")]
    Internal(String),
}

/// Registry-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Rule priority outside 1..=5
    #[error("rule '{rule}' has priority {priority}, expected 1..=5")]
    InvalidPriority {
        /// Rule name
        rule: String,
        /// Offending priority
        priority: u8,
    },

    /// Caller deadline elapsed mid-evaluation
    #[error("validation timed out")]
    TimedOut,

    /// Caller cancelled mid-evaluation
    #[error("validation cancelled")]
    Cancelled,
}

impl From<BudgetExceeded> for ValidationError {
    fn from(value: BudgetExceeded) -> Self {
        match value {
            BudgetExceeded::DeadlineElapsed => Self::TimedOut,
            BudgetExceeded::Cancelled => Self::Cancelled,
        }
    }
}

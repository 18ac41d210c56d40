//! Validation rule trait

use crate::error::RuleError;
use async_trait::async_trait;
use remedy_model::{ErrorContext, ValidationResult};
use remedy_strategy::RemediationPlan;
use std::time::Duration;

/// Lowest rule priority
pub const MIN_PRIORITY: u8 = 1;

/// Highest rule priority
pub const MAX_PRIORITY: u8 = 5;

/// Failing rules at or above this priority stop evaluation
pub const BLOCKING_PRIORITY: u8 = 4;

/// Named predicate over a plan and its incident
///
/// Rules that perform I/O must be cancel-safe: the registry may drop an
/// evaluation at any await point when the caller's budget is spent.
#[async_trait]
pub trait ValidationRule: Send + Sync + std::fmt::Debug {
    /// Unique rule name
    fn name(&self) -> &str;

    /// Priority in `1..=5`
    fn priority(&self) -> u8;

    /// Check if results may be cached per plan and incident
    fn is_cacheable(&self) -> bool {
        false
    }

    /// Lifetime of cached results
    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(300)
    }

    /// Evaluate the rule
    async fn evaluate(&self, plan: &RemediationPlan, context: &ErrorContext) -> Result<ValidationResult, RuleError>;
}

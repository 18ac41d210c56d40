//! Remediation strategy trait

use crate::action::RemediationAction;
use remedy_model::{ErrorContext, ImpactLevel};
use std::sync::Arc;
use std::time::Duration;

/// One remediation family
///
/// `applies_to` is a cheap, side-effect-free predicate. `create_actions`
/// returns actions in intended execution order with priorities set; an
/// empty list means the strategy applies but has nothing to do.
pub trait RemediationStrategy: Send + Sync + std::fmt::Debug {
    /// Stable strategy id
    fn id(&self) -> &str;

    /// Selection priority (higher wins)
    fn priority(&self) -> i32;

    /// Advisory success probability in `[0, 1]`, breaks priority ties
    fn success_probability(&self) -> f64;

    /// Check if the strategy can handle `context`
    fn applies_to(&self, context: &ErrorContext) -> bool;

    /// Materialize actions for `context`
    fn create_actions(&self, context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>>;

    /// Advisory impact of running the strategy
    fn impact(&self, _context: &ErrorContext) -> ImpactLevel {
        ImpactLevel::Low
    }

    /// Advisory risk in `[0, 1]`
    fn risk(&self, _context: &ErrorContext) -> f64 {
        0.0
    }

    /// Advisory duration of a set of actions
    fn estimated_duration(&self, actions: &[Arc<dyn RemediationAction>]) -> Duration {
        actions.iter().map(|a| a.descriptor().estimated_duration).sum()
    }
}

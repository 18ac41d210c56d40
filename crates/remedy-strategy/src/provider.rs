//! Strategy provider
//!
//! Selection is a pure function over the registered list: among the
//! strategies that apply, the highest priority wins, then the highest
//! success probability, then the earliest registration.

use crate::action::ActionEffector;
use crate::builtin::{CircuitBreakStrategy, ConfigPatchStrategy, ConnectionResetStrategy, RestartStrategy};
use crate::error::StrategyError;
use crate::plan::RemediationPlan;
use crate::strategy::RemediationStrategy;
use parking_lot::RwLock;
use remedy_model::ErrorContext;
use std::cmp::Ordering;
use std::sync::Arc;

/// Registered strategies in registration order
#[derive(Debug, Default)]
pub struct StrategyProvider {
    strategies: RwLock<Vec<Arc<dyn RemediationStrategy>>>,
}

impl StrategyProvider {
    /// Create empty provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create provider with the built-in strategies
    #[must_use]
    pub fn with_builtin(effector: Arc<dyn ActionEffector>) -> Self {
        let provider = Self::new();
        provider.register(Arc::new(RestartStrategy::new(Arc::clone(&effector))));
        provider.register(Arc::new(ConnectionResetStrategy::new(Arc::clone(&effector))));
        provider.register(Arc::new(ConfigPatchStrategy::new(Arc::clone(&effector))));
        provider.register(Arc::new(CircuitBreakStrategy::new(effector)));
        provider
    }

    /// Register a strategy
    ///
    /// A strategy with the same id is replaced in place, keeping its
    /// registration position.
    pub fn register(&self, strategy: Arc<dyn RemediationStrategy>) {
        let mut strategies = self.strategies.write();
        match strategies.iter().position(|s| s.id() == strategy.id()) {
            Some(pos) => strategies[pos] = strategy,
            None => strategies.push(strategy),
        }
    }

    /// Remove a strategy by id
    pub fn unregister(&self, id: &str) -> bool {
        let mut strategies = self.strategies.write();
        let before = strategies.len();
        strategies.retain(|s| s.id() != id);
        strategies.len() != before
    }

    /// Registered ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.strategies.read().iter().map(|s| s.id().to_string()).collect()
    }

    /// Number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    /// Check if no strategy is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }

    /// Pick the best applicable strategy
    #[must_use]
    pub fn select(&self, context: &ErrorContext) -> Option<Arc<dyn RemediationStrategy>> {
        let strategies = self.strategies.read();
        let mut best: Option<&Arc<dyn RemediationStrategy>> = None;
        for candidate in strategies.iter().filter(|s| s.applies_to(context)) {
            best = match best {
                Some(current) if rank(candidate, current) != Ordering::Greater => Some(current),
                _ => Some(candidate),
            };
        }
        best.cloned()
    }

    /// Select a strategy and materialize its plan
    ///
    /// # Errors
    /// - [`StrategyError::InvalidInput`] for malformed contexts
    /// - [`StrategyError::NoApplicableStrategy`] if nothing applies
    pub fn create_plan(&self, context: &ErrorContext) -> Result<RemediationPlan, StrategyError> {
        context.validate()?;
        let strategy = self
            .select(context)
            .ok_or(StrategyError::NoApplicableStrategy(context.correlation_id))?;

        let actions = strategy.create_actions(context);
        let estimated = strategy.estimated_duration(&actions);
        let plan = RemediationPlan::new(strategy.id(), context.correlation_id, actions)
            .with_risk(strategy.risk(context))
            .with_impact(strategy.impact(context))
            .with_estimated_duration(estimated);

        tracing::info!(
            correlation_id = %context.correlation_id,
            plan_id = %plan.id,
            strategy = strategy.id(),
            actions = plan.len(),
            "Created remediation plan"
        );
        Ok(plan)
    }
}

fn rank(a: &Arc<dyn RemediationStrategy>, b: &Arc<dyn RemediationStrategy>) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| a.success_probability().total_cmp(&b.success_probability()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{DryRunEffector, RemediationAction};
    use remedy_model::{ErrorCategory, ErrorClassification, ErrorSeverity, ErrorSubcategory, RuntimeError};

    #[derive(Debug)]
    struct Fixed {
        id: &'static str,
        priority: i32,
        probability: f64,
        applies: bool,
    }

    impl RemediationStrategy for Fixed {
        fn id(&self) -> &str {
            self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn success_probability(&self) -> f64 {
            self.probability
        }
        fn applies_to(&self, _context: &ErrorContext) -> bool {
            self.applies
        }
        fn create_actions(&self, _context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>> {
            Vec::new()
        }
    }

    fn fixed(id: &'static str, priority: i32, probability: f64, applies: bool) -> Arc<dyn RemediationStrategy> {
        Arc::new(Fixed {
            id,
            priority,
            probability,
            applies,
        })
    }

    fn context() -> ErrorContext {
        ErrorContext::new("orders", "checkout", RuntimeError::new("Boom", "boom"))
    }

    #[test]
    fn highest_priority_wins() {
        let p = StrategyProvider::new();
        p.register(fixed("low", 1, 0.99, true));
        p.register(fixed("high", 5, 0.1, true));
        p.register(fixed("inapplicable", 9, 1.0, false));
        assert_eq!(p.select(&context()).unwrap().id(), "high");
    }

    #[test]
    fn ties_break_on_probability_then_registration() {
        let p = StrategyProvider::new();
        p.register(fixed("first", 5, 0.5, true));
        p.register(fixed("second", 5, 0.5, true));
        p.register(fixed("likely", 5, 0.4, true));
        assert_eq!(p.select(&context()).unwrap().id(), "first");

        p.register(fixed("likelier", 5, 0.6, true));
        assert_eq!(p.select(&context()).unwrap().id(), "likelier");
    }

    #[test]
    fn reregistration_keeps_position() {
        let p = StrategyProvider::new();
        p.register(fixed("a", 5, 0.5, true));
        p.register(fixed("b", 5, 0.5, true));
        p.register(fixed("a", 5, 0.5, true));
        assert_eq!(p.ids(), vec!["a", "b"]);

        assert!(p.unregister("a"));
        assert!(!p.unregister("a"));
        assert_eq!(p.select(&context()).unwrap().id(), "b");
    }

    #[test]
    fn no_applicable_strategy() {
        let p = StrategyProvider::new();
        p.register(fixed("never", 1, 1.0, false));
        let ctx = context();
        assert_eq!(
            p.create_plan(&ctx).unwrap_err(),
            StrategyError::NoApplicableStrategy(ctx.correlation_id)
        );
    }

    #[test]
    fn malformed_context_is_rejected() {
        let p = StrategyProvider::new();
        p.register(fixed("always", 1, 1.0, true));
        let mut ctx = context();
        ctx.error.error_type = " ".to_string();
        assert!(matches!(p.create_plan(&ctx), Err(StrategyError::InvalidInput(_))));
    }

    #[test]
    fn builtin_plan_for_database_timeout() {
        let p = StrategyProvider::with_builtin(Arc::new(DryRunEffector::new()));
        let mut ctx = context();
        ctx.apply_classification(ErrorClassification {
            category: ErrorCategory::Database,
            subcategory: ErrorSubcategory::Timeout,
            severity: ErrorSeverity::High,
            error_type: "Boom".to_string(),
            confidence: 0.8,
        });

        let plan = p.create_plan(&ctx).unwrap();
        assert_eq!(plan.strategy_id, ConnectionResetStrategy::ID);
        assert_eq!(plan.context_id, ctx.correlation_id);
        assert_eq!(plan.len(), 3);
        assert!((plan.risk - 0.3).abs() < f64::EPSILON);
    }
}

//! Remediation plans

use crate::action::RemediationAction;
use chrono::{DateTime, Utc};
use remedy_model::{ActionDescriptor, CorrelationId, ImpactLevel, PlanId};
use std::sync::Arc;
use std::time::Duration;

/// Ordered actions for one incident
///
/// Never mutated by execution; the executor only writes its own
/// execution record.
#[derive(Debug, Clone)]
pub struct RemediationPlan {
    /// Plan id
    pub id: PlanId,
    /// Strategy that produced the plan
    pub strategy_id: String,
    /// Incident the plan targets
    pub context_id: CorrelationId,
    /// Advisory duration
    pub estimated_duration: Duration,
    /// Advisory risk in `[0, 1]`
    pub risk: f64,
    /// Advisory impact
    pub impact: ImpactLevel,
    /// Actions in creation order
    pub actions: Vec<Arc<dyn RemediationAction>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl RemediationPlan {
    /// Create plan; duration defaults to the sum of action estimates
    #[must_use]
    pub fn new(
        strategy_id: impl Into<String>,
        context_id: CorrelationId,
        actions: Vec<Arc<dyn RemediationAction>>,
    ) -> Self {
        let estimated_duration = actions.iter().map(|a| a.descriptor().estimated_duration).sum();
        Self {
            id: PlanId::new(),
            strategy_id: strategy_id.into(),
            context_id,
            estimated_duration,
            risk: 0.0,
            impact: ImpactLevel::None,
            actions,
            created_at: Utc::now(),
        }
    }

    /// Set risk
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = risk;
        self
    }

    /// Set impact
    #[inline]
    #[must_use]
    pub fn with_impact(mut self, impact: ImpactLevel) -> Self {
        self.impact = impact;
        self
    }

    /// Set duration estimate
    #[inline]
    #[must_use]
    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    /// Actions in execution order: ascending priority, ties by list order
    #[must_use]
    pub fn ordered_actions(&self) -> Vec<Arc<dyn RemediationAction>> {
        let mut ordered = self.actions.clone();
        ordered.sort_by_key(|a| a.descriptor().priority);
        ordered
    }

    /// Descriptors in creation order
    pub fn descriptors(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter().map(|a| a.descriptor())
    }

    /// Number of actions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if plan has no actions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{DryRunEffector, EffectorAction};

    fn action(kind: &str, priority: i32, secs: u64) -> Arc<dyn RemediationAction> {
        EffectorAction::new(
            ActionDescriptor::new(kind, kind, priority).with_estimated_duration(Duration::from_secs(secs)),
            Arc::new(DryRunEffector::new()),
        )
        .shared()
    }

    #[test]
    fn ordering_is_stable_by_priority() {
        let plan = RemediationPlan::new(
            "test",
            CorrelationId::new(),
            vec![action("c", 2, 1), action("a", 1, 1), action("d", 2, 1), action("b", 1, 1)],
        );

        let order: Vec<_> = plan
            .ordered_actions()
            .iter()
            .map(|a| a.descriptor().action_type.clone())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);

        let creation: Vec<_> = plan.descriptors().map(|d| d.action_type.as_str()).collect();
        assert_eq!(creation, vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn duration_defaults_to_sum() {
        let plan = RemediationPlan::new("test", CorrelationId::new(), vec![action("a", 1, 2), action("b", 2, 3)]);
        assert_eq!(plan.estimated_duration, Duration::from_secs(5));
        assert_eq!(plan.len(), 2);
    }
}

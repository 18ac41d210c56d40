//! Built-in remediation families
//!
//! | Strategy | Priority | Success | Applies to |
//! |----------|----------|---------|------------|
//! | `circuit-break` | 30 | 0.9 | blast radius > 1, or Critical+ severity |
//! | `connection-reset` | 20 | 0.8 | Network/Database with Connection/Timeout |
//! | `config-patch` | 15 | 0.6 | Permission subcategory, or FileSystem |
//! | `restart` | 10 | 0.7 | Resource/General with High+ severity |

use crate::action::{ActionEffector, EffectorAction, RemediationAction};
use crate::strategy::RemediationStrategy;
use remedy_model::{ActionDescriptor, ErrorCategory, ErrorContext, ErrorSeverity, ErrorSubcategory, ImpactLevel};
use std::sync::Arc;
use std::time::Duration;

fn effect(descriptor: ActionDescriptor, effector: &Arc<dyn ActionEffector>) -> Arc<dyn RemediationAction> {
    EffectorAction::new(descriptor, Arc::clone(effector)).shared()
}

/// Drain, restart and verify the failing service
#[derive(Debug, Clone)]
pub struct RestartStrategy {
    effector: Arc<dyn ActionEffector>,
}

impl RestartStrategy {
    /// Strategy id
    pub const ID: &'static str = "restart";

    /// Create strategy
    #[must_use]
    pub fn new(effector: Arc<dyn ActionEffector>) -> Self {
        Self { effector }
    }
}

impl RemediationStrategy for RestartStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn priority(&self) -> i32 {
        10
    }

    fn success_probability(&self) -> f64 {
        0.7
    }

    fn applies_to(&self, context: &ErrorContext) -> bool {
        matches!(context.category(), ErrorCategory::Resource | ErrorCategory::General)
            && context.severity.is_at_least(ErrorSeverity::High)
    }

    fn create_actions(&self, context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>> {
        let service = context.service_name.as_str();
        vec![
            effect(
                ActionDescriptor::new("drain-traffic", format!("Drain traffic from {service}"), 1)
                    .with_parameter("service", service)
                    .requires("service")
                    .with_rollback(
                        ActionDescriptor::new("restore-traffic", format!("Restore traffic to {service}"), 1)
                            .with_parameter("service", service),
                    ),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("restart-service", format!("Restart {service}"), 2)
                    .with_parameter("service", service)
                    .requires("service")
                    .with_estimated_duration(Duration::from_secs(30)),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("verify-health", format!("Verify {service} health"), 3)
                    .with_parameter("service", service)
                    .reversible()
                    .with_estimated_duration(Duration::from_secs(5)),
                &self.effector,
            ),
        ]
    }

    fn impact(&self, _context: &ErrorContext) -> ImpactLevel {
        ImpactLevel::High
    }

    fn risk(&self, _context: &ErrorContext) -> f64 {
        0.6
    }
}

/// Drain and re-establish connections to the failing component
#[derive(Debug, Clone)]
pub struct ConnectionResetStrategy {
    effector: Arc<dyn ActionEffector>,
}

impl ConnectionResetStrategy {
    /// Strategy id
    pub const ID: &'static str = "connection-reset";

    /// Create strategy
    #[must_use]
    pub fn new(effector: Arc<dyn ActionEffector>) -> Self {
        Self { effector }
    }
}

impl RemediationStrategy for ConnectionResetStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn priority(&self) -> i32 {
        20
    }

    fn success_probability(&self) -> f64 {
        0.8
    }

    fn applies_to(&self, context: &ErrorContext) -> bool {
        matches!(context.category(), ErrorCategory::Network | ErrorCategory::Database)
            && matches!(
                context.subcategory(),
                ErrorSubcategory::Connection | ErrorSubcategory::Timeout
            )
    }

    fn create_actions(&self, context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>> {
        let component = context.component();
        vec![
            effect(
                ActionDescriptor::new("drain-connection-pool", format!("Drain connection pool for {component}"), 1)
                    .with_parameter("component", component)
                    .requires("component")
                    .with_rollback(
                        ActionDescriptor::new(
                            "restore-connection-pool",
                            format!("Restore connection pool for {component}"),
                            1,
                        )
                        .with_parameter("component", component),
                    ),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("reset-connections", format!("Reset connections to {component}"), 2)
                    .with_parameter("component", component)
                    .requires("component")
                    .reversible()
                    .with_estimated_duration(Duration::from_secs(5)),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("verify-connectivity", format!("Verify connectivity to {component}"), 3)
                    .with_parameter("component", component)
                    .reversible(),
                &self.effector,
            ),
        ]
    }

    fn risk(&self, _context: &ErrorContext) -> f64 {
        0.3
    }
}

/// Snapshot, patch and reload configuration
#[derive(Debug, Clone)]
pub struct ConfigPatchStrategy {
    effector: Arc<dyn ActionEffector>,
}

impl ConfigPatchStrategy {
    /// Strategy id
    pub const ID: &'static str = "config-patch";

    /// Create strategy
    #[must_use]
    pub fn new(effector: Arc<dyn ActionEffector>) -> Self {
        Self { effector }
    }
}

impl RemediationStrategy for ConfigPatchStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn priority(&self) -> i32 {
        15
    }

    fn success_probability(&self) -> f64 {
        0.6
    }

    fn applies_to(&self, context: &ErrorContext) -> bool {
        context.subcategory() == ErrorSubcategory::Permission || context.category() == ErrorCategory::FileSystem
    }

    fn create_actions(&self, context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>> {
        let service = context.service_name.as_str();
        vec![
            effect(
                ActionDescriptor::new("snapshot-config", format!("Snapshot {service} configuration"), 1)
                    .with_parameter("service", service)
                    .reversible(),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("apply-config-patch", format!("Patch {service} configuration"), 2)
                    .with_parameter("service", service)
                    .with_parameter("error_type", context.error.error_type.as_str())
                    .requires("service")
                    .with_rollback(
                        ActionDescriptor::new(
                            "restore-config-snapshot",
                            format!("Restore {service} configuration snapshot"),
                            2,
                        )
                        .with_parameter("service", service),
                    )
                    .with_partial_effect_rollback(),
                &self.effector,
            ),
            effect(
                ActionDescriptor::new("reload-config", format!("Reload {service} configuration"), 3)
                    .with_parameter("service", service)
                    .reversible()
                    .with_estimated_duration(Duration::from_secs(3)),
                &self.effector,
            ),
        ]
    }

    fn impact(&self, _context: &ErrorContext) -> ImpactLevel {
        ImpactLevel::Medium
    }

    fn risk(&self, _context: &ErrorContext) -> f64 {
        0.5
    }
}

/// Isolate a failing component from its dependents
#[derive(Debug, Clone)]
pub struct CircuitBreakStrategy {
    effector: Arc<dyn ActionEffector>,
    cool_down: Duration,
}

impl CircuitBreakStrategy {
    /// Strategy id
    pub const ID: &'static str = "circuit-break";

    /// Create strategy with a 30s cool-down
    #[must_use]
    pub fn new(effector: Arc<dyn ActionEffector>) -> Self {
        Self {
            effector,
            cool_down: Duration::from_secs(30),
        }
    }

    /// Set how long the circuit stays open
    #[inline]
    #[must_use]
    pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
        self.cool_down = cool_down;
        self
    }
}

impl RemediationStrategy for CircuitBreakStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn priority(&self) -> i32 {
        30
    }

    fn success_probability(&self) -> f64 {
        0.9
    }

    fn applies_to(&self, context: &ErrorContext) -> bool {
        context.blast_radius() > 1 || context.severity.is_at_least(ErrorSeverity::Critical)
    }

    fn create_actions(&self, context: &ErrorContext) -> Vec<Arc<dyn RemediationAction>> {
        let component = context.component();
        let affected = context
            .impact
            .as_ref()
            .map(|i| i.affected_nodes.clone())
            .unwrap_or_default();
        vec![effect(
            ActionDescriptor::new("open-circuit", format!("Open circuit around {component}"), 1)
                .with_parameter("component", component)
                .with_parameter("cool_down_secs", self.cool_down.as_secs())
                .with_parameter("affected", affected)
                .requires("component")
                .with_rollback(
                    ActionDescriptor::new("close-circuit", format!("Close circuit around {component}"), 1)
                        .with_parameter("component", component),
                ),
            &self.effector,
        )]
    }

    fn risk(&self, _context: &ErrorContext) -> f64 {
        0.2
    }

    fn estimated_duration(&self, _actions: &[Arc<dyn RemediationAction>]) -> Duration {
        self.cool_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DryRunEffector;
    use remedy_model::{ErrorClassification, ImpactAnalysisResult, ImpactScope, ImpactSeverity, RuntimeError};

    fn effector() -> Arc<dyn ActionEffector> {
        Arc::new(DryRunEffector::new())
    }

    fn classified(category: ErrorCategory, subcategory: ErrorSubcategory, severity: ErrorSeverity) -> ErrorContext {
        let mut ctx = ErrorContext::new("orders", "checkout", RuntimeError::new("Boom", "boom"));
        ctx.apply_classification(ErrorClassification {
            category,
            subcategory,
            severity,
            error_type: "Boom".to_string(),
            confidence: 0.9,
        });
        ctx
    }

    #[test]
    fn connection_reset_matches_database_timeout() {
        let s = ConnectionResetStrategy::new(effector());
        assert!(s.applies_to(&classified(ErrorCategory::Database, ErrorSubcategory::Timeout, ErrorSeverity::High)));
        assert!(s.applies_to(&classified(ErrorCategory::Network, ErrorSubcategory::Connection, ErrorSeverity::Low)));
        assert!(!s.applies_to(&classified(ErrorCategory::Database, ErrorSubcategory::Permission, ErrorSeverity::High)));
    }

    #[test]
    fn restart_needs_high_severity() {
        let s = RestartStrategy::new(effector());
        assert!(s.applies_to(&classified(ErrorCategory::Resource, ErrorSubcategory::Unknown, ErrorSeverity::High)));
        assert!(!s.applies_to(&classified(ErrorCategory::Resource, ErrorSubcategory::Unknown, ErrorSeverity::Medium)));
        assert!(!s.applies_to(&classified(ErrorCategory::General, ErrorSubcategory::Unknown, ErrorSeverity::Unknown)));
    }

    #[test]
    fn config_patch_matches_permission_or_filesystem() {
        let s = ConfigPatchStrategy::new(effector());
        assert!(s.applies_to(&classified(ErrorCategory::General, ErrorSubcategory::Permission, ErrorSeverity::Low)));
        assert!(s.applies_to(&classified(ErrorCategory::FileSystem, ErrorSubcategory::Unknown, ErrorSeverity::Low)));
        assert!(!s.applies_to(&classified(ErrorCategory::Network, ErrorSubcategory::Timeout, ErrorSeverity::Low)));
    }

    #[test]
    fn circuit_break_matches_wide_impact() {
        let s = CircuitBreakStrategy::new(effector());
        let mut ctx = classified(ErrorCategory::Network, ErrorSubcategory::Timeout, ErrorSeverity::Medium);
        assert!(!s.applies_to(&ctx));

        ctx.apply_impact(ImpactAnalysisResult {
            error_node_id: "orders".to_string(),
            affected_nodes: vec!["orders".to_string(), "billing".to_string()],
            severity: ImpactSeverity::Medium,
            scope: ImpactScope::Global,
            confidence: 1.0,
            spread: 1.0,
            blast_radius: 2,
        });
        assert!(s.applies_to(&ctx));

        let actions = s.create_actions(&ctx);
        assert_eq!(actions.len(), 1);
        let open = actions[0].descriptor();
        assert!(open.can_rollback);
        assert_eq!(open.parameters["affected"], serde_json::json!(["orders", "billing"]));
    }

    #[test]
    fn emitted_actions_satisfy_their_own_requirements() {
        let ctx = classified(ErrorCategory::Database, ErrorSubcategory::Timeout, ErrorSeverity::Critical);
        let strategies: Vec<Box<dyn RemediationStrategy>> = vec![
            Box::new(RestartStrategy::new(effector())),
            Box::new(ConnectionResetStrategy::new(effector())),
            Box::new(ConfigPatchStrategy::new(effector())),
            Box::new(CircuitBreakStrategy::new(effector())),
        ];
        for s in strategies {
            for action in s.create_actions(&ctx) {
                assert!(action.descriptor().missing_parameters().is_empty(), "{}", s.id());
            }
        }
    }
}

//! Remediation pipeline
//!
//! [`RemediationEngine`] wires the stages together: classify the error,
//! analyse its blast radius, pick a strategy, validate and execute the
//! plan, then record metrics. Each stage is also exposed on its own.

use crate::config::EngineConfig;
use crate::error::EngineError;
use remedy_analysis::{
    pattern_signature, ClassificationError, ErrorClassifier, GraphAnalyzer, InMemoryPatternStore, PatternStore,
    RuntimeSnapshot, SuggestionGenerator,
};
use remedy_executor::RemediationExecutor;
use remedy_metrics::MetricsCollector;
use remedy_model::{
    ActionDescriptor, ActionId, DependencyGraph, ErrorClassification, ErrorContext, ErrorSeverity, ExecutionBudget,
    ImpactAnalysisResult, ImpactLevel, OutcomeRef, RemediationExecution, RemediationMetrics, RollbackStatus,
    TimeRange, ValidationResult,
};
use remedy_strategy::{ActionEffector, RemediationPlan, RemediationStrategy, StrategyProvider};
use remedy_validation::{rules, ValidationRegistry};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything the pipeline learned and did for one incident
#[derive(Debug, Clone, Serialize)]
pub struct IncidentOutcome {
    /// Context after enrichment
    pub context: ErrorContext,
    /// Classification (fallback defaults if analysis failed)
    pub classification: ErrorClassification,
    /// Why upstream analysis failed, if it did
    pub analysis_error: Option<String>,
    /// Blast radius of the failing component, if a snapshot was given
    pub impact: Option<ImpactAnalysisResult>,
    /// Why impact analysis failed, if it did
    pub impact_error: Option<String>,
    /// Strategy chosen, if any applied
    pub strategy_id: Option<String>,
    /// Planned actions in execution order
    pub actions: Vec<ActionDescriptor>,
    /// Execution record, if a plan ran
    pub execution: Option<RemediationExecution>,
    /// Metrics recorded for the execution
    pub metrics: Option<RemediationMetrics>,
}

impl IncidentOutcome {
    /// Check if a plan ran to completion
    #[must_use]
    pub fn is_remediated(&self) -> bool {
        self.execution.as_ref().is_some_and(|e| e.status.is_success())
    }

    /// Typed failure of the execution, if it did not complete
    #[must_use]
    pub fn error(&self) -> Option<EngineError> {
        self.execution.as_ref().and_then(EngineError::from_execution)
    }
}

/// End-to-end remediation pipeline
#[derive(Debug)]
pub struct RemediationEngine {
    config: EngineConfig,
    classifier: ErrorClassifier,
    graph: GraphAnalyzer,
    strategies: Arc<StrategyProvider>,
    executor: RemediationExecutor,
    metrics: Arc<MetricsCollector>,
    patterns: Arc<dyn PatternStore>,
}

impl RemediationEngine {
    /// Create engine with the built-in strategies and validation rules
    ///
    /// # Errors
    /// [`EngineError::Config`] if `config` is out of range.
    pub fn new(
        config: EngineConfig,
        generator: Arc<dyn SuggestionGenerator>,
        effector: Arc<dyn ActionEffector>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let registry = ValidationRegistry::new(config.validation_cache_capacity);
        for rule in rules::builtin(config.max_plan_risk, config.max_plan_duration()) {
            registry.register(rule)?;
        }

        Ok(Self {
            classifier: ErrorClassifier::new(generator).with_call_timeout(config.analysis_timeout()),
            graph: GraphAnalyzer::default(),
            strategies: Arc::new(StrategyProvider::with_builtin(effector)),
            executor: RemediationExecutor::new(Arc::new(registry)).with_history_limit(config.execution_history_limit),
            metrics: Arc::new(MetricsCollector::new()),
            patterns: Arc::new(InMemoryPatternStore::new()),
            config,
        })
    }

    /// Use a different pattern store
    #[inline]
    #[must_use]
    pub fn with_pattern_store(mut self, store: Arc<dyn PatternStore>) -> Self {
        self.patterns = store;
        self
    }

    /// Use a different graph analyzer
    #[inline]
    #[must_use]
    pub fn with_graph_analyzer(mut self, analyzer: GraphAnalyzer) -> Self {
        self.graph = analyzer;
        self
    }

    /// Share a metrics collector with other components
    #[inline]
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Strategy registry, for registering custom strategies
    #[inline]
    #[must_use]
    pub fn strategies(&self) -> &Arc<StrategyProvider> {
        &self.strategies
    }

    /// Validation registry, for registering custom rules
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &Arc<ValidationRegistry> {
        self.executor.validator()
    }

    /// Executor, for execution history and ledger queries
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &RemediationExecutor {
        &self.executor
    }

    /// Metrics collector
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Classify an incident and record the result on `context`
    ///
    /// When the suggestion generator fails the failure is logged and the
    /// fallback classification is applied instead.
    ///
    /// # Errors
    /// - [`EngineError::InvalidInput`] for malformed contexts
    /// - [`EngineError::Timeout`] or [`EngineError::Cancelled`] if the budget is spent
    pub async fn classify_error(
        &self,
        context: &mut ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<ErrorClassification, EngineError> {
        self.classify_with_fallback(context, budget)
            .await
            .map(|(classification, _)| classification)
    }

    async fn classify_with_fallback(
        &self,
        context: &mut ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<(ErrorClassification, Option<ClassificationError>), EngineError> {
        match self.classifier.analyze(context, budget).await {
            Ok(report) => {
                let classification = ErrorClassifier::classify_report(context, &report);
                context.set_root_cause(report.root_cause.clone());
                context.apply_classification(classification.clone());
                self.remember_pattern(context, &classification).await;
                Ok((classification, None))
            }
            Err(e) if e.allows_fallback() => {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    error = %e,
                    "Using fallback classification"
                );
                let classification = ErrorClassification::fallback(context.error.error_type.clone());
                context.apply_classification(classification.clone());
                Ok((classification, Some(e)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Build a dependency graph from a runtime snapshot
    ///
    /// # Errors
    /// [`EngineError::Graph`] if the snapshot references unknown nodes.
    pub fn build_dependency_graph(&self, snapshot: &RuntimeSnapshot) -> Result<DependencyGraph, EngineError> {
        Ok(self.graph.build_dependency_graph(snapshot)?)
    }

    /// Blast radius of a failing node
    ///
    /// # Errors
    /// [`EngineError::Graph`] if `node_id` is not in `graph`.
    pub fn analyze_impact(&self, graph: &DependencyGraph, node_id: &str) -> Result<ImpactAnalysisResult, EngineError> {
        Ok(self.graph.analyze_impact(graph, node_id)?)
    }

    /// Best strategy for `context`, if any applies
    #[must_use]
    pub fn select_strategy(&self, context: &ErrorContext) -> Option<Arc<dyn RemediationStrategy>> {
        self.strategies.select(context)
    }

    /// Materialise a plan for `context`
    ///
    /// # Errors
    /// - [`EngineError::InvalidInput`] for malformed contexts
    /// - [`EngineError::NoApplicableStrategy`] if no strategy applies
    pub fn create_plan(&self, context: &ErrorContext) -> Result<RemediationPlan, EngineError> {
        Ok(self.strategies.create_plan(context)?)
    }

    /// Validate a plan without running it
    ///
    /// # Errors
    /// [`EngineError::Timeout`] or [`EngineError::Cancelled`] if the budget
    /// is spent before every rule ran.
    pub async fn validate_plan(
        &self,
        plan: &RemediationPlan,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<ValidationResult, EngineError> {
        context.validate()?;
        let budget = budget.narrowed(self.config.validation_timeout());
        let report = self.validator().validate(plan, context, &budget).await?;
        Ok(report.outcome)
    }

    /// Run a plan and record its metrics
    ///
    /// Action failures end up in the returned record, not as errors; see
    /// [`EngineError::from_execution`].
    ///
    /// # Errors
    /// - [`EngineError::InvalidInput`] for malformed contexts or a plan
    ///   targeting another incident
    /// - [`EngineError::Execution`] if the incident is already executing
    pub async fn execute_plan(
        &self,
        plan: &RemediationPlan,
        context: &mut ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<RemediationExecution, EngineError> {
        let budget = budget.narrowed(self.config.execution_timeout());
        let mut execution = self.executor.execute(plan, context, &budget).await?;

        let (impact, severity) = impact_levels(plan, context);
        let summary = self.metrics.record_execution(&execution, impact, severity);
        execution.metrics = Some(summary);

        context.set_outcome(OutcomeRef {
            plan_id: plan.id,
            execution_id: execution.id,
            status: execution.status,
        });

        match EngineError::from_execution(&execution) {
            Some(failure) => tracing::warn!(
                correlation_id = %context.correlation_id,
                execution_id = %execution.id,
                error = %failure,
                "Remediation did not complete"
            ),
            None => tracing::info!(
                correlation_id = %context.correlation_id,
                execution_id = %execution.id,
                "Remediation completed"
            ),
        }
        Ok(execution)
    }

    /// Undo one completed action
    ///
    /// # Errors
    /// [`EngineError::Execution`] if the action is not a completed action
    /// of this incident.
    pub async fn rollback_action(
        &self,
        action_id: ActionId,
        context: &ErrorContext,
    ) -> Result<RollbackStatus, EngineError> {
        Ok(self.executor.rollback_action(action_id, context).await?)
    }

    /// Metrics of one remediation, keyed by execution id
    #[must_use]
    pub fn get_metrics(&self, remediation_id: &str) -> Option<RemediationMetrics> {
        self.metrics.get_metrics(remediation_id)
    }

    /// Metrics folded over every remediation recorded in `range`
    #[must_use]
    pub fn get_aggregated_metrics(&self, range: TimeRange) -> RemediationMetrics {
        self.metrics.get_aggregated_metrics(range)
    }

    /// Stored pattern for a classified incident
    ///
    /// Unclassified contexts and store failures yield `None`.
    pub async fn known_pattern(&self, context: &ErrorContext) -> Option<Value> {
        let classification = context.classification.as_ref()?;
        let key = pattern_signature(context, classification);
        match self.patterns.get_pattern(&key).await {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(pattern = %key, error = %e, "Pattern lookup failed");
                None
            }
        }
    }

    /// Run the whole pipeline for one incident
    ///
    /// Analysis failures fall back to default classification and graph
    /// failures skip impact analysis; both are reported in the outcome.
    /// An incident no strategy applies to yields an outcome without a plan.
    ///
    /// # Errors
    /// - [`EngineError::InvalidInput`] for malformed contexts
    /// - [`EngineError::Timeout`] or [`EngineError::Cancelled`] if the
    ///   budget is spent during analysis
    /// - [`EngineError::Execution`] if the incident is already executing
    pub async fn handle_incident(
        &self,
        mut context: ErrorContext,
        snapshot: Option<&RuntimeSnapshot>,
        budget: &ExecutionBudget,
    ) -> Result<IncidentOutcome, EngineError> {
        context.validate()?;
        tracing::info!(
            correlation_id = %context.correlation_id,
            service = %context.service_name,
            error_type = %context.error.error_type,
            "Handling incident"
        );

        let (classification, analysis_error) = self.classify_with_fallback(&mut context, budget).await?;

        let (impact, impact_error) = match snapshot {
            Some(snapshot) => match self.impact_for(&context, snapshot) {
                Ok(impact) => {
                    context.apply_impact(impact.clone());
                    (Some(impact), None)
                }
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %context.correlation_id,
                        error = %e,
                        "Skipping impact analysis"
                    );
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        let mut outcome = IncidentOutcome {
            context: context.clone(),
            classification,
            analysis_error: analysis_error.map(|e| e.to_string()),
            impact,
            impact_error,
            strategy_id: None,
            actions: Vec::new(),
            execution: None,
            metrics: None,
        };

        let plan = match self.create_plan(&context) {
            Ok(plan) => plan,
            Err(EngineError::NoApplicableStrategy(_)) => {
                tracing::info!(correlation_id = %context.correlation_id, "No applicable strategy");
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };
        outcome.strategy_id = Some(plan.strategy_id.clone());
        outcome.actions = plan.ordered_actions().iter().map(|a| a.descriptor().clone()).collect();

        let execution = self.execute_plan(&plan, &mut context, budget).await?;
        outcome.metrics = execution.metrics.clone();
        outcome.execution = Some(execution);
        outcome.context = context;
        Ok(outcome)
    }

    fn impact_for(&self, context: &ErrorContext, snapshot: &RuntimeSnapshot) -> Result<ImpactAnalysisResult, EngineError> {
        let graph = self.build_dependency_graph(snapshot)?;
        self.analyze_impact(&graph, context.component())
    }

    async fn remember_pattern(&self, context: &ErrorContext, classification: &ErrorClassification) {
        let key = pattern_signature(context, classification);
        let pattern = match serde_json::to_value(classification) {
            Ok(value) => serde_json::json!({
                "classification": value,
                "root_cause": context.root_cause,
                "correlation_id": context.correlation_id.to_string(),
            }),
            Err(e) => {
                tracing::warn!(pattern = %key, error = %e, "Could not encode pattern");
                return;
            }
        };
        if let Err(e) = self
            .patterns
            .store_pattern(&key, pattern, self.config.pattern_ttl())
            .await
        {
            tracing::warn!(pattern = %key, error = %e, "Pattern store failed");
        }
    }
}

/// Impact and severity levels recorded with an execution's metrics
///
/// Impact is the larger of the plan's declared impact and the graph
/// impact; severity follows the incident. No impact means no severity.
fn impact_levels(plan: &RemediationPlan, context: &ErrorContext) -> (ImpactLevel, ImpactLevel) {
    let impact = context
        .impact
        .as_ref()
        .map_or(plan.impact, |i| ImpactLevel::from(i.severity).max(plan.impact));
    if impact == ImpactLevel::None {
        return (ImpactLevel::None, ImpactLevel::None);
    }
    let severity = match context.severity {
        ErrorSeverity::Low => ImpactLevel::Low,
        ErrorSeverity::Medium => ImpactLevel::Medium,
        ErrorSeverity::High => ImpactLevel::High,
        ErrorSeverity::Critical | ErrorSeverity::Fatal => ImpactLevel::Critical,
        ErrorSeverity::Unknown => ImpactLevel::None,
    };
    (impact, severity)
}

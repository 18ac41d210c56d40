//! Dependency graph construction and impact traversal
//!
//! [`GraphAnalyzer::analyze_impact`] answers "what breaks if this
//! breaks": a forward depth-first traversal over outgoing edges, each
//! node visited at most once. The result depends only on the graph, so
//! repeated calls over the same snapshot agree.

use crate::classifier::{ObservedRateEstimator, ProbabilityEstimator};
use crate::error::GraphError;
use chrono::{DateTime, Utc};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use remedy_model::{
    DependencyEdge, DependencyGraph, DependencyKind, DependencyNode, GraphMetadata, GraphModelError,
    ImpactAnalysisResult, ImpactScope, ImpactSeverity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metadata key marking nodes built from runtime observations
pub const OBSERVED_KEY: &str = "observed";

/// Spread below which a failure stays within its service neighbourhood
const SERVICE_SPREAD: f64 = 0.34;

/// Edge weight function
pub type WeightFn = Arc<dyn Fn(&DependencyObservation) -> f64 + Send + Sync>;

/// Impact severity function over the affected nodes
pub type SeverityFn = Arc<dyn Fn(&[&DependencyNode]) -> ImpactSeverity + Send + Sync>;

/// Observed runtime component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentObservation {
    /// Component id
    pub id: String,
    /// Component type
    pub component_type: String,
    /// Errors observed in the sampling window
    pub error_count: u64,
    /// Requests observed in the sampling window
    pub request_count: u64,
    /// Explicit error rate, overrides the counts
    pub error_rate: Option<f64>,
    /// Whether the component is on a critical path
    pub is_critical: bool,
    /// Free-form metadata copied onto the node
    pub metadata: BTreeMap<String, String>,
}

impl ComponentObservation {
    /// Create observation with no traffic
    #[must_use]
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            error_count: 0,
            request_count: 0,
            error_rate: None,
            is_critical: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Set error and request counts
    #[inline]
    #[must_use]
    pub fn with_counts(mut self, errors: u64, requests: u64) -> Self {
        self.error_count = errors;
        self.request_count = requests;
        self
    }

    /// Set explicit error rate
    #[inline]
    #[must_use]
    pub fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = Some(rate);
        self
    }

    /// Mark as critical
    #[inline]
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }

    /// Add metadata entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Observed dependency between two components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyObservation {
    /// Component whose failure propagates
    pub source: String,
    /// Component affected by the source
    pub target: String,
    /// Dependency kind
    pub kind: DependencyKind,
    /// Declared weight
    pub weight: Option<f64>,
    /// Calls observed in the sampling window
    pub call_count: u64,
}

impl DependencyObservation {
    /// Create a `Calls` dependency without declared weight
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: DependencyKind::Calls,
            weight: None,
            call_count: 0,
        }
    }

    /// Set kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set declared weight
    #[inline]
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set observed call count
    #[inline]
    #[must_use]
    pub fn with_call_count(mut self, calls: u64) -> Self {
        self.call_count = calls;
        self
    }
}

/// Components and dependencies captured at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    /// Observed components
    pub components: Vec<ComponentObservation>,
    /// Observed dependencies
    pub dependencies: Vec<DependencyObservation>,
    /// Capture time
    pub captured_at: DateTime<Utc>,
}

impl Default for RuntimeSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeSnapshot {
    /// Create empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            dependencies: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// Add component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: ComponentObservation) -> Self {
        self.components.push(component);
        self
    }

    /// Add dependency
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyObservation) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// Declared weight, or `1.0`
#[must_use]
pub fn declared_weight(dependency: &DependencyObservation) -> f64 {
    dependency.weight.unwrap_or(1.0)
}

/// Highest error probability among affected nodes, one level higher if
/// any of them is critical
#[must_use]
pub fn max_probability_severity(affected: &[&DependencyNode]) -> ImpactSeverity {
    let peak = affected
        .iter()
        .map(|n| n.error_probability)
        .fold(0.0_f64, f64::max);
    let severity = ImpactSeverity::from_score(peak);
    if affected.iter().any(|n| n.is_critical) {
        severity.escalate()
    } else {
        severity
    }
}

/// Builds dependency graphs and computes blast radius
#[derive(Clone)]
pub struct GraphAnalyzer {
    estimator: Arc<dyn ProbabilityEstimator>,
    weight_fn: WeightFn,
    severity_fn: SeverityFn,
}

impl std::fmt::Debug for GraphAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphAnalyzer")
            .field("estimator", &self.estimator)
            .finish_non_exhaustive()
    }
}

impl Default for GraphAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(ObservedRateEstimator))
    }
}

impl GraphAnalyzer {
    /// Create analyzer with default weight and severity functions
    #[must_use]
    pub fn new(estimator: Arc<dyn ProbabilityEstimator>) -> Self {
        Self {
            estimator,
            weight_fn: Arc::new(declared_weight),
            severity_fn: Arc::new(max_probability_severity),
        }
    }

    /// Replace the edge weight function
    #[inline]
    #[must_use]
    pub fn with_weight_fn(mut self, f: WeightFn) -> Self {
        self.weight_fn = f;
        self
    }

    /// Replace the impact severity function
    #[inline]
    #[must_use]
    pub fn with_severity_fn(mut self, f: SeverityFn) -> Self {
        self.severity_fn = f;
        self
    }

    /// Build a graph from a runtime snapshot
    ///
    /// Components observed twice keep the later observation.
    ///
    /// # Errors
    /// [`GraphError::Invalid`] if a dependency references an unobserved
    /// component or its weight is negative or not finite.
    pub fn build_dependency_graph(&self, snapshot: &RuntimeSnapshot) -> Result<DependencyGraph, GraphError> {
        let mut graph = DependencyGraph::new();

        for component in &snapshot.components {
            let mut node = DependencyNode::new(&component.id, &component.component_type)
                .with_error_probability(self.estimator.error_probability(component))
                .with_metadata(OBSERVED_KEY, "true");
            node.is_critical = component.is_critical;
            node.metadata
                .extend(component.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
            graph.add_node(node);
        }

        for dependency in &snapshot.dependencies {
            graph.add_edge(DependencyEdge {
                source: dependency.source.clone(),
                target: dependency.target.clone(),
                weight: (self.weight_fn)(dependency),
                kind: dependency.kind.clone(),
            })?;
        }

        graph.metadata = graph_metadata(&graph);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            complexity = graph.metadata.complexity_score,
            reliability = graph.metadata.reliability_score,
            "Built dependency graph"
        );
        Ok(graph)
    }

    /// Compute the blast radius of a failing node
    ///
    /// # Errors
    /// - [`GraphError::NodeNotFound`] if `node_id` is not in the graph
    /// - [`GraphError::Invalid`] if an edge references a missing node
    pub fn analyze_impact(&self, graph: &DependencyGraph, node_id: &str) -> Result<ImpactAnalysisResult, GraphError> {
        let start = graph
            .index_of(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        let mut forward: DiGraphMap<usize, f64> = DiGraphMap::new();
        for idx in 0..graph.node_count() {
            forward.add_node(idx);
        }
        for edge in graph.edges() {
            let (s, t) = match (graph.index_of(&edge.source), graph.index_of(&edge.target)) {
                (Some(s), Some(t)) => (s, t),
                (s, _) => {
                    let missing = if s.is_none() { &edge.source } else { &edge.target };
                    tracing::warn!(
                        source = %edge.source,
                        target = %edge.target,
                        missing = %missing,
                        "Dependency edge references unknown node"
                    );
                    return Err(GraphModelError::UnknownNode {
                        source_id: edge.source.clone(),
                        target_id: edge.target.clone(),
                        missing: missing.clone(),
                    }
                    .into());
                }
            };
            forward.add_edge(s, t, edge.weight);
        }

        let mut affected_idx = Vec::new();
        let mut dfs = Dfs::new(&forward, start);
        while let Some(idx) = dfs.next(&forward) {
            affected_idx.push(idx);
        }

        let nodes: Vec<&DependencyNode> = graph.nodes().collect();
        let affected: Vec<&DependencyNode> = affected_idx.iter().filter_map(|&i| nodes.get(i).copied()).collect();

        let total = graph.node_count();
        let blast_radius = affected.len();
        let spread = blast_radius as f64 / total as f64;
        let observed = affected
            .iter()
            .filter(|n| n.metadata.get(OBSERVED_KEY).is_some_and(|v| v == "true"))
            .count();

        let result = ImpactAnalysisResult {
            error_node_id: node_id.to_string(),
            affected_nodes: affected.iter().map(|n| n.id.clone()).collect(),
            severity: (self.severity_fn)(&affected),
            scope: scope_for(blast_radius, spread),
            confidence: 0.5 + 0.5 * observed as f64 / blast_radius as f64,
            spread,
            blast_radius,
        };

        tracing::debug!(
            node = node_id,
            blast_radius,
            spread,
            severity = ?result.severity,
            scope = ?result.scope,
            "Analyzed impact"
        );
        Ok(result)
    }
}

fn scope_for(blast_radius: usize, spread: f64) -> ImpactScope {
    if blast_radius <= 1 {
        ImpactScope::Local
    } else if spread < SERVICE_SPREAD {
        ImpactScope::Service
    } else if spread < 1.0 {
        ImpactScope::System
    } else {
        ImpactScope::Global
    }
}

fn graph_metadata(graph: &DependencyGraph) -> GraphMetadata {
    let n = graph.node_count();
    if n == 0 {
        return GraphMetadata::default();
    }
    let mean_p = graph.nodes().map(|node| node.error_probability).sum::<f64>() / n as f64;
    GraphMetadata {
        complexity_score: graph.edge_count() as f64 / n as f64,
        reliability_score: 1.0 - mean_p,
        built_at: Utc::now(),
    }
}

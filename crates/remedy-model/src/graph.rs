//! Dependency graph model
//!
//! Built fresh per analysis by the graph analyzer. Nodes keep insertion
//! order so every traversal over the same snapshot is deterministic.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A component in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Component id
    pub id: String,
    /// Component type (service, database, queue, ...)
    pub component_type: String,
    /// Probability of failure in `[0, 1]`
    pub error_probability: f64,
    /// Whether the component is on a critical path
    pub is_critical: bool,
    /// Free-form metadata
    pub metadata: BTreeMap<String, String>,
}

impl DependencyNode {
    /// Create node with zero error probability
    #[must_use]
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            error_probability: 0.0,
            is_critical: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Set error probability, clamped to `[0, 1]`
    #[inline]
    #[must_use]
    pub fn with_error_probability(mut self, p: f64) -> Self {
        self.error_probability = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self
    }

    /// Mark node as critical
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

/// Kind of dependency between two components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Synchronous call
    #[default]
    Calls,
    /// Asynchronous message or event
    Publishes,
    /// Reads data owned by the target
    Reads,
    /// Writes data owned by the target
    Writes,
    /// Anything else
    Other(String),
}

/// Directed, weighted dependency
///
/// `source -> target` means a failure in `source` propagates to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Source component id
    pub source: String,
    /// Target component id
    pub target: String,
    /// Non-negative weight
    pub weight: f64,
    /// Dependency kind
    pub kind: DependencyKind,
}

/// Graph-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Edges per node
    pub complexity_score: f64,
    /// One minus the mean node error probability
    pub reliability_score: f64,
    /// Build time
    pub built_at: DateTime<Utc>,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            complexity_score: 0.0,
            reliability_score: 1.0,
            built_at: Utc::now(),
        }
    }
}

/// Graph invariant violations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphModelError {
    /// Edge references a node that does not exist
    #[error("edge {source_id} -> {target_id} references unknown node '{missing}'")]
    UnknownNode {
        /// Edge source
        source_id: String,
        /// Edge target
        target_id: String,
        /// The id that was not found
        missing: String,
    },

    /// Edge weight is negative or not finite
    #[error("edge {source_id} -> {target_id} has invalid weight {weight}")]
    InvalidWeight {
        /// Edge source
        source_id: String,
        /// Edge target
        target_id: String,
        /// Offending weight
        weight: f64,
    },
}

/// Component dependency graph
///
/// Every edge's source and target reference an existing node; this is
/// enforced by [`DependencyGraph::add_edge`] and on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDependencyGraph")]
pub struct DependencyGraph {
    nodes: IndexMap<String, DependencyNode>,
    edges: Vec<DependencyEdge>,
    /// Graph-level metadata
    pub metadata: GraphMetadata,
}

#[derive(Deserialize)]
struct RawDependencyGraph {
    nodes: IndexMap<String, DependencyNode>,
    edges: Vec<DependencyEdge>,
    metadata: GraphMetadata,
}

impl TryFrom<RawDependencyGraph> for DependencyGraph {
    type Error = GraphModelError;

    fn try_from(raw: RawDependencyGraph) -> Result<Self, Self::Error> {
        let mut graph = Self {
            metadata: raw.metadata,
            ..Self::default()
        };
        for node in raw.nodes.into_values() {
            graph.add_node(node);
        }
        for edge in raw.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl DependencyGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node
    ///
    /// Returns the replaced node, if any. Replacing keeps the node's
    /// original position.
    pub fn add_node(&mut self, node: DependencyNode) -> Option<DependencyNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Add an edge between existing nodes
    ///
    /// # Errors
    /// - [`GraphModelError::UnknownNode`] if either endpoint is missing
    /// - [`GraphModelError::InvalidWeight`] if the weight is negative or not finite
    pub fn add_edge(&mut self, edge: DependencyEdge) -> Result<(), GraphModelError> {
        for id in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(id) {
                return Err(GraphModelError::UnknownNode {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    missing: id.clone(),
                });
            }
        }
        if !edge.weight.is_finite() || edge.weight < 0.0 {
            return Err(GraphModelError::InvalidWeight {
                source_id: edge.source,
                target_id: edge.target,
                weight: edge.weight,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    /// Check if node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Edges in insertion order
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Outgoing edges of a node, in insertion order
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Position of a node in insertion order
    #[inline]
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

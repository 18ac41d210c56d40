//! Impact analysis results

use serde::{Deserialize, Serialize};

/// Severity of a failure's impact on the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImpactSeverity {
    /// Contained
    Low,
    /// Noticeable
    Medium,
    /// Broad
    High,
    /// Critical components affected
    Critical,
}

impl ImpactSeverity {
    /// Bucket a score in `[0, 1]`
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            Self::Critical
        } else if score >= 0.5 {
            Self::High
        } else if score >= 0.25 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// One level higher, saturating at `Critical`
    #[must_use]
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// How far a failure spreads
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImpactScope {
    /// Only the failing component
    Local,
    /// A small neighbourhood
    Service,
    /// A large part of the system
    System,
    /// Everything
    Global,
}

/// Impact level used by strategies and metrics (includes `None`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ImpactLevel {
    /// No impact
    #[default]
    None,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl From<ImpactSeverity> for ImpactLevel {
    fn from(value: ImpactSeverity) -> Self {
        match value {
            ImpactSeverity::Low => Self::Low,
            ImpactSeverity::Medium => Self::Medium,
            ImpactSeverity::High => Self::High,
            ImpactSeverity::Critical => Self::Critical,
        }
    }
}

/// Blast radius of a failing node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysisResult {
    /// The failing node
    pub error_node_id: String,
    /// Nodes reached by forward traversal, in discovery order, failing node first
    pub affected_nodes: Vec<String>,
    /// Impact severity
    pub severity: ImpactSeverity,
    /// Impact scope
    pub scope: ImpactScope,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// `|affected| / |all nodes|`
    pub spread: f64,
    /// `|affected|`
    pub blast_radius: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_severity_escalates() {
        assert_eq!(ImpactSeverity::Low.escalate(), ImpactSeverity::Medium);
        assert_eq!(ImpactSeverity::Critical.escalate(), ImpactSeverity::Critical);
    }

    #[test]
    fn impact_level_ordering() {
        assert!(ImpactLevel::None < ImpactLevel::Low);
        assert!(ImpactLevel::High < ImpactLevel::Critical);
        assert_eq!(ImpactLevel::from(ImpactSeverity::High), ImpactLevel::High);
    }
}

//! Remedy analysis
//!
//! Turns an [`ErrorContext`](remedy_model::ErrorContext) into a
//! classification and a blast-radius estimate.
//!
//! # Core Concepts
//!
//! - [`SuggestionGenerator`]: opaque text service that explains failures
//! - [`AnalysisReport`]: defensive extraction of root cause and severity
//! - [`ErrorClassifier`]: category / subcategory / severity rules
//! - [`GraphAnalyzer`]: dependency graph construction and forward impact traversal
//! - [`PatternStore`]: key/value repository of recurring error signatures
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_analysis::{ErrorClassifier, GraphAnalyzer, RuntimeSnapshot};
//!
//! let classifier = ErrorClassifier::new(generator);
//! let classification = classifier.classify(&context, &budget).await?;
//!
//! let analyzer = GraphAnalyzer::default();
//! let graph = analyzer.build_dependency_graph(&snapshot)?;
//! let impact = analyzer.analyze_impact(&graph, "orders-db")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod classifier;
pub mod error;
pub mod generator;
pub mod graph;
pub mod pattern;
pub mod report;

pub use classifier::{
    build_prompt, determine_category, determine_severity, determine_subcategory, ErrorClassifier,
    ObservedRateEstimator, ProbabilityEstimator,
};
pub use error::{ClassificationError, GeneratorError, GraphError, PatternStoreError};
pub use generator::SuggestionGenerator;
pub use graph::{
    ComponentObservation, DependencyObservation, GraphAnalyzer, RuntimeSnapshot, SeverityFn, WeightFn,
};
pub use pattern::{pattern_signature, InMemoryPatternStore, PatternStore};
pub use report::AnalysisReport;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

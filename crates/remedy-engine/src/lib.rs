//! Remedy engine
//!
//! The remediation pipeline: classify a runtime error, estimate its blast
//! radius over the service dependency graph, pick a strategy, validate
//! and execute the plan with rollback, and record metrics.
//!
//! # Core Concepts
//!
//! - [`RemediationEngine`]: the pipeline and each stage on its own
//! - [`EngineConfig`]: timeouts, validation ceilings and logging, loaded from TOML
//! - [`EngineError`]: the pipeline error taxonomy
//! - [`simulation`]: scripted incidents for the `remedy` CLI
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_engine::{EngineConfig, RemediationEngine};
//!
//! let engine = RemediationEngine::new(EngineConfig::default(), generator, effector)?;
//! let outcome = engine.handle_incident(context, Some(&snapshot), &budget).await?;
//! if let Some(err) = outcome.error() {
//!     tracing::warn!(error = %err, "remediation incomplete");
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;
pub mod simulation;

pub use config::{ConfigError, EngineConfig};
pub use engine::{IncidentOutcome, RemediationEngine};
pub use error::EngineError;
pub use simulation::{run_simulation, Scenario, SimulationReport, StaticGenerator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

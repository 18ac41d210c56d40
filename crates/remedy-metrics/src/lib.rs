//! Remedy metrics
//!
//! Per-remediation metric history kept in memory, aggregated over time
//! windows and checked for sanity before it is trusted.
//!
//! # Core Concepts
//!
//! - [`MetricsCollector`]: concurrent history keyed by remediation id
//! - [`MetricsCollector::validate_metrics`]: reports bad metrics as a
//!   [`ValidationResult`](remedy_model::ValidationResult) instead of failing
//! - Every recorded value is forwarded to the `metrics` facade, so an
//!   exporter installed by the host receives it too
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_metrics::MetricsCollector;
//!
//! let collector = MetricsCollector::new();
//! collector.record_metric("rem-1", "latency_ms", 42.0);
//! let summary = collector.get_aggregated_metrics(TimeRange::last(chrono::Duration::hours(1)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod collector;

pub use collector::{MetricsCollector, EXECUTIONS_COUNTER, STEP_HISTOGRAM};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

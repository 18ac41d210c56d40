//! Remedy validation
//!
//! Gates remediation plans before execution.
//!
//! # Core Concepts
//!
//! - [`ValidationRule`]: named predicate over a (plan, context) pair with a
//!   priority from 1 to 5
//! - [`ValidationRegistry`]: evaluates rules by descending priority, stops at
//!   the first failing rule of priority 4 or 5, caches cacheable rules
//! - [`rules`]: built-in rules
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_validation::{rules, ValidationRegistry};
//!
//! let registry = ValidationRegistry::new(10_000);
//! for rule in rules::builtin(0.8, Duration::from_secs(600)) {
//!     registry.register(rule)?;
//! }
//! let report = registry.validate(&plan, &context, &budget).await?;
//! assert!(report.outcome.success);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod registry;
pub mod rule;
pub mod rules;

pub use error::{RuleError, ValidationError};
pub use registry::{ValidationRegistry, ValidationReport};
pub use rule::{ValidationRule, BLOCKING_PRIORITY, MAX_PRIORITY, MIN_PRIORITY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Remedy strategies
//!
//! Turns a classified [`ErrorContext`](remedy_model::ErrorContext) into a
//! [`RemediationPlan`].
//!
//! # Core Concepts
//!
//! - [`RemediationAction`]: one reversible unit of work
//! - [`ActionEffector`]: host hook that performs an action's side effect
//! - [`RemediationStrategy`]: one remediation family (restart, config patch, ...)
//! - [`StrategyProvider`]: deterministic strategy selection and plan construction
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_strategy::{DryRunEffector, StrategyProvider};
//!
//! let provider = StrategyProvider::with_builtin(Arc::new(DryRunEffector::new()));
//! let plan = provider.create_plan(&context)?;
//! for action in plan.ordered_actions() {
//!     println!("{}", action.descriptor().action_type);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod action;
pub mod builtin;
pub mod error;
pub mod plan;
pub mod provider;
pub mod strategy;

pub use action::{ActionEffector, DryRunEffector, EffectorAction, RemediationAction};
pub use builtin::{CircuitBreakStrategy, ConfigPatchStrategy, ConnectionResetStrategy, RestartStrategy};
pub use error::{ActionError, StrategyError};
pub use plan::RemediationPlan;
pub use provider::StrategyProvider;
pub use strategy::RemediationStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

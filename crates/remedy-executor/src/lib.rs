//! Remedy executor
//!
//! Runs a validated [`RemediationPlan`](remedy_strategy::RemediationPlan)
//! action by action and rolls back on failure.
//!
//! # Core Concepts
//!
//! - [`state_machine`]: legal execution status transitions
//! - [`RemediationExecutor`]: validation gate, sequential execution,
//!   reverse-order rollback, ledger of completed actions
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_executor::RemediationExecutor;
//!
//! let executor = RemediationExecutor::new(registry);
//! let execution = executor.execute(&plan, &context, &budget).await?;
//! if execution.status == ExecutionStatus::Failed {
//!     println!("rolled back: {:?}", execution.rollback);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod executor;
pub mod state_machine;

pub use error::{ExecutorError, TransitionError};
pub use executor::RemediationExecutor;
pub use state_machine::{allowed_transitions, validate_transition};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if illegal transitions panic
#[must_use]
pub const fn is_strict_mode() -> bool {
    cfg!(feature = "strict-debug")
}

//! Observed runtime failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of a single failure
///
/// Created once when an exception is observed. There are no mutating
/// methods; the builder methods consume `self` and are meant for
/// construction only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeError {
    /// Type name of the failure (e.g. `SqlTimeoutException`)
    pub error_type: String,
    /// Human-readable message
    pub message: String,
    /// Component the failure originated in
    pub component: Option<String>,
    /// Inner cause, if the failure wraps another one
    pub inner: Option<Box<RuntimeError>>,
    /// Stack or trace text
    pub stack_trace: Option<String>,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
}

impl RuntimeError {
    /// Create a failure record observed now
    #[must_use]
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            component: None,
            inner: None,
            stack_trace: None,
            timestamp: Utc::now(),
        }
    }

    /// Set originating component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set inner cause
    #[inline]
    #[must_use]
    pub fn with_inner(mut self, inner: RuntimeError) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Set stack trace text
    #[inline]
    #[must_use]
    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Override observation time
    #[inline]
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Iterate over this failure and its chain of inner causes
    pub fn chain(&self) -> impl Iterator<Item = &RuntimeError> {
        std::iter::successors(Some(self), |e| e.inner.as_deref())
    }

    /// Innermost cause of the chain
    #[must_use]
    pub fn root(&self) -> &RuntimeError {
        self.chain().last().unwrap_or(self)
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

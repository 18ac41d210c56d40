//! Cancellation and deadlines
//!
//! Every public async entry point takes an [`ExecutionBudget`]. Suspension
//! points race their future against the budget with [`ExecutionBudget::run`].

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a budgeted operation stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BudgetExceeded {
    /// The deadline elapsed
    #[error("deadline elapsed")]
    DeadlineElapsed,

    /// The caller cancelled
    #[error("cancelled by caller")]
    Cancelled,
}

/// Caller-supplied cancellation token and optional deadline
#[derive(Debug, Clone, Default)]
pub struct ExecutionBudget {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionBudget {
    /// Budget with no deadline and a fresh token
    #[inline]
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Budget expiring `timeout` from now
    #[inline]
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Use a caller-owned cancellation token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Set an absolute deadline
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Child budget: same token and deadline, capped at `timeout` from now
    #[must_use]
    pub fn narrowed(&self, timeout: Duration) -> Self {
        let cap = Instant::now() + timeout;
        Self {
            token: self.token.clone(),
            deadline: Some(self.deadline.map_or(cap, |d| d.min(cap))),
        }
    }

    /// The cancellation token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every operation sharing this budget's token
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check whether the budget is already spent
    ///
    /// # Errors
    /// Returns [`BudgetExceeded`] if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), BudgetExceeded> {
        if self.token.is_cancelled() {
            return Err(BudgetExceeded::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BudgetExceeded::DeadlineElapsed);
        }
        Ok(())
    }

    /// Run `fut` until it completes or the budget is spent
    ///
    /// When the budget is spent first, `fut` is dropped and its partial
    /// work discarded.
    ///
    /// # Errors
    /// Returns [`BudgetExceeded`] on cancellation or deadline expiry.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, BudgetExceeded> {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(BudgetExceeded::Cancelled),
            () = deadline => Err(BudgetExceeded::DeadlineElapsed),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_within_budget() {
        let budget = ExecutionBudget::with_timeout(Duration::from_secs(5));
        let out = budget.run(async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn run_stops_at_deadline() {
        let budget = ExecutionBudget::with_timeout(Duration::from_millis(20));
        let out = budget
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(out, Err(BudgetExceeded::DeadlineElapsed));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let budget = ExecutionBudget::unbounded();
        budget.cancel();
        assert_eq!(budget.check(), Err(BudgetExceeded::Cancelled));
        let out = budget.run(async { 1 }).await;
        assert_eq!(out, Err(BudgetExceeded::Cancelled));
    }

    #[test]
    fn narrowed_keeps_earlier_deadline() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            let parent = ExecutionBudget::with_timeout(Duration::from_millis(10));
            let child = parent.narrowed(Duration::from_secs(60));
            assert_eq!(child.deadline(), parent.deadline());
        });
    }
}

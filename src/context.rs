//! Per-request cancellation and deadline.
//!
//! Every store-touching operation takes a [`Context`] and stops waiting as
//! soon as it is cancelled or its deadline passes. Stopping the wait does not
//! stop work that was already handed to another task.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CancelReason {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is only done once [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check; `None` while the context is still live.
    pub fn err(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => CancelReason::Cancelled,
                () = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }

    /// Race `fut` against this context. Fails fast if the context is already done.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        if let Some(reason) = self.err() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_output_when_live() {
        let ctx = Context::background();
        let out = ctx.run(async { 42 }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test]
    async fn run_fails_fast_when_already_cancelled() {
        let ctx = Context::background();
        ctx.cancel();
        let out = ctx.run(async { 1 }).await;
        assert_eq!(out, Err(CancelReason::Cancelled));
        assert_eq!(ctx.err(), Some(CancelReason::Cancelled));
    }

    #[tokio::test]
    async fn run_stops_waiting_at_deadline() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let out = ctx
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(out, Err(CancelReason::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn huge_timeout_means_no_deadline() {
        let ctx = Context::with_timeout(Duration::MAX);
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
        ctx.cancel();
        assert_eq!(ctx.err(), Some(CancelReason::Cancelled));
    }

    #[tokio::test]
    async fn cancel_from_another_task_wakes_waiter() {
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        assert_eq!(ctx.done().await, CancelReason::Cancelled);
    }
}

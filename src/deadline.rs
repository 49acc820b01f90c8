//! Cooperative cancellation for a single call.
//!
//! A [`CallContext`] is handed to a handler and only ever read by it. Whoever created it keeps
//! the matching [`CancelGuard`]; cancelling the guard (or dropping it) flips the context, and the
//! handler notices at its next checkpoint. Work between checkpoints is never interrupted.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tonic::metadata::MetadataMap;

/// Header carrying the caller's timeout on a gRPC request.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Read-only view of a call's deadline and cancellation state.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Cancels the paired [`CallContext`] on [`cancel`](CancelGuard::cancel) or when dropped.
#[derive(Debug)]
pub struct CancelGuard {
    cancel: watch::Sender<bool>,
}

impl CallContext {
    /// Create a context that expires at `deadline`, if one is given.
    pub fn new(deadline: Option<Instant>) -> (CallContext, CancelGuard) {
        let (cancel, cancelled) = watch::channel(false);
        (CallContext { deadline, cancelled }, CancelGuard { cancel })
    }

    /// Create a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> (CallContext, CancelGuard) {
        Self::new(Some(Instant::now() + timeout))
    }

    /// True once the guard cancelled or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        if *self.cancelled.borrow() {
            return true;
        }

        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl CancelGuard {
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// How often, and how far apart, a deadline-aware handler checks its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollBudget {
    /// Longest time [`poll_until_cancelled`] can take.
    pub fn worst_case(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// How a deadline-aware handler finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Normal,
    Cancelled,
}

/// Check `ctx` up to `budget.attempts` times, sleeping `budget.interval` after each check.
///
/// Returns [`Completion::Cancelled`] at the first check that sees cancellation and
/// [`Completion::Normal`] once the budget is spent.
pub async fn poll_until_cancelled(ctx: &CallContext, budget: &PollBudget) -> Completion {
    for attempt in 1..=budget.attempts {
        let cancelled = ctx.is_cancelled();
        tracing::debug!(attempt, cancelled, "Checking call context");
        if cancelled {
            return Completion::Cancelled;
        }

        tokio::time::sleep(budget.interval).await;
    }

    Completion::Normal
}

/// Parse a `grpc-timeout` header value such as `"1000m"` or `"5S"`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 || value.len() > 9 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount.checked_mul(60 * 60)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };

    Some(duration)
}

/// Timeout requested by the caller through request metadata.
pub fn timeout_from_metadata(metadata: &MetadataMap) -> Option<Duration> {
    metadata
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_grpc_timeout)
}

//! Bounded polling.
//!
//! Every loop in the engine that waits on the page (header stabilization,
//! stabilization strategies, table loading, active-cell convergence) runs
//! through [`poll_until`] with an explicit deadline.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::result::TableResult;

/// Deadline and interval for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Total time budget in milliseconds
    pub timeout_ms: u64,
    /// Sleep between checks in milliseconds
    pub poll_interval_ms: u64,
}

impl PollOptions {
    /// Create poll options
    #[must_use]
    pub const fn new(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Run `check` until it reports `true` or the deadline passes.
///
/// The first check happens immediately. Returns `Ok(false)` on deadline;
/// errors from `check` propagate at once.
pub async fn poll_until<F, Fut>(options: PollOptions, mut check: F) -> TableResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TableResult<bool>>,
{
    let start = Instant::now();
    loop {
        if check().await? {
            return Ok(true);
        }
        if start.elapsed() >= options.timeout() {
            return Ok(false);
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

//! Per-run request accounting.

use parking_lot::Mutex;
use reqwest::StatusCode;
use std::time::Duration;

/// Totals recorded so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_latency: Duration,
}

/// Thread-safe request counter shared by all load tasks
#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt. `status` is `None` when the request failed in
    /// transport; anything outside 2xx counts as a failure.
    pub fn record(&self, latency: Duration, status: Option<StatusCode>) {
        let mut inner = self.inner.lock();
        inner.requests += 1;
        match status {
            Some(status) if status.is_success() => inner.successes += 1,
            _ => inner.failures += 1,
        }
        inner.total_latency += latency;
    }

    pub fn failures(&self) -> u64 {
        self.inner.lock().failures
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.inner.lock()
    }
}

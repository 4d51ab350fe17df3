//! Derived status of the managed endpoint.

use crate::endpoint::CounterSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status body returned by `GET /rest/api/v1/server/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub running: bool,
    /// Whether the endpoint's listeners are bound and accepting
    pub listening: bool,
    /// Requests per second since the first request after start
    pub tps: f64,
    /// Mean handler latency in milliseconds
    pub avg_latency: f64,
    /// Seconds since the first request after start
    pub duration: f64,
    pub requests: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    /// Compute the report from raw counters.
    ///
    /// `uptime` is zero while no request has arrived since the last start, in
    /// which case the rate is reported as 0.
    pub fn compute(
        running: bool,
        listening: bool,
        uptime: Duration,
        counters: CounterSnapshot,
    ) -> Self {
        let duration = uptime.as_secs_f64();
        let tps = if duration > 0.0 {
            counters.requests as f64 / duration
        } else {
            0.0
        };
        let started_at = if uptime.is_zero() {
            None
        } else {
            chrono::Duration::from_std(uptime)
                .ok()
                .map(|elapsed| Utc::now() - elapsed)
        };

        Self {
            running,
            listening,
            tps,
            avg_latency: counters.average_latency_ms(),
            duration,
            requests: counters.requests,
            started_at,
        }
    }
}

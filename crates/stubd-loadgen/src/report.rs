//! Run summary.

use crate::collector::MetricsSnapshot;
use crate::LoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Requests per second over the whole run
    pub tps: f64,
    /// Milliseconds
    pub avg_latency: f64,
    /// Percentage of 2xx responses
    pub success_rate: f64,
    pub failure_count: u64,
}

impl Report {
    /// Ratios are 0 when there is nothing to divide by.
    pub fn from_snapshot(snapshot: &MetricsSnapshot, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        let requests = snapshot.requests as f64;
        let (avg_latency, success_rate) = if snapshot.requests == 0 {
            (0.0, 0.0)
        } else {
            (
                snapshot.total_latency.as_secs_f64() * 1000.0 / requests,
                snapshot.successes as f64 / requests * 100.0,
            )
        };

        Self {
            tps: if seconds > 0.0 { requests / seconds } else { 0.0 },
            avg_latency,
            success_rate,
            failure_count: snapshot.failures,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), LoadError> {
        std::fs::write(path, self.to_json()).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

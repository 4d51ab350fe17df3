//! Request counting and the start-time anchor.
//!
//! Both are updated from the request path with single atomic operations, so
//! counting never serializes request routing and never waits on another lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Request and latency counters since the last start
#[derive(Debug, Default)]
pub struct RequestCounter {
    requests: AtomicU64,
    latency_samples: AtomicU64,
    latency_micros: AtomicU64,
}

/// Point-in-time copy of a [`RequestCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub requests: u64,
    pub latency_samples: u64,
    pub latency_micros: u64,
}

impl CounterSnapshot {
    /// Mean handler latency in milliseconds, 0 without samples.
    pub fn average_latency_ms(&self) -> f64 {
        if self.latency_samples == 0 {
            0.0
        } else {
            self.latency_micros as f64 / self.latency_samples as f64 / 1000.0
        }
    }
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one accepted request. Fire-and-forget: a single relaxed add.
    pub fn record(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the time spent answering one request.
    pub fn record_latency(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.fetch_add(micros, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            latency_samples: self.latency_samples.load(Ordering::Relaxed),
            latency_micros: self.latency_micros.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.latency_samples.store(0, Ordering::Relaxed);
        self.latency_micros.store(0, Ordering::Relaxed);
    }
}

/// Lazily-set start time.
///
/// Stored as microseconds past a fixed origin, offset by one so that 0 means
/// unset. The first `mark` after a `clear` wins; later marks are no-ops.
#[derive(Debug)]
pub struct StartAnchor {
    origin: Instant,
    offset: AtomicU64,
}

impl Default for StartAnchor {
    fn default() -> Self {
        Self::new()
    }
}

impl StartAnchor {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: AtomicU64::new(0),
        }
    }

    /// Set the anchor to now unless it is already set.
    /// Returns true when this call set it.
    pub fn mark(&self) -> bool {
        if self.offset.load(Ordering::Acquire) != 0 {
            return false;
        }
        let micros = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX - 1);
        self.offset
            .compare_exchange(0, micros + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn clear(&self) {
        self.offset.store(0, Ordering::Release);
    }

    pub fn get(&self) -> Option<Instant> {
        match self.offset.load(Ordering::Acquire) {
            0 => None,
            v => Some(self.origin + Duration::from_micros(v - 1)),
        }
    }

    /// Time since the anchor, zero when unset.
    pub fn elapsed(&self) -> Duration {
        self.get().map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn is_set(&self) -> bool {
        self.offset.load(Ordering::Acquire) != 0
    }
}

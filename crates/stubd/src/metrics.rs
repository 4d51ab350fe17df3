//! Prometheus metrics for a managed endpoint.
//!
//! Each endpoint owns its own registry so that several endpoints can live in one
//! process (tests do this) without colliding in the default registry.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label values for `stubd_requests_total`
pub mod outcome {
    pub const OK: &str = "ok";
    pub const NOT_FOUND: &str = "not_found";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const BAD_PROTOCOL: &str = "bad_protocol";
    pub const ERROR: &str = "error";
}

pub struct EndpointMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    response_delay_ms: Histogram,
}

impl EndpointMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "stubd_requests_total",
                "Total number of requests received by the managed endpoint",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let response_delay_ms = Histogram::with_opts(
            HistogramOpts::new(
                "stubd_response_delay_ms",
                "Configured response delay applied per request in milliseconds",
            )
            .buckets(vec![
                0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0,
            ]),
        )?;
        registry.register(Box::new(response_delay_ms.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            response_delay_ms,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.requests_total.with_label_values(&[outcome]).inc();
    }

    pub fn observe_delay_ms(&self, delay_ms: u64) {
        self.response_delay_ms.observe(delay_ms as f64);
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.requests_total.with_label_values(&[outcome]).get()
    }

    /// Collect all metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

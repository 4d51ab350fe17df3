//! Drives request configurations against a target.

use crate::collector::MetricsCollector;
use crate::config::{LoadConfig, PreparedRequest};
use crate::report::Report;
use crate::LoadError;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(100);

pub struct LoadGenerator {
    requests: Vec<PreparedRequest>,
    client: Client,
    collector: Arc<MetricsCollector>,
}

impl LoadGenerator {
    pub fn new(config: &LoadConfig) -> Result<Self, LoadError> {
        let requests = config
            .requests
            .iter()
            .map(|request| request.prepare())
            .collect::<Result<Vec<_>, _>>()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .build()?;
        Ok(Self {
            requests,
            client,
            collector: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }

    /// Run every request configuration in order and summarize the whole run.
    pub async fn run(&self) -> Report {
        let started = Instant::now();
        for request in &self.requests {
            self.run_one(request).await;
        }
        let report = Report::from_snapshot(&self.collector.snapshot(), started.elapsed());
        info!(
            tps = report.tps,
            failures = report.failure_count,
            "Load test finished"
        );
        report
    }

    async fn run_one(&self, request: &PreparedRequest) {
        info!(
            method = %request.method,
            url = %request.url,
            threads = request.threads,
            duration_secs = request.duration.as_secs(),
            "Starting load"
        );
        let deadline = Instant::now() + request.duration;
        let workers = (0..request.threads).map(|_| {
            let client = self.client.clone();
            let collector = Arc::clone(&self.collector);
            let request = request.clone();
            tokio::spawn(send_until(client, request, collector, deadline))
        });
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!("Load task failed: {}", e);
            }
        }
    }
}

async fn send_until(
    client: Client,
    request: PreparedRequest,
    collector: Arc<MetricsCollector>,
    deadline: Instant,
) {
    while Instant::now() < deadline {
        let started = Instant::now();
        let status = tokio::select! {
            status = send_once(&client, &request) => status,
            _ = tokio::time::sleep_until(deadline) => break,
        };
        let latency = started.elapsed();
        match status {
            Some(status) => debug!(%status, ?latency, "Response"),
            None => debug!(?latency, "Request failed"),
        }
        collector.record(latency, status);
    }
}

async fn send_once(client: &Client, request: &PreparedRequest) -> Option<StatusCode> {
    let response = client
        .request(request.method.clone(), request.url.clone())
        .headers(request.headers.clone())
        .body(request.body.clone())
        .send()
        .await;
    match response {
        Ok(response) => {
            let status = response.status();
            // Drain so the connection goes back to the pool.
            if let Err(e) = response.bytes().await {
                debug!("Failed to read response body: {}", e);
                return None;
            }
            Some(status)
        }
        Err(e) => {
            debug!("Request failed: {}", e);
            None
        }
    }
}

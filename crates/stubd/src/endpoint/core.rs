//! State shared by every endpoint variant.

use super::counter::{CounterSnapshot, RequestCounter, StartAnchor};
use crate::balancer::Balancer;
use crate::metrics::EndpointMetrics;
use crate::routes::{ConfigError, RouteTable, Router};
use crate::settings::ListenConfig;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Fields guarded together by the endpoint lock
#[derive(Debug)]
pub struct EndpointState {
    pub running: bool,
    pub router: Arc<Router>,
}

/// Running flag, route snapshot, counters and balancer of one managed endpoint.
///
/// Request handlers take the read side of `state`; configuration and
/// start/stop take the write side. Counters and the start anchor are atomics
/// outside the lock.
pub struct EndpointCore {
    listen: ListenConfig,
    state: RwLock<EndpointState>,
    started: StartAnchor,
    counter: RequestCounter,
    balancer: Balancer,
    metrics: EndpointMetrics,
    shutdown: CancellationToken,
}

impl EndpointCore {
    /// Stopped endpoint with an empty route table
    pub fn new(listen: ListenConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            listen,
            state: RwLock::new(EndpointState {
                running: false,
                router: Arc::new(Router::empty()),
            }),
            started: StartAnchor::new(),
            counter: RequestCounter::new(),
            balancer: Balancer::new(),
            metrics: EndpointMetrics::new()?,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn listen(&self) -> &ListenConfig {
        &self.listen
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, EndpointState> {
        self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state.read().running
    }

    /// Flip the running flag.
    ///
    /// Stopping clears the start anchor. Starting from stopped resets the
    /// request counter but leaves the anchor unset until the first request.
    pub fn set_running(&self, running: bool) {
        let mut state = self.state.write();
        if state.running == running {
            return;
        }
        if running {
            self.counter.reset();
        } else {
            self.started.clear();
        }
        state.running = running;
        info!(running, "Managed endpoint state changed");
    }

    pub fn config(&self) -> RouteTable {
        self.state.read().router.table().clone()
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.state.read().router)
    }

    /// Validate and install `table`. On error the current table is kept.
    pub fn set_config(&self, table: RouteTable) -> Result<(), ConfigError> {
        // Compile before taking the lock so validation never blocks requests.
        let router = Arc::new(Router::compile(table)?);
        let routes = router.len();
        {
            let mut state = self.state.write();
            state.router = Arc::clone(&router);
        }
        self.balancer.retain_routes(|path| router.contains(path));
        info!(routes, "Route table replaced");
        Ok(())
    }

    /// Recompile the current table into a fresh router.
    pub fn rebuild(&self) -> Result<(), ConfigError> {
        let table = self.config();
        debug!(routes = table.paths.len(), "Rebuilding router");
        self.set_config(table)
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started.get()
    }

    pub fn anchor(&self) -> &StartAnchor {
        &self.started
    }

    pub fn counter(&self) -> &RequestCounter {
        &self.counter
    }

    pub fn counter_snapshot(&self) -> CounterSnapshot {
        self.counter.snapshot()
    }

    pub fn balancer(&self) -> &Balancer {
        &self.balancer
    }

    pub fn metrics(&self) -> &EndpointMetrics {
        &self.metrics
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Ask every accept loop and open connection to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

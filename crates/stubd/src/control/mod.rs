//! Control plane: the single owner of the managed endpoint.
//!
//! Mutating calls (configuration replace, start, stop) take the write side of
//! `gate`; reading the configuration takes the read side. Binding and the
//! accept loop run outside the gate: [`ControlPlane::launch`] initializes the
//! endpoint and then spawns its accept loop.

mod status;

pub use status::StatusReport;

use crate::endpoint::{EndpointError, ManagedEndpoint};
use crate::routes::{ConfigError, RouteTable};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Server already running")]
    AlreadyRunning,

    #[error("Server is not running")]
    NotRunning,
}

pub struct ControlPlane {
    endpoint: Arc<dyn ManagedEndpoint>,
    gate: RwLock<()>,
    listening: Arc<AtomicBool>,
    serving: Mutex<Option<JoinHandle<()>>>,
}

impl ControlPlane {
    pub fn new(endpoint: Arc<dyn ManagedEndpoint>) -> Self {
        Self {
            endpoint,
            gate: RwLock::new(()),
            listening: Arc::new(AtomicBool::new(false)),
            serving: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Arc<dyn ManagedEndpoint> {
        &self.endpoint
    }

    /// Bind the endpoint and spawn its accept loop.
    ///
    /// A failure here stops the endpoint only; the control plane keeps
    /// serving and reports `listening: false`. Launching an endpoint that is
    /// already serving returns its address without spawning another loop.
    pub async fn launch(&self) -> Result<SocketAddr, EndpointError> {
        self.endpoint.init().await?;
        let addr = self
            .endpoint
            .local_addr()
            .ok_or(EndpointError::NotInitialized)?;

        let mut serving = self.serving.lock();
        if serving.is_some() {
            debug!("Managed endpoint already listening on {}", addr);
            return Ok(addr);
        }

        let endpoint = Arc::clone(&self.endpoint);
        let listening = Arc::clone(&self.listening);
        listening.store(true, Ordering::Release);
        let handle = tokio::spawn(async move {
            if let Err(e) = endpoint.run().await {
                error!("Managed endpoint stopped: {}", e);
            }
            listening.store(false, Ordering::Release);
        });
        *serving = Some(handle);

        info!(kind = %self.endpoint.kind(), "Managed endpoint listening on {}", addr);
        Ok(addr)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    pub fn get_config(&self) -> RouteTable {
        let _read = self.gate.read();
        self.endpoint.config()
    }

    /// Validate and install `table`; the previous table stays on error.
    pub fn set_config(&self, table: RouteTable) -> Result<(), ConfigError> {
        let _write = self.gate.write();
        self.endpoint.set_config(table)?;
        debug!("The configuration of managed server has been successfully applied");
        Ok(())
    }

    pub fn reset_config(&self) {
        let _write = self.gate.write();
        // An empty table has nothing to validate.
        if let Err(e) = self.endpoint.set_config(RouteTable::default()) {
            error!("Failed to clear route table: {}", e);
        }
        debug!("Managed server config deleted");
    }

    /// Load a route table file and install it.
    pub fn load_config(&self, path: &Path) -> Result<(), ConfigError> {
        let table = RouteTable::from_file(path)?;
        let routes = table.paths.len();
        self.set_config(table)?;
        info!(routes, "Loaded route table from {}", path.display());
        Ok(())
    }

    pub fn start(&self) -> Result<(), LifecycleError> {
        let _write = self.gate.write();
        if self.endpoint.is_running() {
            debug!("Attempted to start managed server as already running");
            return Err(LifecycleError::AlreadyRunning);
        }
        self.endpoint.set_running(true);
        Ok(())
    }

    pub fn stop(&self) -> Result<(), LifecycleError> {
        let _write = self.gate.write();
        if !self.endpoint.is_running() {
            debug!("Attempted to stop managed server that is not running");
            return Err(LifecycleError::NotRunning);
        }
        self.endpoint.set_running(false);
        Ok(())
    }

    /// Status derived from the endpoint counters. Does not take the gate.
    pub fn status(&self) -> StatusReport {
        let core = self.endpoint.core();
        StatusReport::compute(
            self.endpoint.is_running(),
            self.is_listening(),
            core.anchor().elapsed(),
            core.counter_snapshot(),
        )
    }

    pub fn metrics_text(&self) -> String {
        self.endpoint.core().metrics().encode()
    }

    /// Stop the accept loops and wait for them to exit.
    pub async fn shutdown(&self) {
        self.endpoint.shutdown();
        let handle = self.serving.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Managed endpoint task failed: {}", e);
            }
        }
        info!("Managed endpoint shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::build_endpoint;
    use crate::routes::{ResponseSet, ResponseSpec, RouteConfig};
    use crate::settings::ListenConfig;
    use std::time::Duration;

    fn plane() -> ControlPlane {
        let endpoint = build_endpoint(ListenConfig::new("127.0.0.1:0".parse().unwrap())).unwrap();
        ControlPlane::new(endpoint)
    }

    fn route(path: &str, choice: &str) -> RouteTable {
        RouteTable {
            paths: vec![RouteConfig {
                path: path.to_string(),
                response_set: ResponseSet {
                    choice: choice.to_string(),
                    responses: vec![ResponseSpec {
                        weight: 1,
                        body: "ok".to_string(),
                        ..Default::default()
                    }],
                },
            }],
        }
    }

    #[test]
    fn test_start_stop_transitions() {
        let plane = plane();
        assert_eq!(plane.stop(), Err(LifecycleError::NotRunning));
        plane.start().unwrap();
        assert_eq!(plane.start(), Err(LifecycleError::AlreadyRunning));
        plane.stop().unwrap();
        assert!(!plane.endpoint().is_running());
    }

    #[test]
    fn test_start_twice_keeps_counters() {
        let plane = plane();
        plane.start().unwrap();
        let core = plane.endpoint().core();
        core.anchor().mark();
        core.counter().record();
        let anchor = core.started_at();

        assert_eq!(plane.start(), Err(LifecycleError::AlreadyRunning));
        assert_eq!(plane.endpoint().requests_since_start(), 1);
        assert_eq!(plane.endpoint().time_since_start(), anchor);
    }

    #[test]
    fn test_stop_clears_start_time() {
        let plane = plane();
        plane.start().unwrap();
        plane.endpoint().core().anchor().mark();
        plane.stop().unwrap();
        assert!(plane.endpoint().time_since_start().is_none());
    }

    #[test]
    fn test_status_before_any_request() {
        let plane = plane();
        plane.start().unwrap();
        let status = plane.status();
        assert!(status.running);
        assert!(!status.listening);
        assert_eq!(status.duration, 0.0);
        assert_eq!(status.tps, 0.0);
    }

    #[test]
    fn test_unknown_strategy_keeps_previous_config() {
        let plane = plane();
        let good = route("/a", "random");
        plane.set_config(good.clone()).unwrap();
        assert!(plane.set_config(route("/b", "least-conn")).is_err());
        assert_eq!(plane.get_config(), good);
    }

    #[test]
    fn test_reset_config() {
        let plane = plane();
        plane.set_config(route("/a", "random")).unwrap();
        plane.reset_config();
        assert!(plane.get_config().is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let plane = plane();
        assert!(matches!(
            plane.load_config(Path::new("/nonexistent/routes.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_launch_and_shutdown() {
        let plane = plane();
        let addr = plane.launch().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(plane.is_listening());
        plane.shutdown().await;
        assert!(!plane.is_listening());
    }

    #[tokio::test]
    async fn test_second_launch_keeps_serving() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let plane = plane();
        let first = plane.launch().await.unwrap();
        let second = plane.launch().await.unwrap();
        assert_eq!(first, second);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(plane.is_listening());

        let mut stream = tokio::net::TcpStream::connect(first).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 503"), "{response}");

        plane.shutdown().await;
        assert!(!plane.is_listening());
    }
}

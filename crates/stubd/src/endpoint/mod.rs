//! The managed endpoint: the HTTP responder whose routes and lifecycle are
//! driven from the control plane.
//!
//! Three variants share one contract ([`ManagedEndpoint`]) and one request
//! handler; they differ only in how connections are accepted:
//!
//! - [`SingleEndpoint`]: one listener and accept loop
//! - [`ReusePortEndpoint`]: one SO_REUSEPORT listener per worker
//! - [`LimitedEndpoint`]: one listener with a concurrent connection cap

mod conn;
mod core;
mod counter;
mod handler;
mod limited;
mod network;
mod reuseport;
mod single;
mod tls;

pub use self::core::{EndpointCore, EndpointState};
pub use counter::{CounterSnapshot, RequestCounter, StartAnchor};
pub use handler::handle_request;
pub use limited::LimitedEndpoint;
pub use network::{create_listener, create_reusable_listener};
pub use reuseport::ReusePortEndpoint;
pub use single::SingleEndpoint;
pub use tls::create_tls_acceptor;

use crate::routes::{ConfigError, RouteTable};
use crate::settings::{EndpointKind, ListenConfig};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("failed to bind managed endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("managed endpoint is not initialized or is already serving")]
    NotInitialized,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Lifecycle and configuration contract implemented by every endpoint variant.
///
/// Only the listener plumbing is variant-specific; state handling is provided
/// by the shared [`EndpointCore`].
#[async_trait]
pub trait ManagedEndpoint: Send + Sync {
    fn core(&self) -> &Arc<EndpointCore>;

    fn kind(&self) -> EndpointKind;

    /// Bind listeners and rebuild routing from the current table.
    /// Calling it again rebuilds routing without rebinding.
    async fn init(&self) -> Result<(), EndpointError>;

    /// Accept connections until [`ManagedEndpoint::shutdown`] is called.
    async fn run(&self) -> Result<(), EndpointError>;

    /// Bound address, once `init` has succeeded
    fn local_addr(&self) -> Option<SocketAddr>;

    fn shutdown(&self) {
        self.core().shutdown();
    }

    fn is_running(&self) -> bool {
        self.core().is_running()
    }

    fn set_running(&self, running: bool) {
        self.core().set_running(running);
    }

    fn config(&self) -> RouteTable {
        self.core().config()
    }

    fn set_config(&self, table: RouteTable) -> Result<(), ConfigError> {
        self.core().set_config(table)
    }

    /// Time of the first request since the last start, if any
    fn time_since_start(&self) -> Option<Instant> {
        self.core().started_at()
    }

    fn requests_since_start(&self) -> u64 {
        self.core().counter().requests()
    }
}

/// Build the endpoint variant selected by `listen.kind`. Nothing is bound yet.
pub fn build_endpoint(listen: ListenConfig) -> Result<Arc<dyn ManagedEndpoint>, EndpointError> {
    let kind = listen.kind;
    let core = Arc::new(EndpointCore::new(listen)?);
    let endpoint: Arc<dyn ManagedEndpoint> = match kind {
        EndpointKind::Single => Arc::new(SingleEndpoint::new(core)),
        EndpointKind::ReusePort => Arc::new(ReusePortEndpoint::new(core)),
        EndpointKind::Limited => Arc::new(LimitedEndpoint::new(core)),
    };
    Ok(endpoint)
}

fn prepare_tls(core: &EndpointCore) -> Result<Option<TlsAcceptor>, EndpointError> {
    let listen = core.listen();
    if !listen.protocol.requires_tls() {
        return Ok(None);
    }
    create_tls_acceptor(&listen.tls)
        .map(Some)
        .map_err(|e| EndpointError::Tls(format!("{e:#}")))
}

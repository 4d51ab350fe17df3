//! One listener with a cap on concurrently served connections.
//!
//! Once `max_connections` connections are open the accept loop stops pulling
//! from the backlog until one of them closes.

use super::conn::accept_loop;
use super::core::EndpointCore;
use super::network::create_listener;
use super::{prepare_tls, EndpointError, ManagedEndpoint};
use crate::settings::EndpointKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;
use tracing::info;

pub struct LimitedEndpoint {
    core: Arc<EndpointCore>,
    permits: Arc<Semaphore>,
    listener: Mutex<Option<TcpListener>>,
    tls: Mutex<Option<TlsAcceptor>>,
    bound: Mutex<Option<SocketAddr>>,
}

impl LimitedEndpoint {
    pub fn new(core: Arc<EndpointCore>) -> Self {
        let max = core.listen().max_connections.max(1);
        Self {
            core,
            permits: Arc::new(Semaphore::new(max)),
            listener: Mutex::new(None),
            tls: Mutex::new(None),
            bound: Mutex::new(None),
        }
    }

    /// Connection slots currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl ManagedEndpoint for LimitedEndpoint {
    fn core(&self) -> &Arc<EndpointCore> {
        &self.core
    }

    fn kind(&self) -> EndpointKind {
        EndpointKind::Limited
    }

    async fn init(&self) -> Result<(), EndpointError> {
        self.core.rebuild()?;
        if self.bound.lock().is_some() {
            return Ok(());
        }

        let tls = prepare_tls(&self.core)?;
        let addr = self.core.listen().addr;
        let listener = create_listener(addr).map_err(|source| EndpointError::Bind { addr, source })?;
        let local = listener.local_addr().map_err(|source| EndpointError::Bind { addr, source })?;
        info!(
            max_connections = self.permits.available_permits(),
            "Managed endpoint bound to {}", local
        );

        *self.tls.lock() = tls;
        *self.listener.lock() = Some(listener);
        *self.bound.lock() = Some(local);
        Ok(())
    }

    async fn run(&self) -> Result<(), EndpointError> {
        let listener = self.listener.lock().take().ok_or(EndpointError::NotInitialized)?;
        let tls = self.tls.lock().clone();
        accept_loop(
            listener,
            Arc::clone(&self.core),
            tls,
            Some(Arc::clone(&self.permits)),
        )
        .await;
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock()
    }
}

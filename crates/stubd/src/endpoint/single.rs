//! One listener, one accept loop.

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
use tokio_rustls::TlsAcceptor;
use tracing::info;

pub struct SingleEndpoint {
    core: Arc<EndpointCore>,
    listener: Mutex<Option<TcpListener>>,
    tls: Mutex<Option<TlsAcceptor>>,
    bound: Mutex<Option<SocketAddr>>,
}

impl SingleEndpoint {
    pub fn new(core: Arc<EndpointCore>) -> Self {
        Self {
            core,
            listener: Mutex::new(None),
            tls: Mutex::new(None),
            bound: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ManagedEndpoint for SingleEndpoint {
    fn core(&self) -> &Arc<EndpointCore> {
        &self.core
    }

    fn kind(&self) -> EndpointKind {
        EndpointKind::Single
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
        info!("Managed endpoint bound to {}", local);

        *self.tls.lock() = tls;
        *self.listener.lock() = Some(listener);
        *self.bound.lock() = Some(local);
        Ok(())
    }

    async fn run(&self) -> Result<(), EndpointError> {
        let listener = self.listener.lock().take().ok_or(EndpointError::NotInitialized)?;
        let tls = self.tls.lock().clone();
        accept_loop(listener, Arc::clone(&self.core), tls, None).await;
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock()
    }
}

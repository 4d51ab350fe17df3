//! Several SO_REUSEPORT listeners on one port, each with its own accept loop.

use super::conn::accept_loop;
use super::core::EndpointCore;
use super::network::create_reusable_listener;
use super::{prepare_tls, EndpointError, ManagedEndpoint};
use crate::settings::EndpointKind;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

pub struct ReusePortEndpoint {
    core: Arc<EndpointCore>,
    listeners: Mutex<Vec<TcpListener>>,
    tls: Mutex<Option<TlsAcceptor>>,
    bound: Mutex<Option<SocketAddr>>,
}

impl ReusePortEndpoint {
    pub fn new(core: Arc<EndpointCore>) -> Self {
        Self {
            core,
            listeners: Mutex::new(Vec::new()),
            tls: Mutex::new(None),
            bound: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ManagedEndpoint for ReusePortEndpoint {
    fn core(&self) -> &Arc<EndpointCore> {
        &self.core
    }

    fn kind(&self) -> EndpointKind {
        EndpointKind::ReusePort
    }

    async fn init(&self) -> Result<(), EndpointError> {
        self.core.rebuild()?;
        if self.bound.lock().is_some() {
            return Ok(());
        }

        let tls = prepare_tls(&self.core)?;
        let workers = self.core.listen().worker_count();
        let requested = self.core.listen().addr;

        // The first bind resolves port 0; the rest join the same port.
        let first = create_reusable_listener(requested).map_err(|source| EndpointError::Bind {
            addr: requested,
            source,
        })?;
        let local = first.local_addr().map_err(|source| EndpointError::Bind {
            addr: requested,
            source,
        })?;

        let mut listeners = Vec::with_capacity(workers);
        listeners.push(first);
        for _ in 1..workers {
            let listener = create_reusable_listener(local)
                .map_err(|source| EndpointError::Bind { addr: local, source })?;
            listeners.push(listener);
        }
        info!(workers, "Managed endpoint bound to {} with SO_REUSEPORT", local);

        *self.tls.lock() = tls;
        *self.listeners.lock() = listeners;
        *self.bound.lock() = Some(local);
        Ok(())
    }

    async fn run(&self) -> Result<(), EndpointError> {
        let listeners = std::mem::take(&mut *self.listeners.lock());
        if listeners.is_empty() {
            return Err(EndpointError::NotInitialized);
        }
        let tls = self.tls.lock().clone();

        let loops = listeners.into_iter().map(|listener| {
            let core = Arc::clone(&self.core);
            let tls = tls.clone();
            tokio::spawn(accept_loop(listener, core, tls, None))
        });
        for result in join_all(loops).await {
            if let Err(e) = result {
                error!("Accept loop task failed: {}", e);
            }
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock()
    }
}

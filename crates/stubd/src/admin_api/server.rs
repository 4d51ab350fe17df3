//! Control API server.

use crate::admin_api::router::route_request;
use crate::control::ControlPlane;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// HTTP server for the control channel
pub struct ControlServer {
    listener: TcpListener,
    plane: Arc<ControlPlane>,
}

impl ControlServer {
    /// Bind the control listener
    pub async fn bind(addr: SocketAddr, plane: Arc<ControlPlane>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, plane })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        match self.listener.local_addr() {
            Ok(addr) => info!("Control API listening on http://{}", addr),
            Err(e) => error!("Control API listener has no local address: {}", e),
        }

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let io = TokioIo::new(stream);
                            let plane = Arc::clone(&self.plane);
                            tokio::spawn(async move {
                                let service = service_fn(move |req: Request<Incoming>| {
                                    route_request(req, Arc::clone(&plane))
                                });
                                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                    debug!("Control API connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => error!("Control API accept error: {}", e),
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Control API shutting down");
                    break;
                }
            }
        }
    }
}

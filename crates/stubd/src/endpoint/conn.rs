//! Connection serving and the accept loop shared by the endpoint variants.

use super::core::EndpointCore;
use super::handler::handle_request;
use crate::settings::ProtocolVersion;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Accept connections until the endpoint's shutdown token fires.
///
/// With `limit` set, a permit is taken before each accept and held for the
/// lifetime of the connection. Accept errors are logged and the loop keeps
/// going.
pub(crate) async fn accept_loop(
    listener: TcpListener,
    core: Arc<EndpointCore>,
    tls: Option<TlsAcceptor>,
    limit: Option<Arc<Semaphore>>,
) {
    let shutdown = core.shutdown_token().clone();
    let local = listener.local_addr().ok();

    loop {
        let permit = match &limit {
            Some(semaphore) => {
                let acquired = tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => permit,
                    _ = shutdown.cancelled() => break,
                };
                match acquired {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                }
            }
            None => None,
        };

        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let core = Arc::clone(&core);
                        let tls = tls.clone();
                        tokio::spawn(async move {
                            serve_stream(stream, peer, core, tls).await;
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Accept error on {:?}: {}", local, e);
                    }
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }

    info!("Listener on {:?} shutting down", local);
}

/// Serve one TCP connection, doing the TLS handshake first when configured.
///
/// The connection is dropped once it has gone `read_timeout` without a first
/// request, or `idle_timeout` without a request in flight after that. The TLS
/// handshake counts against the first budget.
pub(crate) async fn serve_stream(
    stream: TcpStream,
    peer: SocketAddr,
    core: Arc<EndpointCore>,
    tls: Option<TlsAcceptor>,
) {
    let _ = stream.set_nodelay(true);
    let listen = core.listen();
    let (read_timeout, idle_timeout) = (listen.read_timeout, listen.idle_timeout);
    let shutdown = core.shutdown_token().clone();
    let activity = Arc::new(ConnActivity::new());

    let serve = async {
        let tracked = Arc::clone(&activity);
        match tls {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(stream) => serve_io(TokioIo::new(stream), peer, core, tracked).await,
                Err(e) => debug!("TLS handshake with {} failed: {}", peer, e),
            },
            None => serve_io(TokioIo::new(stream), peer, core, tracked).await,
        }
    };

    tokio::select! {
        _ = serve => {}
        _ = activity.expired(read_timeout, idle_timeout) => {
            debug!("Closing idle connection from {}", peer);
        }
        _ = shutdown.cancelled() => {}
    }
}

async fn serve_io<I>(
    io: I,
    peer: SocketAddr,
    core: Arc<EndpointCore>,
    activity: Arc<ConnActivity>,
) where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let listen = core.listen();
    let protocol = listen.protocol;
    let (read_timeout, idle_timeout) = (listen.read_timeout, listen.idle_timeout);
    let service = service_fn(move |req: Request<Incoming>| {
        let core = Arc::clone(&core);
        let busy = InFlight::enter(Arc::clone(&activity));
        async move {
            let response = handle_request(req, core).await;
            drop(busy);
            response
        }
    });

    let served: Result<(), BoxError> = match protocol {
        ProtocolVersion::Http2 => {
            let mut builder = auto::Builder::new(TokioExecutor::new());
            builder.http1().timer(TokioTimer::new());
            builder.http2().timer(TokioTimer::new());
            if !read_timeout.is_zero() {
                builder.http1().header_read_timeout(read_timeout);
                builder.http2().keep_alive_timeout(read_timeout);
            }
            if !idle_timeout.is_zero() {
                builder.http2().keep_alive_interval(idle_timeout);
            }
            builder.serve_connection(io, service).await
        }
        ProtocolVersion::Http10 | ProtocolVersion::Http11 => {
            let mut builder = http1::Builder::new();
            builder.timer(TokioTimer::new());
            builder.keep_alive(protocol != ProtocolVersion::Http10);
            if !read_timeout.is_zero() {
                builder.header_read_timeout(read_timeout);
            }
            builder.serve_connection(io, service).await.map_err(Into::into)
        }
    };

    if let Err(e) = served {
        debug!("Connection error from {}: {}", peer, e);
    }
}

/// Request activity on one connection.
struct ConnActivity {
    origin: Instant,
    in_flight: AtomicUsize,
    served: AtomicBool,
    /// Micros since `origin` at which the last request finished
    last_done: AtomicU64,
}

impl ConnActivity {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            in_flight: AtomicUsize::new(0),
            served: AtomicBool::new(false),
            last_done: AtomicU64::new(0),
        }
    }

    /// Instant at which the connection counts as idle, `None` while a request
    /// is in flight or the applicable timeout is disabled.
    fn idle_deadline(&self, read_timeout: Duration, idle_timeout: Duration) -> Option<Instant> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let (since, limit) = if self.served.load(Ordering::SeqCst) {
            let last = Duration::from_micros(self.last_done.load(Ordering::SeqCst));
            (self.origin + last, idle_timeout)
        } else {
            (self.origin, read_timeout)
        };
        if limit.is_zero() {
            None
        } else {
            Some(since + limit)
        }
    }

    /// Resolves once the connection has been idle past its deadline.
    async fn expired(&self, read_timeout: Duration, idle_timeout: Duration) {
        loop {
            match self.idle_deadline(read_timeout, idle_timeout) {
                Some(deadline) if Instant::now() >= deadline => return,
                Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                None => tokio::time::sleep(IDLE_RECHECK).await,
            }
        }
    }
}

const IDLE_RECHECK: Duration = Duration::from_millis(250);

/// Marks a request in flight until dropped, including when hyper drops the
/// request future early.
struct InFlight(Arc<ConnActivity>);

impl InFlight {
    fn enter(activity: Arc<ConnActivity>) -> Self {
        activity.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(activity)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let elapsed = self.0.origin.elapsed().as_micros() as u64;
        self.0.last_done.store(elapsed, Ordering::SeqCst);
        self.0.served.store(true, Ordering::SeqCst);
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

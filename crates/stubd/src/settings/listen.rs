//! Managed endpoint listener configuration.

use super::protocol::{EndpointKind, ProtocolVersion};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// TLS configuration, used when the protocol version requires it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_path: String,
    /// Path to TLS private key file (PEM format)
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "server.crt".to_string(),
            key_path: "server.key".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenConfig {
    pub addr: SocketAddr,
    #[serde(default)]
    pub kind: EndpointKind,
    #[serde(default)]
    pub protocol: ProtocolVersion,
    /// Reject requests whose HTTP version differs from `protocol`
    #[serde(default = "default_enforce_protocol")]
    pub enforce_protocol: bool,
    #[serde(default)]
    pub tls: TlsConfig,
    /// Number of accept loops for the reuseport variant (0 = auto-detect CPU count)
    #[serde(default)]
    pub workers: usize,
    /// Concurrent connection cap for the limited variant
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Budget for a new connection to deliver its first request head
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,
    /// How long a connection may sit without a request in flight
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: Duration,
}

fn default_enforce_protocol() -> bool {
    true
}

fn default_max_connections() -> usize {
    200
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(10)
}

impl ListenConfig {
    /// Plain HTTP/1.1 single-listener configuration on `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            kind: EndpointKind::default(),
            protocol: ProtocolVersion::default(),
            enforce_protocol: default_enforce_protocol(),
            tls: TlsConfig::default(),
            workers: 0,
            max_connections: default_max_connections(),
            read_timeout: default_read_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }

    pub fn with_kind(mut self, kind: EndpointKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_timeouts(mut self, read: Duration, idle: Duration) -> Self {
        self.read_timeout = read;
        self.idle_timeout = idle;
        self
    }

    /// Resolved accept loop count for the reuseport variant
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

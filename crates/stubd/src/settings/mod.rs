//! Process settings for the `stubd` binary.
//!
//! Every flag can also be supplied through the environment variable named in
//! its `env` attribute, so the server can be configured purely from a container
//! environment.

mod listen;
mod protocol;

pub use listen::{ListenConfig, TlsConfig};
pub use protocol::{EndpointKind, ProtocolVersion};

use crate::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "stubd")]
#[command(author, version, about = "Configurable HTTP stub server with a runtime control plane")]
pub struct Settings {
    /// Route table loaded at startup (JSON, or YAML by extension)
    #[arg(long, env = "RESPONSE_FILE_PATH")]
    pub response_file: Option<PathBuf>,

    /// Managed endpoint bind address
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0")]
    pub server_addr: IpAddr,

    /// Managed endpoint port
    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub server_port: u16,

    /// Control channel bind address
    #[arg(long, env = "CONTROL_SERVER_ADDR", default_value = "0.0.0.0")]
    pub control_addr: IpAddr,

    /// Control channel port
    #[arg(long, env = "CONTROL_SERVER_PORT", default_value_t = 8062)]
    pub control_port: u16,

    /// Managed endpoint variant: single, reuseport or limited
    #[arg(long, env = "MANAGED_SERVER_TYPE", default_value = "single")]
    pub server_type: EndpointKind,

    /// HTTP version served by the managed endpoint: HTTP/1.0, HTTP/1.1 or HTTP/2.0
    #[arg(long, env = "PROTOCOL_VERSION", default_value = "HTTP/1.1")]
    pub protocol: ProtocolVersion,

    /// Reject requests using a different HTTP version with 400
    #[arg(long, env = "ENFORCE_PROTOCOL", default_value_t = true, action = ArgAction::Set)]
    pub enforce_protocol: bool,

    /// TLS certificate (PEM), used for HTTP/2.0
    #[arg(long, env = "TLS_CERT_FILE", default_value = "server.crt")]
    pub tls_cert: String,

    /// TLS private key (PEM), used for HTTP/2.0
    #[arg(long, env = "TLS_KEY_FILE", default_value = "server.key")]
    pub tls_key: String,

    /// Accept loops for the reuseport variant (0 = number of CPUs)
    #[arg(long, env = "SERVER_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// Concurrent connection cap for the limited variant
    #[arg(long, env = "SERVER_MAX_CONNECTIONS", default_value_t = 200)]
    pub max_connections: usize,

    /// Seconds a new connection has to send its first request head (0 = no limit)
    #[arg(long, env = "SERVER_READ_TIMEOUT", default_value_t = 5)]
    pub read_timeout: u64,

    /// Seconds an idle keep-alive connection is kept open (0 = no limit)
    #[arg(long, env = "SERVER_IDLE_TIMEOUT", default_value_t = 10)]
    pub idle_timeout: u64,

    /// Put the managed endpoint in the running state once it is listening
    #[arg(long, env = "AUTO_START", default_value_t = true, action = ArgAction::Set)]
    pub auto_start: bool,

    /// Log level: DEBUG, INFO, WARN or ERROR (RUST_LOG overrides)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn listen_config(&self) -> ListenConfig {
        ListenConfig {
            addr: SocketAddr::new(self.server_addr, self.server_port),
            kind: self.server_type,
            protocol: self.protocol,
            enforce_protocol: self.enforce_protocol,
            tls: TlsConfig {
                cert_path: self.tls_cert.clone(),
                key_path: self.tls_key.clone(),
            },
            workers: self.workers,
            max_connections: self.max_connections,
            read_timeout: Duration::from_secs(self.read_timeout),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        }
    }

    pub fn control_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.control_addr, self.control_port)
    }
}

//! Protocol version and endpoint variant selection.

use hyper::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP version the managed endpoint serves and enforces.
///
/// HTTP/2.0 is only offered over TLS; the other versions are plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum ProtocolVersion {
    #[serde(rename = "HTTP/1.0")]
    Http10,
    #[default]
    #[serde(rename = "HTTP/1.1")]
    Http11,
    #[serde(rename = "HTTP/2.0")]
    Http2,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::Http10 => "HTTP/1.0",
            ProtocolVersion::Http11 => "HTTP/1.1",
            ProtocolVersion::Http2 => "HTTP/2.0",
        }
    }

    /// Whether a request with `version` is acceptable
    pub fn accepts(&self, version: Version) -> bool {
        match self {
            ProtocolVersion::Http10 => version == Version::HTTP_10,
            ProtocolVersion::Http11 => version == Version::HTTP_11,
            ProtocolVersion::Http2 => version == Version::HTTP_2,
        }
    }

    pub fn requires_tls(&self) -> bool {
        matches!(self, ProtocolVersion::Http2)
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HTTP/1.0" | "HTTP1.0" | "1.0" => Ok(ProtocolVersion::Http10),
            "HTTP/1.1" | "HTTP1.1" | "1.1" | "" => Ok(ProtocolVersion::Http11),
            "HTTP/2.0" | "HTTP/2" | "HTTP2" | "2" | "2.0" => Ok(ProtocolVersion::Http2),
            _ => Err(format!("Unsupported protocol version: {s}")),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection-acceptance mechanics of the managed endpoint.
///
/// All variants share request handling; they differ only in how connections
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// One listener, one task per connection
    #[default]
    Single,
    /// Several listeners sharing the port through SO_REUSEPORT, one accept
    /// loop each
    ReusePort,
    /// One listener with a cap on concurrently open connections
    Limited,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Single => "single",
            EndpointKind::ReusePort => "reuseport",
            EndpointKind::Limited => "limited",
        }
    }
}

impl FromStr for EndpointKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "" => Ok(EndpointKind::Single),
            "reuseport" | "reuse-port" => Ok(EndpointKind::ReusePort),
            "limited" => Ok(EndpointKind::Limited),
            _ => Err(format!("Unknown managed server type: {s}")),
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

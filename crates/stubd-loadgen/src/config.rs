//! Load test configuration file.

use crate::LoadError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadConfig {
    #[serde(default)]
    pub requests: Vec<RequestConfig>,
}

/// One request to replay, with its concurrency and duration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Seconds
    #[serde(default)]
    pub duration: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_threads() -> usize {
    1
}

impl LoadConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let config: LoadConfig =
            serde_json::from_slice(bytes).map_err(|e| LoadError::Config(e.to_string()))?;
        for request in &config.requests {
            request.prepare()?;
        }
        Ok(config)
    }
}

/// A request in wire form, built once and cloned per attempt
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
    pub threads: usize,
    pub duration: Duration,
}

impl RequestConfig {
    /// Validate and convert to wire form.
    pub fn prepare(&self) -> Result<PreparedRequest, LoadError> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| LoadError::Config(format!("invalid method '{}'", self.method)))?;
        let url = Url::parse(&self.url)
            .map_err(|e| LoadError::Config(format!("invalid url '{}': {e}", self.url)))?;
        if self.threads == 0 {
            return Err(LoadError::Config(format!("threads must be positive for {}", self.url)));
        }

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = || LoadError::Config(format!("invalid header '{name}'"));
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(name, value);
        }

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body: bytes::Bytes::from(self.body.clone()),
            threads: self.threads,
            duration: Duration::from_secs(self.duration),
        })
    }
}

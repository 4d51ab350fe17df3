//! Wire types for the route table.
//!
//! These are the shapes accepted on the control channel and in route files:
//!
//! ```json
//! { "paths": [ { "path": "/foo", "responseSet": { "choice": "round-robin",
//!   "responses": [ {"weight": 1, "delay": 10, "headers": {}, "body": "..."} ] } } ] }
//! ```

use crate::balancer::SelectError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Complete routing configuration of a managed endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub paths: Vec<RouteConfig>,
}

/// One route: an exact request path and how to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub path: String,
    pub response_set: ResponseSet,
}

/// Candidate responses plus the strategy used to pick among them.
///
/// `choice` stays a plain string on the wire so that an unknown strategy is
/// reported as a validation failure rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSet {
    pub choice: String,
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,
}

/// A pre-scripted response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Only meaningful for the weighted strategies.
    #[serde(default)]
    pub weight: u32,
    /// Simulated processing time in milliseconds.
    #[serde(default)]
    pub delay: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

/// Errors raised while decoding or validating a route table
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid route '{path}': {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: SelectError,
    },
    #[error("Invalid header '{name}' on route '{path}'")]
    InvalidHeader { path: String, name: String },
    #[error("Invalid route table: {0}")]
    Decode(String),
    #[error("Failed to read route file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RouteTable {
    /// Load a route table from a JSON file, or YAML when the extension says so.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
            });

        if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Decode(e.to_string()))
        } else {
            Self::from_json(contents.as_bytes())
        }
    }

    /// Decode a route table from a JSON document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Decode(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_route_table() {
        let json = r#"{
            "paths": [{
                "path": "/foo",
                "responseSet": {
                    "choice": "round-robin",
                    "responses": [
                        {"weight": 3, "delay": 25, "headers": {"X-Test": "1"}, "body": "hello"},
                        {"body": "bye"}
                    ]
                }
            }]
        }"#;

        let table = RouteTable::from_json(json.as_bytes()).unwrap();
        assert_eq!(table.paths.len(), 1);
        let route = &table.paths[0];
        assert_eq!(route.path, "/foo");
        assert_eq!(route.response_set.choice, "round-robin");
        assert_eq!(route.response_set.responses[0].weight, 3);
        assert_eq!(route.response_set.responses[0].delay, 25);
        assert_eq!(
            route.response_set.responses[0].headers.get("X-Test"),
            Some(&"1".to_string())
        );
        // Missing fields fall back to defaults
        assert_eq!(
            route.response_set.responses[1],
            ResponseSpec {
                body: "bye".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let table = RouteTable {
            paths: vec![RouteConfig {
                path: "/ping".to_string(),
                response_set: ResponseSet {
                    choice: "random".to_string(),
                    responses: vec![ResponseSpec::default()],
                },
            }],
        };
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["paths"][0]["responseSet"]["choice"], "random");
    }

    #[test]
    fn test_empty_document_is_empty_table() {
        let table = RouteTable::from_json(b"{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_decode_error() {
        let err = RouteTable::from_json(b"{\"paths\": 5}").unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
paths:
  - path: /yaml
    responseSet:
      choice: weight
      responses:
        - weight: 1
          body: from-yaml
"#
        )
        .unwrap();

        let table = RouteTable::from_file(file.path()).unwrap();
        assert_eq!(table.paths[0].path, "/yaml");
        assert_eq!(table.paths[0].response_set.responses[0].body, "from-yaml");
    }

    #[test]
    fn test_from_missing_file() {
        let err = RouteTable::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

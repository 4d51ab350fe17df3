//! Validated, request-ready snapshot of a route table.
//!
//! A `Router` is built once per configuration update and then shared immutably
//! behind an `Arc`, so a request always sees one complete table.

use super::types::{ConfigError, RouteConfig, RouteTable};
use crate::balancer::{cumulative_weights, Balancer, HasWeight, SelectError, Strategy};
use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// A response with headers and body already converted to wire form
#[derive(Debug, Clone)]
pub struct PreparedResponse {
    pub weight: u32,
    pub delay: Duration,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HasWeight for PreparedResponse {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// One validated route
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    path: String,
    strategy: Strategy,
    candidates: Vec<PreparedResponse>,
    cumulative: Vec<u64>,
}

impl CompiledRoute {
    /// Validate the strategy and candidates of `route` and prepare its responses.
    pub fn compile(route: &RouteConfig) -> Result<Self, ConfigError> {
        let invalid = |source: SelectError| ConfigError::InvalidRoute {
            path: route.path.clone(),
            source,
        };

        let set = &route.response_set;
        let strategy: Strategy = set.choice.parse().map_err(invalid)?;
        strategy.validate(&set.responses).map_err(invalid)?;

        let mut candidates = Vec::with_capacity(set.responses.len());
        for spec in &set.responses {
            let mut headers = HeaderMap::with_capacity(spec.headers.len());
            for (name, value) in &spec.headers {
                let invalid_header = || ConfigError::InvalidHeader {
                    path: route.path.clone(),
                    name: name.clone(),
                };
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid_header())?;
                let value = HeaderValue::from_str(value).map_err(|_| invalid_header())?;
                headers.insert(name, value);
            }
            candidates.push(PreparedResponse {
                weight: spec.weight,
                delay: Duration::from_millis(spec.delay),
                headers,
                body: Bytes::from(spec.body.clone()),
            });
        }

        let cumulative = if strategy == Strategy::WeightedBinarySearch {
            cumulative_weights(&candidates)
        } else {
            Vec::new()
        };

        Ok(Self {
            path: route.path.clone(),
            strategy,
            candidates,
            cumulative,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn candidates(&self) -> &[PreparedResponse] {
        &self.candidates
    }

    /// Pick the response for one request.
    pub fn pick(&self, balancer: &Balancer) -> Result<&PreparedResponse, SelectError> {
        balancer.select(&self.path, self.strategy, &self.candidates, &self.cumulative)
    }
}

/// Exact-path lookup over a validated route table.
///
/// Duplicate paths are allowed; the first entry in table order wins and later
/// duplicates are never reachable.
#[derive(Debug, Default)]
pub struct Router {
    table: RouteTable,
    routes: Vec<CompiledRoute>,
    index: HashMap<String, usize>,
}

impl Router {
    /// Validate every route of `table`. Either the whole table compiles or
    /// nothing is returned.
    pub fn compile(table: RouteTable) -> Result<Self, ConfigError> {
        let mut routes = Vec::with_capacity(table.paths.len());
        let mut index = HashMap::with_capacity(table.paths.len());

        for route in &table.paths {
            let compiled = CompiledRoute::compile(route)?;
            let position = routes.len();
            if index.contains_key(&route.path) {
                warn!(path = %route.path, "Duplicate route path, first definition wins");
            } else {
                index.insert(route.path.clone(), position);
            }
            routes.push(compiled);
        }

        Ok(Self {
            table,
            routes,
            index,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// First route whose path equals `path` exactly.
    pub fn find(&self, path: &str) -> Option<&CompiledRoute> {
        self.index.get(path).and_then(|&i| self.routes.get(i))
    }

    /// The table this router was compiled from
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether `path` is reachable through this router
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{ResponseSet, ResponseSpec};

    fn route(path: &str, choice: &str, bodies: &[(&str, u32)]) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            response_set: ResponseSet {
                choice: choice.to_string(),
                responses: bodies
                    .iter()
                    .map(|(body, weight)| ResponseSpec {
                        weight: *weight,
                        body: body.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_compile_and_find() {
        let table = RouteTable {
            paths: vec![
                route("/a", "round-robin", &[("a1", 0), ("a2", 0)]),
                route("/b", "weight", &[("b", 1)]),
            ],
        };
        let router = Router::compile(table.clone()).unwrap();

        assert_eq!(router.len(), 2);
        assert_eq!(router.table(), &table);
        assert_eq!(router.find("/a").unwrap().strategy(), Strategy::RoundRobin);
        assert_eq!(router.find("/b").unwrap().strategy(), Strategy::Weighted);
        assert!(router.find("/c").is_none());
        // Exact match only
        assert!(router.find("/a/").is_none());
        assert!(router.find("/A").is_none());
    }

    #[test]
    fn test_duplicate_path_first_wins() {
        let table = RouteTable {
            paths: vec![
                route("/dup", "random", &[("first", 0)]),
                route("/dup", "random", &[("second", 0)]),
            ],
        };
        let router = Router::compile(table).unwrap();
        let balancer = Balancer::new();

        for _ in 0..20 {
            let picked = router.find("/dup").unwrap().pick(&balancer).unwrap();
            assert_eq!(picked.body, Bytes::from_static(b"first"));
        }
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let table = RouteTable {
            paths: vec![
                route("/ok", "random", &[("x", 0)]),
                route("/bad", "least-connections", &[("x", 0)]),
            ],
        };
        let err = Router::compile(table).unwrap_err();
        match err {
            ConfigError::InvalidRoute { path, source } => {
                assert_eq!(path, "/bad");
                assert_eq!(
                    source,
                    SelectError::UnknownStrategy("least-connections".to_string())
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let table = RouteTable {
            paths: vec![route("/empty", "round-robin", &[])],
        };
        assert!(matches!(
            Router::compile(table),
            Err(ConfigError::InvalidRoute {
                source: SelectError::EmptyCandidates,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let table = RouteTable {
            paths: vec![route("/w", "weight", &[("a", 0), ("b", 0)])],
        };
        assert!(matches!(
            Router::compile(table),
            Err(ConfigError::InvalidRoute {
                source: SelectError::ZeroTotalWeight,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut bad = route("/h", "random", &[("x", 0)]);
        bad.response_set.responses[0]
            .headers
            .insert("bad header".to_string(), "v".to_string());
        let table = RouteTable { paths: vec![bad] };
        assert!(matches!(
            Router::compile(table),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_prepared_response() {
        let mut r = route("/p", "random", &[("body", 0)]);
        r.response_set.responses[0].delay = 15;
        r.response_set.responses[0]
            .headers
            .insert("X-Stub".to_string(), "yes".to_string());
        let router = Router::compile(RouteTable { paths: vec![r] }).unwrap();

        let prepared = &router.find("/p").unwrap().candidates()[0];
        assert_eq!(prepared.delay, Duration::from_millis(15));
        assert_eq!(prepared.headers.get("x-stub").unwrap(), "yes");
        assert_eq!(prepared.body, Bytes::from_static(b"body"));
    }

    #[test]
    fn test_empty_router() {
        let router = Router::empty();
        assert!(router.is_empty());
        assert!(router.table().is_empty());
        assert!(!router.contains("/"));
    }
}

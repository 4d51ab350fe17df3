//! Route configuration.
//!
//! - `types`: the wire shapes (`RouteTable`, `RouteConfig`, `ResponseSet`,
//!   `ResponseSpec`) and `ConfigError`
//! - `router`: the validated `Router` snapshot used on the request path

mod router;
mod types;

pub use router::{CompiledRoute, PreparedResponse, Router};
pub use types::{ConfigError, ResponseSet, ResponseSpec, RouteConfig, RouteTable};

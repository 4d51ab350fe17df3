//! stubd: a configurable HTTP stub server.
//!
//! A managed endpoint answers requests on configured paths with scripted
//! responses picked by a per-route strategy. A separate control API reads and
//! replaces the route table and starts or stops the endpoint at runtime.

pub mod admin_api;
pub mod balancer;
pub mod control;
pub mod endpoint;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod settings;

pub use balancer::{Balancer, SelectError, Strategy};
pub use control::{ControlPlane, LifecycleError, StatusReport};
pub use endpoint::{build_endpoint, EndpointError, ManagedEndpoint};
pub use routes::{ConfigError, ResponseSet, ResponseSpec, RouteConfig, RouteTable};
pub use settings::{EndpointKind, ListenConfig, ProtocolVersion, Settings};

//! Control channel REST API.
//!
//! Routes under `/rest/api/v1/server`:
//! - `config`: GET, POST (replace) and DELETE (reset to empty) the route table
//! - `start` / `stop`: POST to flip the managed endpoint's running state
//! - `status`: GET running state, observed rate, latency and uptime
//!
//! Plus `/health` and `/metrics` at the root.

mod handlers;
mod router;
mod server;
mod types;

pub use router::route_request;
pub use server::ControlServer;
pub use types::{ErrorDetail, ErrorResponse};

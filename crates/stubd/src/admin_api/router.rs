//! Route dispatch logic for the control API.

use crate::admin_api::handlers::{config, lifecycle, system};
use crate::admin_api::types::{error_response, not_found};
use crate::control::ControlPlane;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

const SERVER_PREFIX: &str = "/rest/api/v1/server/";

/// Parsed route under `/rest/api/v1/server/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerRoute {
    Config,
    Start,
    Stop,
    Status,
}

impl ServerRoute {
    fn parse(segment: &str) -> Option<Self> {
        match segment.trim_end_matches('/') {
            "config" => Some(ServerRoute::Config),
            "start" => Some(ServerRoute::Start),
            "stop" => Some(ServerRoute::Stop),
            "status" => Some(ServerRoute::Status),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request<B>(
    req: Request<B>,
    plane: Arc<ControlPlane>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Control API: {} {}", method, path);

    match (&method, path.as_str()) {
        (&Method::GET, "/health") => return Ok(system::handle_health()),
        (&Method::GET, "/metrics") => return Ok(system::handle_metrics(&plane)),
        _ => {}
    }

    let Some(route) = path.strip_prefix(SERVER_PREFIX).and_then(ServerRoute::parse) else {
        return Ok(not_found());
    };

    let response = match (&method, route) {
        (&Method::GET, ServerRoute::Config) => config::handle_get(&plane),
        (&Method::POST, ServerRoute::Config) => config::handle_replace(req, &plane).await,
        (&Method::DELETE, ServerRoute::Config) => config::handle_delete(&plane),
        (&Method::POST, ServerRoute::Start) => lifecycle::handle_start(&plane),
        (&Method::POST, ServerRoute::Stop) => lifecycle::handle_stop(&plane),
        (&Method::GET, ServerRoute::Status) => lifecycle::handle_status(&plane),
        _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    };
    Ok(response)
}

//! Start, stop and status of the managed endpoint.

use crate::admin_api::types::*;
use crate::control::ControlPlane;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// POST /rest/api/v1/server/start
pub fn handle_start(plane: &ControlPlane) -> Response<Full<Bytes>> {
    match plane.start() {
        Ok(()) => text_response(StatusCode::OK, "Server started successfully"),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// POST /rest/api/v1/server/stop
pub fn handle_stop(plane: &ControlPlane) -> Response<Full<Bytes>> {
    match plane.stop() {
        Ok(()) => text_response(StatusCode::OK, "Server stopped successfully"),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// GET /rest/api/v1/server/status
pub fn handle_status(plane: &ControlPlane) -> Response<Full<Bytes>> {
    let status = plane.status();
    tracing::debug!(?status, "Managed server status");
    json_response(StatusCode::OK, &status)
}

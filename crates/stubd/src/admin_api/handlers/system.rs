//! System handlers: health and metrics.

use crate::admin_api::types::*;
use crate::control::ControlPlane;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /health
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /metrics - Prometheus text exposition of the managed endpoint
pub fn handle_metrics(plane: &ControlPlane) -> Response<Full<Bytes>> {
    build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        plane.metrics_text(),
    )
}

//! Route table handlers: GET, POST and DELETE `/rest/api/v1/server/config`.

use crate::admin_api::types::*;
use crate::control::ControlPlane;
use crate::routes::RouteTable;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::warn;

pub fn handle_get(plane: &ControlPlane) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &plane.get_config())
}

/// Replace the route table. Decode and validation errors are 400 and leave
/// the current table in place.
pub async fn handle_replace<B>(req: Request<B>, plane: &ControlPlane) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = match collect_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    let table = match RouteTable::from_json(&body) {
        Ok(table) => table,
        Err(e) => {
            warn!("Rejected route table: {}", e);
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    match plane.set_config(table) {
        Ok(()) => text_response(
            StatusCode::OK,
            "The configuration has been successfully applied",
        ),
        Err(e) => {
            warn!("Rejected route table: {}", e);
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

pub fn handle_delete(plane: &ControlPlane) -> Response<Full<Bytes>> {
    plane.reset_config();
    text_response(StatusCode::OK, "Configuration deleted successfully")
}

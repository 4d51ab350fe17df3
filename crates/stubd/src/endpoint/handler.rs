//! Request handling shared by all endpoint variants.

use super::core::EndpointCore;
use crate::metrics::outcome;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Answer one request on the managed endpoint.
///
/// The endpoint lock is held only for the gate checks and the snapshot clone;
/// the configured delay and the body write happen after it is released.
pub async fn handle_request<B>(
    req: Request<B>,
    core: Arc<EndpointCore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let received = Instant::now();

    let router = {
        let state = core.read_state();
        if !state.running {
            core.metrics().record_outcome(outcome::UNAVAILABLE);
            return Ok(plain(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"));
        }
        let listen = core.listen();
        if listen.enforce_protocol && !listen.protocol.accepts(req.version()) {
            debug!(
                version = ?req.version(),
                expected = %listen.protocol,
                "Rejecting request with unexpected protocol"
            );
            core.metrics().record_outcome(outcome::BAD_PROTOCOL);
            return Ok(plain(StatusCode::BAD_REQUEST, "Unsupported protocol version"));
        }
        core.anchor().mark();
        core.counter().record();
        Arc::clone(&state.router)
    };

    let path = req.uri().path();
    let Some(route) = router.find(path) else {
        core.metrics().record_outcome(outcome::NOT_FOUND);
        return Ok(plain(StatusCode::NOT_FOUND, "Not Found"));
    };

    let picked = match route.pick(core.balancer()) {
        Ok(picked) => picked,
        Err(e) => {
            error!(path, error = %e, "Response selection failed");
            core.metrics().record_outcome(outcome::ERROR);
            return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "Response selection failed"));
        }
    };

    if !picked.delay.is_zero() {
        tokio::time::sleep(picked.delay).await;
    }

    let mut response = Response::new(Full::new(picked.body.clone()));
    *response.headers_mut() = picked.headers.clone();

    core.metrics()
        .observe_delay_ms(picked.delay.as_millis().try_into().unwrap_or(u64::MAX));
    core.metrics().record_outcome(outcome::OK);
    core.counter().record_latency(received.elapsed());
    Ok(response)
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{ResponseSet, ResponseSpec, RouteConfig, RouteTable};
    use crate::settings::{ListenConfig, ProtocolVersion};
    use http_body_util::BodyExt;
    use hyper::Version;
    use std::collections::HashMap;

    fn core_with(protocol: ProtocolVersion, enforce: bool) -> Arc<EndpointCore> {
        let mut listen = ListenConfig::new("127.0.0.1:0".parse().unwrap()).with_protocol(protocol);
        listen.enforce_protocol = enforce;
        let core = EndpointCore::new(listen).unwrap();
        core.set_config(RouteTable {
            paths: vec![RouteConfig {
                path: "/ping".to_string(),
                response_set: ResponseSet {
                    choice: "round-robin".to_string(),
                    responses: vec![
                        ResponseSpec {
                            headers: HashMap::from([("x-stub".to_string(), "a".to_string())]),
                            body: "A".to_string(),
                            ..Default::default()
                        },
                        ResponseSpec {
                            delay: 20,
                            body: "B".to_string(),
                            ..Default::default()
                        },
                    ],
                },
            }],
        })
        .unwrap();
        Arc::new(core)
    }

    fn request(path: &str, version: Version) -> Request<()> {
        Request::builder().uri(path).version(version).body(()).unwrap()
    }

    async fn body_of(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_stopped_returns_503_without_counting() {
        let core = core_with(ProtocolVersion::Http11, true);
        let response = handle_request(request("/ping", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(core.counter().requests(), 0);
        assert!(core.started_at().is_none());
    }

    #[tokio::test]
    async fn test_round_robin_with_headers_and_delay() {
        let core = core_with(ProtocolVersion::Http11, true);
        core.set_running(true);

        let first = handle_request(request("/ping", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("x-stub").unwrap(), "a");
        assert_eq!(body_of(first).await, "A");

        let started = Instant::now();
        let second = handle_request(request("/ping", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert!(started.elapsed().as_millis() >= 20);
        assert!(second.headers().get("x-stub").is_none());
        assert_eq!(body_of(second).await, "B");

        assert_eq!(core.counter().requests(), 2);
        assert!(core.started_at().is_some());
        assert_eq!(core.metrics().outcome_count(outcome::OK), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_but_counted() {
        let core = core_with(ProtocolVersion::Http11, true);
        core.set_running(true);
        let response = handle_request(request("/missing", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(core.counter().requests(), 1);
    }

    #[tokio::test]
    async fn test_path_match_is_exact() {
        let core = core_with(ProtocolVersion::Http11, true);
        core.set_running(true);
        for path in ["/ping/", "/pin", "/ping/extra"] {
            let response = handle_request(request(path, Version::HTTP_11), Arc::clone(&core))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
        let response = handle_request(request("/ping?x=1", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protocol_mismatch_is_400() {
        let core = core_with(ProtocolVersion::Http10, true);
        core.set_running(true);
        let response = handle_request(request("/ping", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(core.counter().requests(), 0);

        let response = handle_request(request("/ping", Version::HTTP_10), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protocol_not_enforced() {
        let core = core_with(ProtocolVersion::Http10, false);
        core.set_running(true);
        let response = handle_request(request("/ping", Version::HTTP_11), Arc::clone(&core))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

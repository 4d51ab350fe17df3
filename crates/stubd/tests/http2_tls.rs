//! HTTP/2.0 endpoint served over TLS with ALPN negotiation.

mod common;

use common::*;
use reqwest::{Client, StatusCode, Version};
use std::time::Duration;
use stubd::settings::TlsConfig;
use stubd::{EndpointKind, ListenConfig, ProtocolVersion};

const CERT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/localhost.crt");
const KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/localhost.key");

async fn start_h2(kind: EndpointKind) -> (TestServer, String) {
    let mut listen = ListenConfig::new("127.0.0.1:0".parse().unwrap())
        .with_kind(kind)
        .with_protocol(ProtocolVersion::Http2);
    listen.tls = TlsConfig {
        cert_path: CERT.to_string(),
        key_path: KEY.to_string(),
    };
    listen.workers = 2;

    let server = TestServer::start_with(listen).await;
    server
        .post_config(&single_route("/ping", "random", &[("pong", 0)]))
        .await;
    server.control_post(START_PATH).await;

    let url = server.endpoint_url.replacen("http://", "https://", 1) + "/ping";
    (server, url)
}

fn tls_client() -> reqwest::ClientBuilder {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn test_h2_request_is_served() {
    for kind in [EndpointKind::Single, EndpointKind::Limited] {
        let (server, url) = start_h2(kind).await;
        let client = tls_client().build().unwrap();

        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.version(), Version::HTTP_2, "{kind}");
        assert_eq!(response.status(), StatusCode::OK, "{kind}");
        assert_eq!(response.text().await.unwrap(), "pong");

        server.stop().await;
    }
}

#[tokio::test]
async fn test_http1_over_tls_is_rejected() {
    let (server, url) = start_h2(EndpointKind::Single).await;
    let client = tls_client().http1_only().build().unwrap();

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.version(), Version::HTTP_11);
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn test_plain_http_is_refused_by_tls_endpoint() {
    let (server, url) = start_h2(EndpointKind::Single).await;
    let plain = url.replacen("https://", "http://", 1);
    let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();

    assert!(client.get(&plain).send().await.is_err());

    server.stop().await;
}

//! Connections that stop talking are closed so they cannot pin a slot.

mod common;

use common::*;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use stubd::{EndpointKind, ListenConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn limited_one_slot(timeout: Duration) -> ListenConfig {
    let mut listen = ListenConfig::new("127.0.0.1:0".parse().unwrap())
        .with_kind(EndpointKind::Limited)
        .with_timeouts(timeout, timeout);
    listen.max_connections = 1;
    listen
}

fn endpoint_addr(server: &TestServer) -> &str {
    server.endpoint_url.trim_start_matches("http://")
}

#[tokio::test]
async fn test_silent_connection_does_not_block_limited_endpoint() {
    let server = TestServer::start_with(limited_one_slot(Duration::from_millis(500))).await;
    server
        .post_config(&single_route("/ping", "random", &[("pong", 0)]))
        .await;
    server.control_post(START_PATH).await;

    let mut silent = TcpStream::connect(endpoint_addr(&server)).await.unwrap();
    let started = Instant::now();

    let (status, body) = server.hit("/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
    assert!(started.elapsed() >= Duration::from_millis(250));

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(5), silent.read(&mut buf))
        .await
        .expect("silent connection should be closed by the server");
    assert_eq!(read.unwrap(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_idle_keep_alive_connection_is_closed() {
    let server = TestServer::start_with(limited_one_slot(Duration::from_millis(400))).await;
    server
        .post_config(&single_route("/ping", "random", &[("pong", 0)]))
        .await;
    server.control_post(START_PATH).await;

    let mut stream = TcpStream::connect(endpoint_addr(&server)).await.unwrap();
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&received).ends_with("pong") {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("response")
            .unwrap();
        assert!(n > 0, "connection closed before the response");
        received.extend_from_slice(&buf[..n]);
    }
    assert!(String::from_utf8_lossy(&received).starts_with("HTTP/1.1 200"));

    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("idle connection should be closed by the server");
    assert_eq!(read.unwrap(), 0);

    let (status, _) = server.hit("/ping").await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
}

//! In-process harness: a control plane with its managed endpoint and control
//! API bound to ephemeral ports on 127.0.0.1.

#![allow(dead_code)]

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use stubd::admin_api::ControlServer;
use stubd::{build_endpoint, ControlPlane, EndpointKind, ListenConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const CONFIG_PATH: &str = "/rest/api/v1/server/config";
pub const START_PATH: &str = "/rest/api/v1/server/start";
pub const STOP_PATH: &str = "/rest/api/v1/server/stop";
pub const STATUS_PATH: &str = "/rest/api/v1/server/status";

pub struct TestServer {
    pub plane: Arc<ControlPlane>,
    pub client: Client,
    pub control_url: String,
    pub endpoint_url: String,
    shutdown: CancellationToken,
    control_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(kind: EndpointKind) -> Self {
        let mut listen = ListenConfig::new("127.0.0.1:0".parse().unwrap()).with_kind(kind);
        listen.workers = 2;
        listen.max_connections = 8;
        Self::start_with(listen).await
    }

    pub async fn start_with(listen: ListenConfig) -> Self {
        let endpoint = build_endpoint(listen).expect("build endpoint");
        let plane = Arc::new(ControlPlane::new(endpoint));
        let endpoint_addr = plane.launch().await.expect("launch managed endpoint");

        let control = ControlServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&plane))
            .await
            .expect("bind control API");
        let control_addr = control.local_addr().expect("control address");
        let shutdown = CancellationToken::new();
        let control_task = tokio::spawn(control.run(shutdown.clone()));

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("build client");

        Self {
            plane,
            client,
            control_url: format!("http://{control_addr}"),
            endpoint_url: format!("http://{endpoint_addr}"),
            shutdown,
            control_task,
        }
    }

    pub async fn post_config(&self, config: &Value) -> (StatusCode, String) {
        let response = self
            .client
            .post(format!("{}{CONFIG_PATH}", self.control_url))
            .json(config)
            .send()
            .await
            .expect("post config");
        let status = response.status();
        (status, response.text().await.unwrap_or_default())
    }

    pub async fn get_config(&self) -> Value {
        self.client
            .get(format!("{}{CONFIG_PATH}", self.control_url))
            .send()
            .await
            .expect("get config")
            .json()
            .await
            .expect("config json")
    }

    pub async fn control_post(&self, path: &str) -> StatusCode {
        self.client
            .post(format!("{}{path}", self.control_url))
            .send()
            .await
            .expect("control request")
            .status()
    }

    pub async fn status(&self) -> Value {
        self.client
            .get(format!("{}{STATUS_PATH}", self.control_url))
            .send()
            .await
            .expect("get status")
            .json()
            .await
            .expect("status json")
    }

    /// GET `path` on the managed endpoint, returning status and body
    pub async fn hit(&self, path: &str) -> (StatusCode, String) {
        let response = self
            .client
            .get(format!("{}{path}", self.endpoint_url))
            .send()
            .await
            .expect("endpoint request");
        let status = response.status();
        (status, response.text().await.unwrap_or_default())
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.plane.shutdown().await;
        let _ = self.control_task.await;
    }
}

/// One route with the given strategy and `(body, weight)` candidates
pub fn single_route(path: &str, choice: &str, responses: &[(&str, u32)]) -> Value {
    let responses: Vec<Value> = responses
        .iter()
        .map(|(body, weight)| json!({"weight": weight, "delay": 0, "headers": {}, "body": body}))
        .collect();
    json!({
        "paths": [
            {"path": path, "responseSet": {"choice": choice, "responses": responses}}
        ]
    })
}

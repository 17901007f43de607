//! Node-RED admin API client
//!
//! Talks to the runtime's admin HTTP endpoints: the partial-update endpoint,
//! the stock `/flows` reload endpoint, and the inject trigger.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DeployError, Result};
use crate::transport::{DeployTransport, PartialDeployRequest};

/// Header Node-RED reads to decide how much of the runtime to restart
pub const DEPLOYMENT_TYPE_HEADER: &str = "Node-RED-Deployment-Type";

/// HTTP client for a running Node-RED admin API
#[derive(Debug, Clone)]
pub struct AdminClient {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Base URL of the admin API, without trailing slash
    base_url: String,
}

impl AdminClient {
    /// Create a client with the default HTTP settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: normalize_base(base_url.into()),
        }
    }

    /// Create a client with a per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: normalize_base(base_url.into()),
        })
    }

    /// Base URL of the admin API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the runtime to reload only the nodes that changed in `flows`
    ///
    /// This is what the partial-update endpoint does after merging.
    pub async fn reload_changed_nodes(&self, flows: &Value) -> Result<()> {
        self.post_flows(flows, "nodes").await
    }

    /// Fire an inject node by id, returning the response body
    pub async fn trigger_inject(&self, inject_id: &str) -> Result<String> {
        let url = self.url(&format!("/inject/{}", inject_id));
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| DeployError::Transport {
                url: url.clone(),
                source,
            })?;
        check_status(url, response).await
    }

    async fn post_flows(&self, flows: &Value, deployment_type: &str) -> Result<()> {
        let url = self.url("/flows");
        let response = self
            .http_client
            .post(&url)
            .header(DEPLOYMENT_TYPE_HEADER, deployment_type)
            .json(flows)
            .send()
            .await
            .map_err(|source| DeployError::Transport {
                url: url.clone(),
                source,
            })?;
        check_status(url, response).await.map(|_| ())
    }
}

#[async_trait]
impl DeployTransport for AdminClient {
    async fn deploy_partial(&self, request: &PartialDeployRequest) -> Result<()> {
        let url = self.url("/flows/partial");
        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| DeployError::Transport {
                url: url.clone(),
                source,
            })?;
        check_status(url, response).await.map(|_| ())
    }

    async fn deploy_full(&self, flows: &Value) -> Result<()> {
        self.post_flows(flows, "reload").await
    }
}

fn normalize_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

async fn check_status(url: String, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_success() {
        Ok(body)
    } else {
        Err(DeployError::Status {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use flow_model::FlowRecord;
    use serde_json::json;

    type Seen = Arc<Mutex<Vec<String>>>;

    async fn spawn_admin(partial_status: StatusCode) -> (SocketAddr, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/flows/partial",
                post(move |State(seen): State<Seen>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(format!("partial:{}", body["nodes"][0]["id"]));
                    partial_status
                }),
            )
            .route(
                "/flows",
                post(|State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let kind = headers
                        .get(DEPLOYMENT_TYPE_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    let count = body.as_array().map(Vec::len).unwrap_or(0);
                    seen.lock().unwrap().push(format!("flows:{}:{}", kind, count));
                    StatusCode::OK
                }),
            )
            .route(
                "/inject/:id",
                post(|Path(id): Path<String>| async move {
                    if id == "i1" {
                        (StatusCode::OK, "OK".to_string())
                    } else {
                        (StatusCode::NOT_FOUND, "Not Found".to_string())
                    }
                }),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, seen)
    }

    fn request() -> PartialDeployRequest {
        let node = FlowRecord::from_value(json!({"id": "f1", "type": "function"})).unwrap();
        PartialDeployRequest::new(&[node], None)
    }

    #[test]
    fn test_base_url_normalized() {
        let client = AdminClient::new("http://localhost:1880//");
        assert_eq!(client.base_url(), "http://localhost:1880");
        assert_eq!(client.url("/flows"), "http://localhost:1880/flows");
    }

    #[tokio::test]
    async fn test_partial_accepts_no_content() {
        let (addr, seen) = spawn_admin(StatusCode::NO_CONTENT).await;
        let client = AdminClient::new(format!("http://{}", addr));
        client.deploy_partial(&request()).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["partial:\"f1\""]);
    }

    #[tokio::test]
    async fn test_partial_error_status() {
        let (addr, _) = spawn_admin(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = AdminClient::new(format!("http://{}", addr));
        let err = client.deploy_partial(&request()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_full_and_node_reload_headers() {
        let (addr, seen) = spawn_admin(StatusCode::NO_CONTENT).await;
        let client = AdminClient::new(format!("http://{}", addr));
        let flows = json!([{"id": "a"}, {"id": "b"}]);
        client.deploy_full(&flows).await.unwrap();
        client.reload_changed_nodes(&flows).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["flows:reload:2", "flows:nodes:2"]);
    }

    #[tokio::test]
    async fn test_trigger_inject() {
        let (addr, _) = spawn_admin(StatusCode::NO_CONTENT).await;
        let client = AdminClient::new(format!("http://{}", addr));
        assert_eq!(client.trigger_inject("i1").await.unwrap(), "OK");
        assert_eq!(client.trigger_inject("nope").await.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AdminClient::new(format!("http://{}", addr));
        let err = client.deploy_full(&json!([])).await.unwrap_err();
        assert!(matches!(err, DeployError::Transport { .. }));
    }
}

//! Transport abstraction for the HTTP tiers

use async_trait::async_trait;
use flow_model::FlowRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Body of a partial deploy request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDeployRequest {
    /// Full records to merge into the live flow file
    pub nodes: Vec<FlowRecord>,
    /// Flow file the runtime should merge into (runtime default when absent)
    #[serde(default)]
    pub flows_file: Option<String>,
    /// Which ids the runtime should reload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployScope>,
}

/// Reload scope sent along with a partial deploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployScope {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub nodes: Vec<String>,
}

impl PartialDeployRequest {
    /// Build a request for the given records
    pub fn new(nodes: &[FlowRecord], flows_file: Option<String>) -> Self {
        let ids = nodes.iter().map(|n| n.id().to_string()).collect();
        Self {
            nodes: nodes.to_vec(),
            flows_file,
            deploy: Some(DeployScope {
                scope_type: "nodes".to_string(),
                nodes: ids,
            }),
        }
    }

    /// Ids of the records in this request
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(FlowRecord::id).collect()
    }
}

/// The HTTP side of deployment
///
/// Implemented by [`AdminClient`](crate::AdminClient) against a live
/// runtime; tests substitute scripted fakes.
#[async_trait]
pub trait DeployTransport: Send + Sync {
    /// Post changed records to the partial-update endpoint
    async fn deploy_partial(&self, request: &PartialDeployRequest) -> Result<()>;

    /// Post the entire flow document for a full reload
    async fn deploy_full(&self, flows: &Value) -> Result<()>;
}

//! Partial deploys merged in this process
//!
//! Stock Node-RED has no partial-update endpoint. [`MergingTransport`]
//! merges the changed records into the flow file itself and then asks the
//! runtime to reload only those nodes through the stock `/flows` endpoint.

use async_trait::async_trait;
use flow_deploy::{AdminClient, DeployError, DeployTransport, PartialDeployRequest};
use flow_model::FlowDocument;
use serde_json::Value;

use crate::engine::SyncPaths;
use crate::error::{Result, SyncError};
use crate::files;

/// Merge posted records into a flow file by id and write it back.
///
/// The target is the request's `flowsFile` (resolved against the user
/// directory) or the configured flow file. Returns `None` without
/// touching anything when the request has no nodes. Callers hold the
/// sync guard.
pub async fn merge_into_flows_file(
    paths: &SyncPaths,
    request: &PartialDeployRequest,
) -> Result<Option<FlowDocument>> {
    if request.nodes.is_empty() {
        log::debug!("Partial deploy with no nodes");
        return Ok(None);
    }

    let path = match request.flows_file.as_deref() {
        Some(name) if !name.is_empty() => paths.resolve_flows_file(name),
        _ => paths.flows_file.clone(),
    };
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| SyncError::io(&path, e))?;
    let mut document = FlowDocument::parse(&raw)?;

    let replaced = document.merge_records(&request.nodes);
    log::info!(
        "Merged {} of {} node(s) into {}",
        replaced,
        request.nodes.len(),
        path.display()
    );

    files::write(&path, document.to_bytes()?).await?;
    Ok(Some(document))
}

/// Partial tier that merges locally and reloads the changed nodes
///
/// Full deploys go straight to the admin API.
pub struct MergingTransport {
    admin: AdminClient,
    paths: SyncPaths,
}

impl MergingTransport {
    pub fn new(admin: AdminClient, paths: SyncPaths) -> Self {
        Self { admin, paths }
    }
}

#[async_trait]
impl DeployTransport for MergingTransport {
    async fn deploy_partial(&self, request: &PartialDeployRequest) -> flow_deploy::Result<()> {
        let merged = merge_into_flows_file(&self.paths, request)
            .await
            .map_err(|e| DeployError::Merge(e.to_string()))?;
        match merged {
            Some(document) => self.admin.reload_changed_nodes(&document.to_value()).await,
            None => Ok(()),
        }
    }

    async fn deploy_full(&self, flows: &Value) -> flow_deploy::Result<()> {
        self.admin.deploy_full(flows).await
    }
}

//! Local HTTP API for the editor
//!
//! Thin axum handlers over [`SyncEngine`]. Every error is answered as
//! `{"error": message}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use flow_deploy::{AdminClient, DeployReport, PartialDeployRequest};
use flow_model::{DebugSummary, FlowSummary, InjectSummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sync_engine::{CollectMode, FileTree, SyncEngine};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

/// Shared state for the handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub admin: AdminClient,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/file/:filename", get(read_file).post(save_file))
        .route("/api/file/:filename/deploy", post(save_and_deploy))
        .route("/api/pull-functions", post(pull_functions))
        .route("/api/refresh", post(pull_functions))
        .route("/api/collect-changes", post(collect_changes))
        .route("/api/inject-nodes/:id", get(inject_nodes))
        .route("/api/debug-nodes/:id", get(debug_nodes))
        .route("/api/trigger-inject/:id", post(trigger_inject))
        .route("/api/debug/flows", get(debug_flows))
        .route("/flows/partial", post(partial_deploy))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct FileContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deploy: Option<DeployReport>,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            files: None,
            changed_ids: None,
            deploy: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InjectNodesResponse {
    function_node_id: String,
    inject_nodes: Vec<InjectSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugNodesResponse {
    function_node_id: String,
    debug_nodes: Vec<DebugSummary>,
}

fn check_file_name(filename: &str) -> ApiResult<()> {
    if sync_engine::files::is_safe_file_name(filename) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Invalid file name: {}", filename)))
    }
}

// --- Handlers ---

async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileTree>> {
    Ok(Json(state.engine.file_tree().await?))
}

async fn read_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
    check_file_name(&filename)?;
    match state.engine.read_file(&filename).await? {
        Some(content) => Ok(Json(json!({ "content": content }))),
        None => Err(ApiError::not_found("File not found")),
    }
}

async fn save_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(body): Json<FileContent>,
) -> ApiResult<Json<ActionResponse>> {
    check_file_name(&filename)?;
    state.engine.save_file(&filename, &body.content).await?;
    Ok(Json(ActionResponse::ok("File saved (not deployed)")))
}

async fn save_and_deploy(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(body): Json<FileContent>,
) -> ApiResult<Json<ActionResponse>> {
    check_file_name(&filename)?;
    state.engine.save_file(&filename, &body.content).await?;

    let deploy = state.engine.deploy_single_file(&filename).await?;
    let message = match &deploy {
        Some(report) if report.succeeded => "File saved and deployed",
        Some(report) if report.reload_requested() => {
            "File saved, runtime reload requested but not confirmed"
        }
        Some(_) => "File saved, deployment failed",
        None => "File saved, no matching node to deploy",
    };
    Ok(Json(ActionResponse {
        deploy,
        ..ActionResponse::ok(message)
    }))
}

async fn pull_functions(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    let files = state.engine.extract_from_flows().await?;
    Ok(Json(ActionResponse {
        files: Some(files),
        ..ActionResponse::ok("Functions extracted successfully")
    }))
}

async fn collect_changes(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    log::info!("Manually collecting changes from files");
    let report = state.engine.collect_changes(CollectMode::Verbose).await?;
    let message = match &report.deploy {
        None => "No changes to collect",
        Some(deploy) if deploy.succeeded => "Changes collected and deployed",
        Some(deploy) if deploy.reload_requested() => {
            "Changes collected, runtime reload requested but not confirmed"
        }
        Some(_) => "Changes collected, deployment failed",
    };
    Ok(Json(ActionResponse {
        changed_ids: Some(report.changed_ids),
        deploy: report.deploy,
        ..ActionResponse::ok(message)
    }))
}

async fn inject_nodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InjectNodesResponse>> {
    let inject_nodes = state.engine.connected_injects(&id).await?;
    Ok(Json(InjectNodesResponse {
        function_node_id: id,
        inject_nodes,
    }))
}

async fn debug_nodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DebugNodesResponse>> {
    let debug_nodes = state.engine.connected_debugs(&id).await?;
    Ok(Json(DebugNodesResponse {
        function_node_id: id,
        debug_nodes,
    }))
}

async fn trigger_inject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    state.admin.trigger_inject(&id).await?;
    log::info!("Triggered inject node {}", id);
    Ok(Json(ActionResponse::ok("Inject node triggered successfully")))
}

async fn debug_flows(State(state): State<AppState>) -> ApiResult<Json<FlowSummary>> {
    state
        .engine
        .flow_summary()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Flows file not found"))
}

/// Merge posted nodes into the flow file and ask the runtime to reload them
async fn partial_deploy(
    State(state): State<AppState>,
    Json(request): Json<PartialDeployRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(document) = state.engine.merge_partial(&request).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };

    state
        .admin
        .reload_changed_nodes(&document.to_value())
        .await
        .map_err(|e| ApiError::internal(format!("Flow reload failed: {}", e)))?;
    log::info!("Flows reloaded after partial deploy");
    Ok(StatusCode::NO_CONTENT)
}

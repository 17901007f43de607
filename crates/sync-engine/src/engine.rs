//! The sync engine
//!
//! Composes extraction, collection and deployment around one flow file and
//! one files directory, and owns the [`SyncGuard`] that keeps the watchers
//! from reacting to the engine's own writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use flow_deploy::{DeployReport, PartialDeployRequest, SharedDispatcher};
use flow_model::{DebugSummary, EditableKind, FlowDocument, FlowSummary, InjectSummary};
use serde::Serialize;

use crate::collect::collect_document;
use crate::error::{Result, SyncError};
use crate::events::{EventSink, SyncEvent};
use crate::extract::extract_document;
use crate::files;
use crate::guard::SyncGuard;
use crate::listing::{build_tree, list_files, FileTree};
use crate::local_deploy::merge_into_flows_file;
use crate::watch::WatchHandler;

/// Filesystem locations the engine works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    /// Node-RED user directory, base for relative flow file names
    pub user_dir: PathBuf,
    /// The flow storage file
    pub flows_file: PathBuf,
    /// Directory holding the extracted files
    pub functions_dir: PathBuf,
}

impl SyncPaths {
    /// Resolve a flow file name the way the runtime does
    pub fn resolve_flows_file(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.user_dir.join(path)
        }
    }
}

/// How loudly a collection reports what it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// Each updated node is logged at info level (user-triggered)
    Verbose,
    /// Updates are logged at debug level (watch-triggered)
    Silent,
}

/// Outcome of [`SyncEngine::collect_changes`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectReport {
    /// Ids of the records that were updated from files
    pub changed_ids: Vec<String>,
    /// Deployment outcome, when anything changed
    pub deploy: Option<DeployReport>,
}

impl CollectReport {
    pub fn changed(&self) -> bool {
        !self.changed_ids.is_empty()
    }
}

/// Bidirectional sync between a flow file and a files directory
pub struct SyncEngine {
    paths: SyncPaths,
    guard: SyncGuard,
    dispatcher: SharedDispatcher,
    events: Arc<dyn EventSink>,
}

impl SyncEngine {
    pub fn new(paths: SyncPaths, dispatcher: SharedDispatcher, events: Arc<dyn EventSink>) -> Self {
        Self {
            paths,
            guard: SyncGuard::new(),
            dispatcher,
            events,
        }
    }

    pub fn paths(&self) -> &SyncPaths {
        &self.paths
    }

    /// Handle to the guard, shared with the watch coordinator
    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    /// Read and parse the flow file, `None` when it does not exist
    pub async fn load_document(&self) -> Result<Option<FlowDocument>> {
        let Some(raw) = files::read_optional(&self.paths.flows_file).await? else {
            return Ok(None);
        };
        Ok(Some(FlowDocument::parse(&raw)?))
    }

    async fn write_document(&self, path: &Path, document: &FlowDocument) -> Result<()> {
        files::write(path, document.to_bytes()?).await
    }

    /// Write every editable record of the flow file into the files directory
    pub async fn extract_from_flows(&self) -> Result<Vec<String>> {
        let Some(document) = self.load_document().await? else {
            log::warn!("Flows file not found: {}", self.paths.flows_file.display());
            return Ok(Vec::new());
        };

        let written = {
            let _scope = self.guard.hold();
            extract_document(&document, &self.paths.functions_dir).await?
        };

        log::info!(
            "Extracted {} file(s) to {}",
            written.len(),
            self.paths.functions_dir.display()
        );
        self.emit(SyncEvent::FilesExtracted {
            files: written.clone(),
        });
        Ok(written)
    }

    /// Fold file edits into the flow file and deploy what changed
    pub async fn collect_changes(&self, mode: CollectMode) -> Result<CollectReport> {
        let Some(document) = self.load_document().await? else {
            log::warn!("Flows file not found: {}", self.paths.flows_file.display());
            return Ok(CollectReport::default());
        };

        let collected = collect_document(&document, &self.paths.functions_dir).await?;
        if !collected.changed {
            log::debug!("No changes to collect");
            return Ok(CollectReport::default());
        }

        for record in &collected.changed_records {
            match mode {
                CollectMode::Verbose => log::info!("Updated node {}", record.display_name()),
                CollectMode::Silent => log::debug!("Updated node {}", record.display_name()),
            }
        }

        let _scope = self.guard.hold();
        self.write_document(&self.paths.flows_file, &collected.document)
            .await?;
        let deploy = self
            .dispatcher
            .deploy(&collected.changed_records, &collected.document)
            .await;

        Ok(CollectReport {
            changed_ids: collected.changed_ids(),
            deploy: Some(deploy),
        })
    }

    /// Update and deploy the single record behind `filename`
    ///
    /// Returns `None` when the record or the file does not exist.
    pub async fn deploy_single_file(&self, filename: &str) -> Result<Option<DeployReport>> {
        let id = self.record_id(filename)?;
        let Some(mut document) = self.load_document().await? else {
            log::warn!("Flows file not found: {}", self.paths.flows_file.display());
            return Ok(None);
        };

        let field = match document.find_by_id(id) {
            Some(record) if record.file_name().as_deref() == Some(filename) => {
                record.surfaced_field()
            }
            _ => None,
        };
        let Some(field) = field else {
            log::warn!("Node not found for file: {}", filename);
            return Ok(None);
        };

        let Some(content) = self.read_file(filename).await? else {
            log::warn!("File not found: {}", filename);
            return Ok(None);
        };

        let Some(record) = document.find_by_id_mut(id) else {
            return Ok(None);
        };
        record.set_str_field(field, content);
        let record = record.clone();
        log::info!("Deploying single node {}", record.display_name());

        let _scope = self.guard.hold();
        self.write_document(&self.paths.flows_file, &document).await?;
        Ok(Some(self.dispatcher.deploy(&[record], &document).await))
    }

    /// Content of an extracted file, `None` if missing
    pub async fn read_file(&self, filename: &str) -> Result<Option<String>> {
        let path = self.file_path(filename)?;
        files::read_text_optional(&path).await
    }

    /// Save an extracted file without deploying
    pub async fn save_file(&self, filename: &str, content: &str) -> Result<()> {
        let path = self.file_path(filename)?;
        files::ensure_dir(&self.paths.functions_dir).await?;
        files::write(&path, content).await?;
        log::info!("File saved: {}", filename);

        self.emit(SyncEvent::FileUpdated {
            filename: filename.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    /// Files directory grouped by flow structure
    pub async fn file_tree(&self) -> Result<FileTree> {
        let files = list_files(&self.paths.functions_dir).await?;
        match self.load_document().await? {
            Some(document) => Ok(build_tree(&document, files)),
            None => Ok(FileTree {
                orphaned_files: files,
                ..FileTree::default()
            }),
        }
    }

    /// Inject nodes wired into a function
    pub async fn connected_injects(&self, function_id: &str) -> Result<Vec<InjectSummary>> {
        Ok(self
            .load_document()
            .await?
            .map(|doc| doc.connected_injects(function_id))
            .unwrap_or_default())
    }

    /// Debug nodes a function wires into
    pub async fn connected_debugs(&self, function_id: &str) -> Result<Vec<DebugSummary>> {
        Ok(self
            .load_document()
            .await?
            .map(|doc| doc.connected_debugs(function_id))
            .unwrap_or_default())
    }

    /// Structural summary of the flow file, `None` if it does not exist
    pub async fn flow_summary(&self) -> Result<Option<FlowSummary>> {
        Ok(self.load_document().await?.map(|doc| doc.summary()))
    }

    /// Merge posted records into a flow file by id and write it back.
    ///
    /// The target is the request's `flowsFile` (resolved against the user
    /// directory) or the configured flow file. Returns `None` without
    /// touching anything when the request has no nodes.
    pub async fn merge_partial(&self, request: &PartialDeployRequest) -> Result<Option<FlowDocument>> {
        let _scope = self.guard.hold();
        merge_into_flows_file(&self.paths, request).await
    }

    fn record_id<'a>(&self, filename: &'a str) -> Result<&'a str> {
        if !files::is_safe_file_name(filename) {
            return Err(SyncError::InvalidFileName(filename.to_string()));
        }
        EditableKind::from_file_name(filename)
            .map(|(id, _)| id)
            .ok_or_else(|| SyncError::InvalidFileName(filename.to_string()))
    }

    fn file_path(&self, filename: &str) -> Result<PathBuf> {
        self.record_id(filename)?;
        Ok(self.paths.functions_dir.join(filename))
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.events.send(event) {
            log::debug!("Sync event not delivered: {}", e);
        }
    }
}

#[async_trait]
impl WatchHandler for SyncEngine {
    async fn on_flow_changed(&self) {
        log::info!("Flows file changed, re-extracting");
        if let Err(e) = self.extract_from_flows().await {
            log::error!("Extraction after flows change failed: {}", e);
        }
    }

    async fn on_files_changed(&self) {
        log::debug!("Files changed, collecting");
        if let Err(e) = self.collect_changes(CollectMode::Silent).await {
            log::error!("Collection after file change failed: {}", e);
        }
    }
}

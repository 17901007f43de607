//! File tree for the editor sidebar
//!
//! Groups extracted files under the tab or subflow that owns their record.
//! Tracked files with no matching record are listed as orphans.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use flow_model::{EditableKind, FlowDocument, RecordKind};
use serde::Serialize;

use crate::error::{Result, SyncError};

/// Id and name of the synthetic group for records without a known owner
pub const GLOBAL_GROUP_ID: &str = "global";
const GLOBAL_GROUP_NAME: &str = "Global";

/// A tracked file in the files directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// One editable record as listed in the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    /// Node name, or its id when unnamed
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub filename: String,
    pub flow_id: Option<String>,
}

/// Whether a group is a tab or a subflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Flow,
    Subflow,
}

/// A tab or subflow with the editable records it owns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGroup {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    pub nodes: Vec<TreeNode>,
}

/// The full listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTree {
    pub flows: Vec<FlowGroup>,
    pub subflows: Vec<FlowGroup>,
    pub orphaned_files: Vec<FileEntry>,
}

/// List the tracked files in `dir`, sorted by name.
///
/// A missing directory lists as empty.
pub async fn list_files(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SyncError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(item) = read_dir.next_entry().await.map_err(|e| SyncError::io(dir, e))? {
        let name = item.file_name().to_string_lossy().into_owned();
        if !EditableKind::is_tracked(&name) {
            continue;
        }
        let path = item.path();
        let metadata = item.metadata().await.map_err(|e| SyncError::io(&path, e))?;
        if !metadata.is_file() {
            continue;
        }
        files.push(FileEntry {
            name,
            path: path.to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Group `files` by the flow structure of `document`
pub fn build_tree(document: &FlowDocument, files: Vec<FileEntry>) -> FileTree {
    let mut flows: Vec<FlowGroup> = Vec::new();
    let mut subflows: Vec<FlowGroup> = Vec::new();
    for record in document.records() {
        let kind = match record.kind() {
            RecordKind::Tab => GroupKind::Flow,
            RecordKind::Subflow => GroupKind::Subflow,
            _ => continue,
        };
        let name = match kind {
            GroupKind::Flow => record
                .label()
                .or_else(|| record.name())
                .unwrap_or("Unnamed Flow"),
            GroupKind::Subflow => record.name().unwrap_or("Unnamed Subflow"),
        };
        let group = FlowGroup {
            id: record.id().to_string(),
            name: name.to_string(),
            kind,
            nodes: Vec::new(),
        };
        match kind {
            GroupKind::Flow => flows.push(group),
            GroupKind::Subflow => subflows.push(group),
        }
    }

    let mut global = FlowGroup {
        id: GLOBAL_GROUP_ID.to_string(),
        name: GLOBAL_GROUP_NAME.to_string(),
        kind: GroupKind::Flow,
        nodes: Vec::new(),
    };
    let mut mapped = HashSet::new();

    for record in document.editable_records() {
        let Some(filename) = record.file_name() else {
            continue;
        };
        let owner = document.parent_of(record.id()).map(str::to_string);
        let node = TreeNode {
            id: record.id().to_string(),
            name: record.display_name().to_string(),
            node_type: record.node_type().to_string(),
            filename: filename.clone(),
            flow_id: owner.clone(),
        };
        mapped.insert(filename);

        let group = owner.as_deref().and_then(|owner| {
            flows
                .iter_mut()
                .chain(subflows.iter_mut())
                .find(|g| g.id == owner)
        });
        match group {
            Some(group) => group.nodes.push(node),
            None => global.nodes.push(node),
        }
    }

    flows.push(global);
    let orphaned_files = files
        .into_iter()
        .filter(|f| !mapped.contains(&f.name))
        .collect();

    FileTree {
        flows: finish_groups(flows),
        subflows: finish_groups(subflows),
        orphaned_files,
    }
}

fn finish_groups(groups: Vec<FlowGroup>) -> Vec<FlowGroup> {
    let mut groups: Vec<FlowGroup> = groups
        .into_iter()
        .filter(|g| !g.nodes.is_empty())
        .map(|mut g| {
            g.nodes.sort_by(|a, b| a.name.cmp(&b.name));
            g
        })
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}

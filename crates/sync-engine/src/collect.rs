//! Collection: files → flow document
//!
//! Compares each editable record's surfaced field with its file on disk and
//! copies differing file content into a working copy of the document. The
//! caller decides whether to persist and deploy the result.

use std::path::Path;

use flow_model::{FlowDocument, FlowRecord};

use crate::error::{Result, SyncError};
use crate::files;

/// Result of collecting a files directory into a document
#[derive(Debug, Clone)]
pub struct Collected {
    /// The updated working copy
    pub document: FlowDocument,
    /// Updated records, in document order
    pub changed_records: Vec<FlowRecord>,
    /// Whether any record changed
    pub changed: bool,
}

impl Collected {
    /// Ids of the changed records
    pub fn changed_ids(&self) -> Vec<String> {
        self.changed_records
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }
}

/// Fold file edits in `source_dir` into a copy of `document`.
///
/// Missing files and files that are not valid UTF-8 leave their record
/// untouched. Any other read failure aborts and the working copy is
/// discarded.
pub async fn collect_document(document: &FlowDocument, source_dir: &Path) -> Result<Collected> {
    let mut working = document.clone();
    let mut changed_records = Vec::new();

    for record in working.records_mut() {
        let (Some(file_name), Some(field)) = (record.file_name(), record.surfaced_field()) else {
            continue;
        };
        if !files::is_safe_file_name(&file_name) {
            continue;
        }

        let content = match files::read_text_optional(&source_dir.join(&file_name)).await {
            Ok(Some(content)) => content,
            Ok(None) => continue,
            Err(SyncError::NotUtf8 { path }) => {
                log::warn!("Skipping {}: not valid UTF-8", path.display());
                continue;
            }
            Err(e) => return Err(e),
        };
        if record.str_field(field).unwrap_or("") == content {
            continue;
        }

        record.set_str_field(field, content);
        changed_records.push(record.clone());
    }

    let changed = !changed_records.is_empty();
    Ok(Collected {
        document: working,
        changed_records,
        changed,
    })
}

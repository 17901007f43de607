//! Extraction: flow document → files
//!
//! Every function and template record is written to `{id}.js` or
//! `{id}.vue` in the target directory. Existing files are overwritten
//! without comparison.

use std::path::Path;

use flow_model::{EditableKind, FlowDocument};

use crate::error::Result;
use crate::files;

/// Write every editable record of `document` into `target_dir`.
///
/// Returns the names of the files written, in document order. The file
/// content is the record's surfaced field, so a function whose `func` is
/// only comments is extracted from its `initialize` code instead.
pub async fn extract_document(document: &FlowDocument, target_dir: &Path) -> Result<Vec<String>> {
    files::ensure_dir(target_dir).await?;

    let mut written = Vec::new();
    for record in document.editable_records() {
        let (Some(kind), Some(content)) = (record.editable_kind(), record.surfaced_content()) else {
            continue;
        };
        if kind == EditableKind::Template && content.is_empty() {
            log::debug!("Skipping template {} with no markup", record.id());
            continue;
        }

        let file_name = kind.file_name(record.id());
        if !files::is_safe_file_name(&file_name) {
            log::warn!("Skipping node with unusable id '{}'", record.id());
            continue;
        }

        files::write(&target_dir.join(&file_name), content).await?;
        log::debug!("Extracted {} ({})", file_name, record.display_name());
        written.push(file_name);
    }

    Ok(written)
}

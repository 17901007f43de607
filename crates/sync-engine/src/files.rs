//! Filesystem helpers shared by extraction, collection and the engine

use std::path::Path;

use crate::error::{Result, SyncError};

/// Whether `name` is a plain file name that stays inside its directory
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Read a file, mapping "does not exist" to `None`
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

/// Read a code file as text, mapping "does not exist" to `None`
///
/// Content that is not valid UTF-8 is an error rather than being decoded
/// lossily, so it is never written back altered.
pub async fn read_text_optional(path: &Path) -> Result<Option<String>> {
    let Some(bytes) = read_optional(path).await? else {
        return Ok(None);
    };
    String::from_utf8(bytes).map(Some).map_err(|_| SyncError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

/// Overwrite a file
pub async fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| SyncError::io(path, e))
}

/// Create a directory and its parents
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| SyncError::io(path, e))
}

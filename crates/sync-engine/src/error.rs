//! Error types for the sync engine

use std::io;
use std::path::{Path, PathBuf};

use flow_model::FlowError;
use thiserror::Error;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that abort a sync operation
#[derive(Debug, Error)]
pub enum SyncError {
    /// The flow file could not be parsed or serialized
    #[error("Flow document error: {0}")]
    Parse(#[from] FlowError),

    /// A file that had to exist was missing
    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The process may not read or write a path
    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// Any other filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A code file whose content is not valid UTF-8
    #[error("Not valid UTF-8: {}", path.display())]
    NotUtf8 { path: PathBuf },

    /// A file name that is not a plain `{id}.js` / `{id}.vue` name
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// A filesystem watcher could not be registered
    #[error("Watch error: {0}")]
    Watch(String),
}

impl SyncError {
    /// Classify an I/O error by kind, attaching the offending path
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<notify::Error> for SyncError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let missing = SyncError::io("a.js", io::Error::from(io::ErrorKind::NotFound));
        assert!(missing.is_not_found());

        let denied = SyncError::io("a.js", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, SyncError::PermissionDenied { .. }));

        let other = SyncError::io("a.js", io::Error::other("disk on fire"));
        assert!(matches!(other, SyncError::Io { .. }));
        assert!(other.to_string().contains("a.js"));
    }

    #[test]
    fn test_not_utf8_names_path() {
        let err = SyncError::NotUtf8 {
            path: PathBuf::from("functions/f1.js"),
        };
        assert_eq!(err.to_string(), "Not valid UTF-8: functions/f1.js");
    }
}

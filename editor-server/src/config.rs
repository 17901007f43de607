//! Editor configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! values in [`crate::constants`]. Command line flags are applied on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use flow_deploy::DeployMethod;
use serde::{Deserialize, Serialize};
use sync_engine::{SyncPaths, WatchSettings};
use tokio::fs;

use crate::constants::{hosts, paths, ports, timeouts};

/// Full editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Node-RED user directory
    pub user_dir: PathBuf,
    /// Flow file, relative paths resolved against `user_dir`
    pub flows_file: String,
    /// Where code files are extracted to
    pub functions_dir: PathBuf,
    /// Host the editor API binds to
    pub host: String,
    /// Port the editor API listens on
    pub port: u16,
    /// Whether to watch the flow file and the files directory
    pub watch_enabled: bool,
    /// Starting deployment strategy
    pub deploy_method: DeployMethod,
    /// Base URL of the Node-RED admin API
    pub admin_url: String,
    /// Post partial deploys to the runtime's own `/flows/partial` endpoint
    /// instead of merging into the flow file here
    pub remote_partial: bool,
    pub flow_debounce_ms: u64,
    pub files_debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            user_dir: default_user_dir(),
            flows_file: paths::FLOWS_FILE.to_string(),
            functions_dir: PathBuf::from(paths::FUNCTIONS_DIR),
            host: hosts::LOCAL.to_string(),
            port: ports::EDITOR,
            watch_enabled: true,
            deploy_method: DeployMethod::default(),
            admin_url: hosts::ADMIN_URL.to_string(),
            remote_partial: false,
            flow_debounce_ms: timeouts::FLOW_DEBOUNCE_MS,
            files_debounce_ms: timeouts::FILES_DEBOUNCE_MS,
            request_timeout_secs: timeouts::REQUEST_SECS,
        }
    }
}

fn default_user_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(paths::USER_DIR))
        .unwrap_or_else(|| PathBuf::from(paths::USER_DIR))
}

impl EditorConfig {
    /// Load configuration from `path`, defaults when the file does not exist
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        let config = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        log::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Absolute location of the flow file
    pub fn flows_path(&self) -> PathBuf {
        self.sync_paths().flows_file
    }

    pub fn sync_paths(&self) -> SyncPaths {
        let mut paths = SyncPaths {
            user_dir: self.user_dir.clone(),
            flows_file: PathBuf::new(),
            functions_dir: self.functions_dir.clone(),
        };
        paths.flows_file = paths.resolve_flows_file(&self.flows_file);
        paths
    }

    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            flow_debounce: Duration::from_millis(self.flow_debounce_ms),
            files_debounce: Duration::from_millis(self.files_debounce_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
}

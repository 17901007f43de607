//! Command line interface

use std::path::PathBuf;

use clap::Parser;
use flow_deploy::DeployMethod;

use crate::config::EditorConfig;
use crate::constants::paths;

/// Edit Node-RED function and template code as plain files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = paths::CONFIG_FILE)]
    pub config: PathBuf,

    /// Node-RED user directory
    #[arg(long)]
    pub user_dir: Option<PathBuf>,

    /// Flow file, absolute or relative to the user directory
    #[arg(long)]
    pub flows_file: Option<String>,

    /// Directory to extract code files into
    #[arg(long)]
    pub functions_dir: Option<PathBuf>,

    /// Port for the editor API
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base URL of the Node-RED admin API
    #[arg(long)]
    pub admin_url: Option<String>,

    /// Starting deploy strategy: partial-http or full-http
    #[arg(long)]
    pub deploy_method: Option<DeployMethod>,

    /// Send partial deploys to the runtime's `/flows/partial` endpoint
    #[arg(long)]
    pub remote_partial: bool,

    /// Do not watch for changes
    #[arg(long)]
    pub no_watch: bool,
}

impl Cli {
    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut EditorConfig) {
        if let Some(user_dir) = &self.user_dir {
            config.user_dir = user_dir.clone();
        }
        if let Some(flows_file) = &self.flows_file {
            config.flows_file = flows_file.clone();
        }
        if let Some(functions_dir) = &self.functions_dir {
            config.functions_dir = functions_dir.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(admin_url) = &self.admin_url {
            config.admin_url = admin_url.clone();
        }
        if let Some(method) = self.deploy_method {
            config.deploy_method = method;
        }
        if self.remote_partial {
            config.remote_partial = true;
        }
        if self.no_watch {
            config.watch_enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "redwire",
            "--port",
            "4100",
            "--deploy-method",
            "full-http",
            "--no-watch",
            "--remote-partial",
            "--flows-file",
            "flows_pi.json",
        ]);
        let mut config = EditorConfig::default();
        cli.apply_to(&mut config);

        assert_eq!(config.port, 4100);
        assert_eq!(config.deploy_method, DeployMethod::FullHttp);
        assert!(!config.watch_enabled);
        assert!(config.remote_partial);
        assert_eq!(config.flows_file, "flows_pi.json");
        assert_eq!(config.admin_url, "http://localhost:1880");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["redwire"]);
        assert_eq!(cli.config, PathBuf::from("redwire.json"));

        let mut config = EditorConfig {
            port: 4200,
            ..EditorConfig::default()
        };
        cli.apply_to(&mut config);
        assert_eq!(config.port, 4200);
        assert!(config.watch_enabled);
    }

    #[test]
    fn test_rejects_unknown_deploy_method() {
        assert!(Cli::try_parse_from(["redwire", "--deploy-method", "socket"]).is_err());
    }
}

//! Application-wide constants
//!
//! Defaults for every configuration value live here.

/// Network configuration
pub mod ports {
    /// Default port for the editor API
    pub const EDITOR: u16 = 3005;
}

/// Server host configuration
pub mod hosts {
    /// Default host for the editor API
    pub const LOCAL: &str = "127.0.0.1";
    /// Default Node-RED admin API
    pub const ADMIN_URL: &str = "http://localhost:1880";
}

/// Timeout configuration
pub mod timeouts {
    /// Per-request timeout for admin API calls
    pub const REQUEST_SECS: u64 = 30;
    /// Quiet period after a flow file change
    pub const FLOW_DEBOUNCE_MS: u64 = 500;
    /// Quiet period after a change in the files directory
    pub const FILES_DEBOUNCE_MS: u64 = 300;
}

/// Default locations
pub mod paths {
    /// Node-RED user directory, relative to the home directory
    pub const USER_DIR: &str = ".node-red";
    /// Flow file name inside the user directory
    pub const FLOWS_FILE: &str = "flows.json";
    /// Directory the code files are extracted to
    pub const FUNCTIONS_DIR: &str = "./functions";
    /// Config file looked up in the working directory
    pub const CONFIG_FILE: &str = "redwire.json";
}

/// Capacity of the broadcast channels for events and reload signals
pub const CHANNEL_CAPACITY: usize = 64;

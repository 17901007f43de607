//! Error types for deployment

use thiserror::Error;

/// Result type alias using DeployError
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors raised by a single deployment strategy
#[derive(Debug, Error)]
pub enum DeployError {
    /// The request never got a response
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The runtime answered with a non-success status
    #[error("{url} answered with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Records could not be merged into the flow file before a reload
    #[error("Partial merge failed: {0}")]
    Merge(String),

    /// Nobody is listening for in-process reload signals
    #[error("No reload listener is attached")]
    NoListener,

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl DeployError {
    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

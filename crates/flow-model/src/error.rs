//! Error types for the flow model

use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur while reading or writing a flow document
#[derive(Debug, Error)]
pub enum FlowError {
    /// The flow file is not valid JSON
    #[error("Malformed flow document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON is valid but not shaped like a flow document
    #[error("Invalid flow document: {0}")]
    Shape(String),

    /// Serializing the document failed
    #[error("Failed to serialize flow document: {0}")]
    Serialize(String),
}

impl FlowError {
    /// Create a shape error with a message
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Whether this error means the input could not be read as a flow document
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Shape(_))
    }
}

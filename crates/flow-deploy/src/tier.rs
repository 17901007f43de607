//! Deployment tiers and the degrade order between them

use serde::{Deserialize, Serialize};

/// One delivery strategy, ordered from most to least preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployTier {
    /// Post only the changed nodes to the partial-update endpoint
    Partial,
    /// Post the entire document to the flow reload endpoint
    Full,
    /// Raise an in-process reload signal (no response channel)
    EventBus,
}

impl DeployTier {
    /// The tier to try after this one fails, `None` when the chain is exhausted
    pub const fn on_failure(self) -> Option<DeployTier> {
        match self {
            Self::Partial => Some(Self::Full),
            Self::Full => Some(Self::EventBus),
            Self::EventBus => None,
        }
    }

    /// Whether this tier goes over the admin HTTP API
    pub const fn is_http(self) -> bool {
        matches!(self, Self::Partial | Self::Full)
    }

    /// Short label for logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::Partial => "partial HTTP",
            Self::Full => "full HTTP",
            Self::EventBus => "event bus",
        }
    }
}

impl std::fmt::Display for DeployTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Configured deployment preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployMethod {
    /// Start with the partial deploy
    #[default]
    PartialHttp,
    /// Skip straight to the full deploy
    FullHttp,
}

impl DeployMethod {
    /// The tier a session starts at
    pub const fn initial_tier(self) -> DeployTier {
        match self {
            Self::PartialHttp => DeployTier::Partial,
            Self::FullHttp => DeployTier::Full,
        }
    }
}

impl std::str::FromStr for DeployMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial-http" => Ok(Self::PartialHttp),
            "full-http" => Ok(Self::FullHttp),
            other => Err(format!(
                "unknown deploy method '{}', expected 'partial-http' or 'full-http'",
                other
            )),
        }
    }
}

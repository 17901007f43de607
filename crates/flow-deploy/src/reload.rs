//! In-process reload signal, the last deployment tier

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{DeployError, Result};

/// Signal raised when every HTTP tier has failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadRequest {
    /// Ids of the records that changed
    pub node_ids: Vec<String>,
}

/// Trait for raising the "reload flows" signal in the host process
///
/// There is no response channel; the only feedback is whether the signal
/// reached anyone.
pub trait ReloadSignal: Send + Sync {
    /// Raise the signal
    fn reload_flows(&self, request: ReloadRequest) -> Result<()>;
}

/// Reload signal fanned out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastReload {
    sender: broadcast::Sender<ReloadRequest>,
}

impl BroadcastReload {
    /// Create a signal with room for `capacity` unread requests per listener
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a listener
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadRequest> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastReload {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadSignal for BroadcastReload {
    fn reload_flows(&self, request: ReloadRequest) -> Result<()> {
        self.sender
            .send(request)
            .map(|_| ())
            .map_err(|_| DeployError::NoListener)
    }
}

/// A reload signal that nobody receives
///
/// Always reports failure, so a chain ending here is an exhausted chain.
pub struct NullReload;

impl ReloadSignal for NullReload {
    fn reload_flows(&self, _request: ReloadRequest) -> Result<()> {
        Err(DeployError::NoListener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_without_listener_fails() {
        let signal = BroadcastReload::default();
        let err = signal
            .reload_flows(ReloadRequest { node_ids: vec![] })
            .unwrap_err();
        assert!(matches!(err, DeployError::NoListener));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_listener() {
        let signal = BroadcastReload::default();
        let mut rx = signal.subscribe();
        signal
            .reload_flows(ReloadRequest {
                node_ids: vec!["f1".to_string()],
            })
            .unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.node_ids, vec!["f1"]);
    }

    #[test]
    fn test_null_reload() {
        assert!(NullReload
            .reload_flows(ReloadRequest { node_ids: vec![] })
            .is_err());
    }
}

//! Deployment dispatcher
//!
//! Walks the tier chain for each deploy and keeps the session's preferred
//! starting tier. HTTP failures push the preferred tier down and it never
//! comes back up; the event bus is only ever a per-call last resort.

use std::sync::Arc;

use flow_model::{FlowDocument, FlowRecord};
use parking_lot::Mutex;
use serde::Serialize;

use crate::reload::{ReloadRequest, ReloadSignal};
use crate::tier::{DeployMethod, DeployTier};
use crate::transport::{DeployTransport, PartialDeployRequest};

/// A tier that was tried and failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierFailure {
    pub tier: DeployTier,
    pub error: String,
}

/// Outcome of one deploy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployReport {
    /// Whether the runtime confirmed the deploy over HTTP
    pub succeeded: bool,
    /// The tier that delivered the changes. `EventBus` means a reload was
    /// only requested and nothing confirmed it.
    pub tier: Option<DeployTier>,
    /// Tiers that failed before the outcome, in order
    pub failures: Vec<TierFailure>,
}

impl DeployReport {
    /// Whether the changes were handed to the in-process reload signal
    /// after every HTTP tier failed
    pub fn reload_requested(&self) -> bool {
        self.tier == Some(DeployTier::EventBus)
    }
}

/// Delivers changed records to the runtime through the tier chain
pub struct Dispatcher {
    transport: Arc<dyn DeployTransport>,
    reload: Arc<dyn ReloadSignal>,
    /// Flow file name forwarded to the partial-update endpoint
    flows_file: Option<String>,
    /// Where the next deploy starts
    preferred: Mutex<DeployTier>,
}

impl Dispatcher {
    /// Create a dispatcher starting at the tier `method` selects
    pub fn new(
        transport: Arc<dyn DeployTransport>,
        reload: Arc<dyn ReloadSignal>,
        method: DeployMethod,
    ) -> Self {
        Self {
            transport,
            reload,
            flows_file: None,
            preferred: Mutex::new(method.initial_tier()),
        }
    }

    /// Set the flow file name sent with partial deploys
    pub fn with_flows_file(mut self, flows_file: impl Into<String>) -> Self {
        self.flows_file = Some(flows_file.into());
        self
    }

    /// The tier the next deploy will start at
    pub fn preferred_tier(&self) -> DeployTier {
        *self.preferred.lock()
    }

    /// Deploy changed records, falling back through the tiers.
    ///
    /// Never returns an error: failures are logged and reported in the
    /// [`DeployReport`].
    pub async fn deploy(&self, changed: &[FlowRecord], document: &FlowDocument) -> DeployReport {
        let mut tier = self.preferred_tier();
        let mut failures = Vec::new();

        loop {
            let result = match tier {
                DeployTier::Partial => {
                    let request = PartialDeployRequest::new(changed, self.flows_file.clone());
                    self.transport.deploy_partial(&request).await
                }
                DeployTier::Full => self.transport.deploy_full(&document.to_value()).await,
                DeployTier::EventBus => self.reload.reload_flows(ReloadRequest {
                    node_ids: changed.iter().map(|r| r.id().to_string()).collect(),
                }),
            };

            match result {
                Ok(()) => {
                    if tier == DeployTier::EventBus {
                        log::warn!("Flows reload requested via event bus; deploy not confirmed");
                    } else {
                        log::info!(
                            "Deployed {} node(s) via {} deploy",
                            changed.len(),
                            tier
                        );
                    }
                    return DeployReport {
                        succeeded: tier.is_http(),
                        tier: Some(tier),
                        failures,
                    };
                }
                Err(e) => {
                    failures.push(TierFailure {
                        tier,
                        error: e.to_string(),
                    });
                    match tier.on_failure() {
                        Some(next) if next.is_http() => {
                            log::warn!("{} deploy failed: {}; falling back to {}", tier, e, next);
                            self.downgrade(next);
                            tier = next;
                        }
                        Some(next) => {
                            log::error!(
                                "All deployment methods failed. Last error: {}; requesting reload via {}",
                                e,
                                next
                            );
                            tier = next;
                        }
                        None => {
                            log::error!("Reload signal not delivered: {}", e);
                            return DeployReport {
                                succeeded: false,
                                tier: None,
                                failures,
                            };
                        }
                    }
                }
            }
        }
    }

    fn downgrade(&self, next: DeployTier) {
        let mut preferred = self.preferred.lock();
        if next > *preferred {
            log::info!("Preferred deploy method is now {}", next);
            *preferred = next;
        }
    }
}

/// Shared dispatcher type for application state
pub type SharedDispatcher = Arc<Dispatcher>;

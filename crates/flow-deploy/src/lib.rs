//! Flow Deploy - getting collected changes into a running Node-RED
//!
//! Delivery goes through an ordered chain of strategies, each a
//! [`DeployTier`]:
//!
//! 1. **Partial**: deliver only the changed nodes, either to a partial-update
//!    endpoint or through a transport that merges them and reloads those nodes
//! 2. **Full**: post the whole flow document to the stock `/flows` endpoint
//! 3. **EventBus**: raise an in-process "reload flows" signal; nothing confirms
//!    it, so the report does not count it as a success
//!
//! A failing tier logs a warning and hands over to the next one. The
//! [`Dispatcher`] also remembers HTTP failures across calls, so once partial
//! deploys have failed a session keeps starting at the full deploy.
//!
//! Deployment never fails loudly: by the time it runs the flow file is
//! already written, so the worst case is a runtime that lags behind disk.

pub mod admin;
pub mod dispatcher;
pub mod error;
pub mod reload;
pub mod tier;
pub mod transport;

// Re-exports for convenience
pub use admin::AdminClient;
pub use dispatcher::{DeployReport, Dispatcher, SharedDispatcher, TierFailure};
pub use error::{DeployError, Result};
pub use reload::{BroadcastReload, NullReload, ReloadRequest, ReloadSignal};
pub use tier::{DeployMethod, DeployTier};
pub use transport::{DeployTransport, PartialDeployRequest};

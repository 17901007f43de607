//! Sync Engine - keeping Node-RED flow code and files on disk in step
//!
//! The engine mirrors the code of every function and dashboard template
//! node in a flow file into one file per node, and folds edits to those
//! files back into the flow file:
//!
//! - [`extract_document`]: flow document → `{id}.js` / `{id}.vue` files
//! - [`collect_document`]: files → updated document plus the changed records
//! - [`SyncEngine`]: both of the above against real paths, persisting the
//!   flow file and handing changes to the deployment dispatcher
//! - [`MergingTransport`]: partial deploys against a stock runtime, merged
//!   here and reloaded node by node
//! - [`WatchCoordinator`]: triggers the engine when either side changes
//!
//! # Feedback loops
//!
//! Every engine write holds the [`SyncGuard`]. Watcher events seen while
//! the guard is held are ignored, and extraction followed by collection
//! changes nothing, so the engine's own writes settle instead of looping.

pub mod collect;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod files;
pub mod guard;
pub mod listing;
pub mod local_deploy;
pub mod watch;

// Re-exports for convenience
pub use collect::{collect_document, Collected};
pub use engine::{CollectMode, CollectReport, SyncEngine, SyncPaths};
pub use error::{Result, SyncError};
pub use events::{BroadcastEventSink, EventError, EventSink, NullEventSink, SyncEvent, VecEventSink};
pub use extract::extract_document;
pub use guard::{SyncGuard, SyncScope};
pub use listing::{FileEntry, FileTree, FlowGroup, GroupKind, TreeNode};
pub use local_deploy::{merge_into_flows_file, MergingTransport};
pub use watch::{WatchCoordinator, WatchHandler, WatchSettings};

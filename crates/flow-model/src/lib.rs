//! Flow Model - Node-RED flow documents for Redwire
//!
//! This crate parses and serializes the flow storage file (a JSON array of
//! node records) and answers the structural questions the sync engine asks
//! of it:
//!
//! - Record lookup by id across both the flat and the tab-nested layout
//! - Which records carry editable code, and under which file name
//! - Which inject/debug nodes are wired to a function
//! - Merging updated records back into a document
//!
//! # Layout normalization
//!
//! Older flow files nest child records under a tab's `nodes` array; newer
//! files keep every record at the top level and link children with `z`.
//! `FlowDocument` flattens both into one ordered list at parse time and
//! restores the original nesting when serialized, so callers never have to
//! care which layout they were given.
//!
//! # Example
//!
//! ```ignore
//! use flow_model::FlowDocument;
//!
//! let doc = FlowDocument::parse(br#"[{"id":"f1","type":"function","func":"return msg;"}]"#)?;
//! let record = doc.find_by_id("f1").unwrap();
//! assert_eq!(record.file_name().as_deref(), Some("f1.js"));
//! ```

pub mod comments;
pub mod document;
pub mod error;
pub mod graph;
pub mod record;

// Re-export key types
pub use comments::is_comment_only;
pub use document::FlowDocument;
pub use error::{FlowError, Result};
pub use graph::{Connection, DebugSummary, FlowSummary, InjectSummary, NodeBrief};
pub use record::{EditableKind, FlowRecord, NodeId, RecordKind};

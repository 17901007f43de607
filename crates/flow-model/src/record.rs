//! Flow records and their kinds
//!
//! A record is kept as the raw JSON object it was parsed from so that
//! fields Redwire does not understand survive a round trip untouched.
//! Typed accessors cover the handful of fields the sync engine reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::comments::is_comment_only;

/// Unique identifier for a record
pub type NodeId = String;

/// Field holding a function node's body
pub const FUNC_FIELD: &str = "func";
/// Field holding a function node's one-time setup code
pub const INITIALIZE_FIELD: &str = "initialize";
/// Field holding a dashboard template's markup
pub const TEMPLATE_FIELD: &str = "template";

/// The record types the engine distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Flow tab (container)
    Tab,
    /// Subflow definition (container)
    Subflow,
    /// Function node with a `func` body
    Function,
    /// Dashboard template node with a `template` body
    Template,
    /// Inject node (trigger source)
    Inject,
    /// Debug node (sink)
    Debug,
    /// Any other node type, carried opaquely
    Other(String),
}

impl RecordKind {
    /// Classify a record `type` string
    pub fn from_type(node_type: &str) -> Self {
        match node_type {
            "tab" => Self::Tab,
            "subflow" => Self::Subflow,
            "function" => Self::Function,
            "ui_template" => Self::Template,
            "inject" => Self::Inject,
            "debug" => Self::Debug,
            other => Self::Other(other.to_string()),
        }
    }

    /// The `type` string for this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tab => "tab",
            Self::Subflow => "subflow",
            Self::Function => "function",
            Self::Template => "ui_template",
            Self::Inject => "inject",
            Self::Debug => "debug",
            Self::Other(other) => other,
        }
    }

    /// The editable file kind for this record, if it has one
    pub fn editable(&self) -> Option<EditableKind> {
        match self {
            Self::Function => Some(EditableKind::Function),
            Self::Template => Some(EditableKind::Template),
            _ => None,
        }
    }
}

/// Kind of code file extracted from a record
///
/// The extension is fixed per kind so the file name alone identifies the
/// record it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableKind {
    /// `{id}.js`, holds `func` (or `initialize`)
    Function,
    /// `{id}.vue`, holds `template`
    Template,
}

impl EditableKind {
    /// File extension without the dot
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Function => "js",
            Self::Template => "vue",
        }
    }

    /// File name for a record id
    pub fn file_name(self, id: &str) -> String {
        format!("{}.{}", id, self.extension())
    }

    /// Split a tracked file name into its record id and kind
    ///
    /// Returns `None` for anything that is not `{id}.js` or `{id}.vue`.
    pub fn from_file_name(name: &str) -> Option<(&str, EditableKind)> {
        [Self::Function, Self::Template].into_iter().find_map(|kind| {
            name.strip_suffix(kind.extension())
                .and_then(|stem| stem.strip_suffix('.'))
                .filter(|id| !id.is_empty())
                .map(|id| (id, kind))
        })
    }

    /// Whether a file name is one the engine tracks
    pub fn is_tracked(name: &str) -> bool {
        Self::from_file_name(name).is_some()
    }
}

/// A single record of a flow document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowRecord {
    fields: Map<String, Value>,
}

impl FlowRecord {
    /// Wrap a raw JSON object
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// All fields of the record
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Mutable access to all fields
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Consume the record, returning its fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Get a string field, if present and a string
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Set a string field, keeping its position if it already exists
    pub fn set_str_field(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), Value::String(value.into()));
    }

    /// Record id, empty if missing
    pub fn id(&self) -> &str {
        self.str_field("id").unwrap_or("")
    }

    /// Raw `type` string, empty if missing
    pub fn node_type(&self) -> &str {
        self.str_field("type").unwrap_or("")
    }

    /// Classified record kind
    pub fn kind(&self) -> RecordKind {
        RecordKind::from_type(self.node_type())
    }

    /// Non-empty `name`
    pub fn name(&self) -> Option<&str> {
        self.str_field("name").filter(|n| !n.is_empty())
    }

    /// Non-empty `label` (tabs are labelled rather than named)
    pub fn label(&self) -> Option<&str> {
        self.str_field("label").filter(|l| !l.is_empty())
    }

    /// The name to show for this record, falling back to its id
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.id())
    }

    /// Owning tab or subflow id
    pub fn z(&self) -> Option<&str> {
        self.str_field("z").filter(|z| !z.is_empty())
    }

    /// Output wiring: one list of downstream ids per output slot
    pub fn wires(&self) -> Vec<Vec<&str>> {
        self.fields
            .get("wires")
            .and_then(Value::as_array)
            .map(|slots| {
                slots
                    .iter()
                    .map(|slot| {
                        slot.as_array()
                            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any output slot is wired to `target_id`
    pub fn wires_to(&self, target_id: &str) -> bool {
        self.wires()
            .iter()
            .any(|slot| slot.iter().any(|id| *id == target_id))
    }

    /// Function body
    pub fn func(&self) -> Option<&str> {
        self.str_field(FUNC_FIELD)
    }

    /// Function setup code
    pub fn initialize(&self) -> Option<&str> {
        self.str_field(INITIALIZE_FIELD)
    }

    /// Template markup
    pub fn template(&self) -> Option<&str> {
        self.str_field(TEMPLATE_FIELD)
    }

    /// Editable file kind, if this record carries code
    pub fn editable_kind(&self) -> Option<EditableKind> {
        self.kind().editable()
    }

    /// Extracted file name, if this record carries code
    pub fn file_name(&self) -> Option<String> {
        self.editable_kind().map(|kind| kind.file_name(self.id()))
    }

    /// The field whose content is mirrored into the extracted file.
    ///
    /// A function whose `func` is only comments but which has non-blank
    /// `initialize` code surfaces `initialize` instead of `func`.
    pub fn surfaced_field(&self) -> Option<&'static str> {
        match self.editable_kind()? {
            EditableKind::Template => Some(TEMPLATE_FIELD),
            EditableKind::Function => {
                let init_present = self
                    .initialize()
                    .is_some_and(|init| !init.trim().is_empty());
                if init_present && is_comment_only(self.func().unwrap_or("")) {
                    Some(INITIALIZE_FIELD)
                } else {
                    Some(FUNC_FIELD)
                }
            }
        }
    }

    /// Current content of the surfaced field, empty if missing
    pub fn surfaced_content(&self) -> Option<&str> {
        self.surfaced_field()
            .map(|field| self.str_field(field).unwrap_or(""))
    }
}

impl From<Map<String, Value>> for FlowRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

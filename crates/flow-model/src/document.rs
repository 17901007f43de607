//! Flow documents
//!
//! Parsing flattens the document into one ordered entry list: every
//! top-level record is followed by the records nested in its `nodes` array.
//! Each entry remembers its parent and whether it was nested, which is all
//! serialization needs to rebuild the original shape.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{FlowError, Result};
use crate::record::FlowRecord;

/// Key of the nested child array in older tab records
const NODES_FIELD: &str = "nodes";

/// Indentation used when writing the flow file
const INDENT: &[u8] = b"    ";

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    record: FlowRecord,
    /// Owning container: the nesting record for nested entries, `z` otherwise
    parent: Option<String>,
    /// Whether this record lives inside another record's `nodes` array
    nested: bool,
    /// Whether this record had a `nodes` array (kept as an empty placeholder)
    container: bool,
}

impl Entry {
    fn replace_record(&mut self, mut record: FlowRecord) {
        if self.container {
            record
                .fields_mut()
                .insert(NODES_FIELD.to_string(), Value::Array(Vec::new()));
        } else {
            record.fields_mut().shift_remove(NODES_FIELD);
        }
        if !self.nested {
            self.parent = record.z().map(str::to_string);
        }
        self.record = record;
    }
}

/// A parsed flow document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowDocument {
    entries: Vec<Entry>,
}

impl FlowDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the raw contents of a flow file
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Build a document from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(FlowError::shape("root must be an array of records"));
        };

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(mut fields) = item else {
                return Err(FlowError::shape(format!("record {} is not an object", index)));
            };

            let children = match fields.get_mut(NODES_FIELD) {
                Some(Value::Array(children)) => Some(std::mem::take(children)),
                _ => None,
            };

            let record = FlowRecord::from_map(fields);
            let container_id = record.id().to_string();
            entries.push(Entry {
                parent: record.z().map(str::to_string),
                record,
                nested: false,
                container: children.is_some(),
            });

            for (child_index, child) in children.into_iter().flatten().enumerate() {
                let record = FlowRecord::from_value(child).ok_or_else(|| {
                    FlowError::shape(format!(
                        "record {} of '{}' is not an object",
                        child_index, container_id
                    ))
                })?;
                entries.push(Entry {
                    record,
                    parent: Some(container_id.clone()),
                    nested: true,
                    container: false,
                });
            }
        }

        Ok(Self { entries })
    }

    /// Build a flat document from records
    pub fn from_records(records: impl IntoIterator<Item = FlowRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|mut record| {
                let container = matches!(record.fields().get(NODES_FIELD), Some(Value::Array(_)));
                if container {
                    record
                        .fields_mut()
                        .insert(NODES_FIELD.to_string(), Value::Array(Vec::new()));
                }
                Entry {
                    parent: record.z().map(str::to_string),
                    record,
                    nested: false,
                    container,
                }
            })
            .collect();
        Self { entries }
    }

    /// Rebuild the JSON value in its original layout
    pub fn to_value(&self) -> Value {
        let mut out: Vec<Value> = Vec::new();
        let mut open: Option<(Map<String, Value>, Vec<Value>)> = None;

        for entry in &self.entries {
            if entry.nested {
                if let Some((_, children)) = open.as_mut() {
                    children.push(entry.record.to_value());
                }
                continue;
            }

            if let Some((fields, children)) = open.take() {
                out.push(close_container(fields, children));
            }

            let fields = entry.record.fields().clone();
            if entry.container {
                open = Some((fields, Vec::new()));
            } else {
                out.push(Value::Object(fields));
            }
        }

        if let Some((fields, children)) = open.take() {
            out.push(close_container(fields, children));
        }

        Value::Array(out)
    }

    /// Serialize with the fixed 4-space indentation of the flow file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.to_value()
            .serialize(&mut serializer)
            .map_err(|e| FlowError::Serialize(e.to_string()))?;
        Ok(buf)
    }

    /// Number of records, nested ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records in document order, nested ones directly after their container
    pub fn records(&self) -> impl Iterator<Item = &FlowRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Mutable access to all records in document order
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut FlowRecord> {
        self.entries.iter_mut().map(|e| &mut e.record)
    }

    /// Records stored at the top level of the file
    pub fn top_level(&self) -> impl Iterator<Item = &FlowRecord> {
        self.entries.iter().filter(|e| !e.nested).map(|e| &e.record)
    }

    /// Records that carry editable code (functions and templates)
    pub fn editable_records(&self) -> impl Iterator<Item = &FlowRecord> {
        self.records().filter(|r| r.editable_kind().is_some())
    }

    /// Find a record by id: top-level records first, then nested ones
    pub fn find_by_id(&self, id: &str) -> Option<&FlowRecord> {
        self.position_of(id).map(|i| &self.entries[i].record)
    }

    /// Mutable variant of [`find_by_id`](Self::find_by_id)
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut FlowRecord> {
        self.position_of(id).map(move |i| &mut self.entries[i].record)
    }

    /// Owning tab or subflow of a record
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.position_of(id)
            .and_then(|i| self.entries[i].parent.as_deref())
    }

    /// Whether a record was nested inside a container in the source file
    pub fn is_nested(&self, id: &str) -> bool {
        self.position_of(id).is_some_and(|i| self.entries[i].nested)
    }

    /// Records belonging to a tab, by `z` or by nesting, de-duplicated by id
    pub fn children_of(&self, tab_id: &str) -> Vec<&FlowRecord> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.parent.as_deref() == Some(tab_id) || e.record.z() == Some(tab_id))
            .map(|e| &e.record)
            .filter(|r| seen.insert(r.id()))
            .collect()
    }

    /// Replace records in place by id, returning how many were replaced.
    ///
    /// Every record whose id matches an incoming record is replaced, at the
    /// top level or nested. Incoming records with no match are ignored.
    pub fn merge_records(&mut self, incoming: &[FlowRecord]) -> usize {
        let mut replaced = 0;
        for entry in &mut self.entries {
            let id = entry.record.id();
            if id.is_empty() {
                continue;
            }
            if let Some(update) = incoming.iter().find(|r| r.id() == id) {
                entry.replace_record(update.clone());
                replaced += 1;
            }
        }
        replaced
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.nested && e.record.id() == id)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|e| e.nested && e.record.id() == id)
            })
    }
}

fn close_container(mut fields: Map<String, Value>, children: Vec<Value>) -> Value {
    fields.insert(NODES_FIELD.to_string(), Value::Array(children));
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat_doc() -> FlowDocument {
        FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "label": "Main"},
            {"id": "i1", "type": "inject", "z": "t1", "wires": [["f1"]]},
            {"id": "f1", "type": "function", "z": "t1", "func": "return msg;", "wires": [["d1"]]},
            {"id": "d1", "type": "debug", "z": "t1"}
        ]))
        .unwrap()
    }

    fn nested_doc() -> FlowDocument {
        FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "label": "Old", "nodes": [
                {"id": "f1", "type": "function", "func": "return msg;"},
                {"id": "u1", "type": "ui_template", "template": "<b>hi</b>"}
            ], "extra": true},
            {"id": "f2", "type": "function", "func": "return 2;"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(FlowDocument::parse(b"[{").unwrap_err().is_parse());
        assert!(FlowDocument::parse(b"{\"id\": 1}").unwrap_err().is_parse());
        assert!(FlowDocument::parse(b"[1, 2]").unwrap_err().is_parse());
        assert!(FlowDocument::parse(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_flatten_nested_records() {
        let doc = nested_doc();
        let ids: Vec<&str> = doc.records().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["t1", "f1", "u1", "f2"]);
        assert_eq!(doc.parent_of("f1"), Some("t1"));
        assert!(doc.is_nested("u1"));
        assert!(!doc.is_nested("f2"));
        assert_eq!(doc.top_level().count(), 2);
        assert_eq!(doc.editable_records().count(), 3);
    }

    #[test]
    fn test_nested_layout_round_trips() {
        let raw = json!([
            {"id": "t1", "type": "tab", "nodes": [
                {"id": "f1", "type": "function", "func": "a"}
            ], "disabled": false},
            {"id": "t2", "type": "tab", "nodes": []},
            {"id": "x", "type": "change", "rules": [{"t": "set"}]}
        ]);
        let doc = FlowDocument::from_value(raw.clone()).unwrap();
        assert_eq!(doc.to_value(), raw);

        let reparsed = FlowDocument::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_to_bytes_uses_four_space_indent() {
        let doc = FlowDocument::from_value(json!([{"id": "a", "type": "debug"}])).unwrap();
        let text = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(text, "[\n    {\n        \"id\": \"a\",\n        \"type\": \"debug\"\n    }\n]");
    }

    #[test]
    fn test_find_by_id_prefers_top_level() {
        let doc = FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "nodes": [{"id": "dup", "type": "function", "func": "nested"}]},
            {"id": "dup", "type": "function", "func": "top"}
        ]))
        .unwrap();
        assert_eq!(doc.find_by_id("dup").and_then(|r| r.func()), Some("top"));
        assert!(doc.find_by_id("missing").is_none());
    }

    #[test]
    fn test_children_of_unions_z_and_nesting() {
        let doc = FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "nodes": [
                {"id": "a", "type": "function", "z": "t1"},
                {"id": "b", "type": "debug"}
            ]},
            {"id": "c", "type": "inject", "z": "t1"},
            {"id": "d", "type": "inject", "z": "t2"}
        ]))
        .unwrap();
        let ids: Vec<&str> = doc.children_of("t1").iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(doc.children_of("nope").is_empty());
    }

    #[test]
    fn test_children_of_flat_layout() {
        let doc = flat_doc();
        let ids: Vec<&str> = doc.children_of("t1").iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["i1", "f1", "d1"]);
    }

    #[test]
    fn test_merge_records_replaces_in_place() {
        let mut doc = nested_doc();
        let update = FlowRecord::from_value(
            json!({"id": "f1", "type": "function", "func": "return null;"}),
        )
        .unwrap();
        let stranger = FlowRecord::from_value(json!({"id": "zz", "type": "function"})).unwrap();

        assert_eq!(doc.merge_records(&[update, stranger]), 1);
        assert_eq!(doc.find_by_id("f1").and_then(|r| r.func()), Some("return null;"));
        assert_eq!(doc.len(), 4);

        let value = doc.to_value();
        assert_eq!(value[0]["nodes"][0]["func"], json!("return null;"));
        assert_eq!(value[0]["extra"], json!(true));
    }

    #[test]
    fn test_merge_into_container_keeps_children() {
        let mut doc = nested_doc();
        let tab = FlowRecord::from_value(json!({"id": "t1", "type": "tab", "label": "Renamed"})).unwrap();
        doc.merge_records(&[tab]);
        let value = doc.to_value();
        assert_eq!(value[0]["label"], json!("Renamed"));
        assert_eq!(value[0]["nodes"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_from_records() {
        let doc = FlowDocument::from_records(flat_doc().records().cloned());
        assert_eq!(doc, flat_doc());
    }
}

//! Graph queries over `wires`
//!
//! These answer "what triggers this function" and "where does its output
//! go" for the editor's test panel, plus a structural dump of the document.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::FlowDocument;
use crate::record::{FlowRecord, RecordKind};

/// An inject node wired into a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectSummary {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub payload: Value,
    pub payload_type: String,
    pub repeat: String,
    pub crontab: String,
    pub once: bool,
}

impl InjectSummary {
    fn from_record(record: &FlowRecord) -> Self {
        let text = |key: &str| record.str_field(key).unwrap_or("").to_string();
        Self {
            id: record.id().to_string(),
            name: record
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Inject ({})", record.id())),
            topic: text("topic"),
            payload: record
                .fields()
                .get("payload")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
            payload_type: record
                .str_field("payloadType")
                .filter(|t| !t.is_empty())
                .unwrap_or("str")
                .to_string(),
            repeat: text("repeat"),
            crontab: text("crontab"),
            once: record
                .fields()
                .get("once")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// A debug node a function is wired into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// Output slot of the function feeding this node
    pub output: usize,
}

/// Short description of a node for the structural dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBrief {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wires: Option<Vec<Vec<String>>>,
}

/// One wire of the flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub from_name: String,
    pub from_type: String,
    pub to: String,
    pub output: usize,
}

/// Structural dump of a flow document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub total_items: usize,
    pub node_types: BTreeMap<String, usize>,
    pub inject_nodes: Vec<NodeBrief>,
    pub function_nodes: Vec<NodeBrief>,
    pub debug_nodes: Vec<NodeBrief>,
    pub connections: Vec<Connection>,
}

fn owned_wires(record: &FlowRecord) -> Vec<Vec<String>> {
    record
        .wires()
        .into_iter()
        .map(|slot| slot.into_iter().map(str::to_string).collect())
        .collect()
}

fn brief(record: &FlowRecord, with_wires: bool) -> NodeBrief {
    NodeBrief {
        id: record.id().to_string(),
        name: record.name().unwrap_or("unnamed").to_string(),
        wires: with_wires.then(|| owned_wires(record)),
    }
}

impl FlowDocument {
    /// Inject nodes with any output slot wired to `function_id`
    pub fn connected_injects(&self, function_id: &str) -> Vec<InjectSummary> {
        self.records()
            .filter(|r| r.kind() == RecordKind::Inject && r.wires_to(function_id))
            .map(InjectSummary::from_record)
            .collect()
    }

    /// Debug nodes directly downstream of `function_id`
    pub fn connected_debugs(&self, function_id: &str) -> Vec<DebugSummary> {
        let Some(function) = self.find_by_id(function_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (output, slot) in function.wires().into_iter().enumerate() {
            for target in slot {
                let Some(record) = self.find_by_id(target) else {
                    continue;
                };
                if record.kind() != RecordKind::Debug || !seen.insert(target) {
                    continue;
                }
                out.push(DebugSummary {
                    id: record.id().to_string(),
                    name: record
                        .name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Debug ({})", record.id())),
                    active: record
                        .fields()
                        .get("active")
                        .and_then(Value::as_bool)
                        .unwrap_or(true),
                    output,
                });
            }
        }
        out
    }

    /// Count node types and list injects, functions, debugs and every wire
    pub fn summary(&self) -> FlowSummary {
        let mut summary = FlowSummary {
            total_items: self.len(),
            ..Default::default()
        };

        for record in self.records() {
            *summary
                .node_types
                .entry(record.node_type().to_string())
                .or_insert(0) += 1;

            match record.kind() {
                RecordKind::Inject => summary.inject_nodes.push(brief(record, true)),
                RecordKind::Function => summary.function_nodes.push(brief(record, true)),
                RecordKind::Debug => summary.debug_nodes.push(brief(record, false)),
                _ => {}
            }

            for (output, slot) in record.wires().into_iter().enumerate() {
                for target in slot {
                    summary.connections.push(Connection {
                        from: record.id().to_string(),
                        from_name: record.name().unwrap_or(record.node_type()).to_string(),
                        from_type: record.node_type().to_string(),
                        to: target.to_string(),
                        output,
                    });
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> FlowDocument {
        FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "label": "Main"},
            {"id": "i1", "type": "inject", "z": "t1", "name": "tick", "topic": "t",
             "payload": "", "payloadType": "date", "repeat": "5", "once": true, "wires": [["f1"]]},
            {"id": "i2", "type": "inject", "z": "t1", "wires": [["x"], ["f1", "y"]]},
            {"id": "i3", "type": "inject", "z": "t1", "wires": [["d1"]]},
            {"id": "f1", "type": "function", "z": "t1", "func": "return msg;",
             "wires": [["d1", "c1"], ["d2", "d1"]]},
            {"id": "c1", "type": "change", "z": "t1", "wires": [[]]},
            {"id": "d1", "type": "debug", "z": "t1", "name": "out"},
            {"id": "d2", "type": "debug", "z": "t1", "active": false}
        ]))
        .unwrap()
    }

    #[test]
    fn test_connected_injects() {
        let injects = doc().connected_injects("f1");
        assert_eq!(injects.len(), 2);

        assert_eq!(injects[0].id, "i1");
        assert_eq!(injects[0].name, "tick");
        assert_eq!(injects[0].payload_type, "date");
        assert_eq!(injects[0].repeat, "5");
        assert!(injects[0].once);

        assert_eq!(injects[1].id, "i2");
        assert_eq!(injects[1].name, "Inject (i2)");
        assert_eq!(injects[1].payload_type, "str");
        assert_eq!(injects[1].payload, json!(""));
        assert!(!injects[1].once);
    }

    #[test]
    fn test_connected_injects_nested_layout() {
        let doc = FlowDocument::from_value(json!([
            {"id": "t1", "type": "tab", "nodes": [
                {"id": "i1", "type": "inject", "wires": [["f1"]]},
                {"id": "f1", "type": "function", "func": ""}
            ]}
        ]))
        .unwrap();
        assert_eq!(doc.connected_injects("f1").len(), 1);
    }

    #[test]
    fn test_connected_debugs() {
        let debugs = doc().connected_debugs("f1");
        let ids: Vec<&str> = debugs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert_eq!(debugs[0].name, "out");
        assert_eq!(debugs[0].output, 0);
        assert_eq!(debugs[1].name, "Debug (d2)");
        assert!(!debugs[1].active);
        assert_eq!(debugs[1].output, 1);

        assert!(doc().connected_debugs("missing").is_empty());
    }

    #[test]
    fn test_summary() {
        let summary = doc().summary();
        assert_eq!(summary.total_items, 8);
        assert_eq!(summary.node_types.get("inject"), Some(&3));
        assert_eq!(summary.function_nodes.len(), 1);
        assert_eq!(summary.debug_nodes[1].name, "unnamed");
        assert!(summary.debug_nodes[0].wires.is_none());
        // i1:1, i2:3, i3:1, f1:4
        assert_eq!(summary.connections.len(), 9);

        let from_f1: Vec<&Connection> =
            summary.connections.iter().filter(|c| c.from == "f1").collect();
        assert_eq!(from_f1[0].from_name, "function");
        assert_eq!(from_f1[2].output, 1);
    }
}

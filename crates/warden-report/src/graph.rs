//! Provenance graph over a trail.
//!
//! Each record becomes an event node linked to the state it was in, the
//! state it claimed, the network it used, and its verdict. State and network
//! nodes are shared across events, so recurring patterns cluster together.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;
use warden_audit::{AlertFlag, AuditRecord};

use crate::error::Result;

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// One audited event.
    Event,
    /// A physical state value.
    Physical,
    /// A reported state value.
    Reported,
    /// An endpoint (or a bare transport when no endpoint was recorded).
    Network,
    /// The OK verdict of one event.
    Ok,
    /// One alert raised on one event.
    Alert(AlertFlag),
}

impl NodeKind {
    /// Fill color used when rendering.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Event => "#3b82f6",
            Self::Physical => "#0f766e",
            Self::Reported => "#fbbf24",
            Self::Network => "#fb923c",
            Self::Ok => "#10b981",
            Self::Alert(AlertFlag::Spoofing) => "#ef4444",
            Self::Alert(AlertFlag::Masking) => "#f59e0b",
            Self::Alert(AlertFlag::TlsViolation) => "#7c3aed",
        }
    }

    const fn shape(&self) -> &'static str {
        match self {
            Self::Ok | Self::Alert(_) => "box",
            _ => "ellipse",
        }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Unique identifier.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Node kind.
    pub kind: NodeKind,
}

/// A directed edge from an event to one of its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
}

/// Directed provenance graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl ProvenanceGraph {
    /// Builds the graph for `records`.
    #[must_use]
    pub fn from_records(records: &[AuditRecord]) -> Self {
        let mut graph = Self::default();
        for record in records {
            graph.add_record(record);
        }
        graph
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn add_record(&mut self, record: &AuditRecord) {
        let index = record.audit_index;
        let event = format!("event:{index}");
        self.add_node(&event, &format!("Event {}", record.sequence), NodeKind::Event);

        let physical = format!("physical={}", record.physical_state);
        self.add_node(&physical, &physical, NodeKind::Physical);
        self.add_edge(&event, &physical);

        let reported = format!("reported={}", record.reported_state);
        self.add_node(&reported, &reported, NodeKind::Reported);
        self.add_edge(&event, &reported);

        let network = match &record.endpoint {
            Some(endpoint) => format!("net={endpoint}"),
            None => format!("net={}", record.transport),
        };
        self.add_node(&network, &network, NodeKind::Network);
        self.add_edge(&event, &network);

        if record.is_ok() {
            let ok = format!("ok:{index}");
            self.add_node(&ok, "OK", NodeKind::Ok);
            self.add_edge(&event, &ok);
        }
        for flag in record.alerts.iter() {
            let alert = format!("{}:{index}", flag.as_str());
            self.add_node(&alert, &flag.as_str().to_uppercase(), NodeKind::Alert(flag));
            self.add_edge(&event, &alert);
        }
    }

    fn add_node(&mut self, id: &str, label: &str, kind: NodeKind) {
        if self.seen.insert(id.to_string()) {
            self.nodes.push(Node {
                id: id.to_string(),
                label: label.to_string(),
                kind,
            });
        }
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    /// Renders the graph in Graphviz DOT.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph provenance {\n");
        out.push_str("    rankdir=LR;\n");
        out.push_str("    node [style=filled, fontcolor=white, fontname=\"Helvetica\"];\n");
        for node in &self.nodes {
            let _ = writeln!(
                out,
                "    \"{}\" [label=\"{}\", fillcolor=\"{}\", shape={}];",
                escape(&node.id),
                escape(&node.label),
                node.kind.color(),
                node.kind.shape()
            );
        }
        for edge in &self.edges {
            let _ = writeln!(out, "    \"{}\" -> \"{}\";", escape(&edge.from), escape(&edge.to));
        }
        out.push_str("}\n");
        out
    }

    /// Serializes the graph as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

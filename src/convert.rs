//! The editor boundary: canvas documents, topology conversion, and the
//! JSON persistence format.
//!
//! The canvas editor keeps a `{nodes, edges}` document with positions,
//! handle ids, and per-node configuration blobs. This module projects
//! that document onto the engine's [`Topology`] and round-trips it
//! through JSON for browser-local storage and file download. No
//! bit-exact compatibility is promised across versions.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::topology::{
    AclAction, AclRule, Interface, Link, LinkEnd, Node, NodeKind, StaticRoute, Topology,
};

/// Key the hosting page stores the current document under.
pub const STORAGE_KEY: &str = "packetlab.topology.v1";

// ── Editor document model ─────────────────────────────────────────────

/// Canvas position of a node. Carried through persistence untouched;
/// the engine never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-node configuration blob as the editor's forms produce it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    pub interfaces: Vec<Interface>,
    pub mac_learning: Option<bool>,
    pub vlans: Option<Vec<u16>>,
    pub routes: Option<Vec<StaticRoute>>,
    pub acl_rules: Option<Vec<AclRule>>,
    pub default_policy: Option<AclAction>,
}

/// A visual node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorNode {
    pub id: String,
    /// The lowercase device tag: host, phone, server, laptop, switch,
    /// router, firewall, cloud.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: NodeConfig,
}

/// A visual edge between two node handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// The persisted document: editor form, not engine form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorDocument {
    #[serde(default)]
    pub nodes: Vec<EditorNode>,
    #[serde(default)]
    pub edges: Vec<EditorEdge>,
}

// ── Conversion ────────────────────────────────────────────────────────

/// Build a node's engine kind from its tag and configuration blob.
/// Unknown tags degrade to plain hosts — the editor may be newer than
/// the engine and a simulation beats a refusal.
fn node_kind(node: &EditorNode) -> NodeKind {
    match node.node_type.as_str() {
        "phone" => NodeKind::Phone,
        "server" => NodeKind::Server,
        "laptop" => NodeKind::Laptop,
        "cloud" => NodeKind::Cloud,
        "switch" => NodeKind::Switch {
            mac_learning: node.data.mac_learning.unwrap_or(true),
            vlans: node
                .data
                .vlans
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect(),
        },
        "router" => NodeKind::Router {
            routes: node.data.routes.clone().unwrap_or_default(),
        },
        "firewall" => NodeKind::Firewall {
            rules: node.data.acl_rules.clone().unwrap_or_default(),
            default_policy: node.data.default_policy.unwrap_or_default(),
        },
        _ => NodeKind::Host,
    }
}

/// Derive the interface id a handle refers to.
///
/// Handle ids carry a `-source`/`-target` suffix; the stripped id must
/// name an interface on the node, otherwise the node's first interface
/// id is used, defaulting to the conventional `eth0`.
fn handle_to_iface(handle: Option<&str>, node: Option<&EditorNode>) -> String {
    let stripped = handle.map(|h| {
        h.strip_suffix("-source")
            .or_else(|| h.strip_suffix("-target"))
            .unwrap_or(h)
    });
    if let (Some(id), Some(node)) = (stripped, node) {
        if node.data.interfaces.iter().any(|i| i.id == id) {
            return id.to_string();
        }
    }
    node.and_then(|n| n.data.interfaces.first())
        .map(|i| i.id.clone())
        .unwrap_or_else(|| "eth0".to_string())
}

/// Project an editor document onto the engine topology.
pub fn to_topology(doc: &EditorDocument) -> Topology {
    let nodes = doc
        .nodes
        .iter()
        .map(|editor_node| {
            let mut node = Node::new(
                &editor_node.id,
                editor_node
                    .label
                    .clone()
                    .unwrap_or_else(|| editor_node.id.clone()),
                node_kind(editor_node),
            );
            node.interfaces = editor_node.data.interfaces.clone();
            node
        })
        .collect();

    let links = doc
        .edges
        .iter()
        .map(|edge| {
            let source = doc.nodes.iter().find(|n| n.id == edge.source);
            let target = doc.nodes.iter().find(|n| n.id == edge.target);
            Link::new(
                LinkEnd::new(
                    &edge.source,
                    handle_to_iface(edge.source_handle.as_deref(), source),
                ),
                LinkEnd::new(
                    &edge.target,
                    handle_to_iface(edge.target_handle.as_deref(), target),
                ),
            )
        })
        .collect();

    Topology { nodes, links }
}

// ── Persistence ───────────────────────────────────────────────────────

/// Serialize a document for storage or download.
pub fn to_json(doc: &EditorDocument) -> SimResult<String> {
    serde_json::to_string_pretty(doc).map_err(SimError::Serialize)
}

/// Parse a stored document.
pub fn from_json(json: &str) -> SimResult<EditorDocument> {
    serde_json::from_str(json).map_err(SimError::Document)
}

//! Canonical topology model: nodes, interfaces, links, routes, ACL rules.
//!
//! The topology is an immutable snapshot for the duration of one
//! simulation. Identifiers are the stable string ids the editor assigns;
//! the engine never invents ids of its own.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ── Interface ─────────────────────────────────────────────────────────

/// Port mode of a switch interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    /// Carries a single untagged VLAN; tags are added on ingress and
    /// stripped on egress.
    Access,
    /// Carries tagged frames for a set of allowed VLANs.
    Trunk,
}

/// A port on a node.
///
/// The MAC is the colon-hex form the editor mints (locally administered).
/// It may be left empty by a partially configured node — the engine
/// tolerates that and the analyzer reports duplicates as warnings only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: String,
    #[serde(default)]
    pub mac: String,
    /// IPv4 address in CIDR form, e.g. `"10.0.0.1/24"`. Absent on pure
    /// layer-2 devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Access VLAN for access ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PortMode>,
    /// Allowed VLANs for trunk ports; `None` means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_vlans: Option<Vec<u16>>,
}

impl Interface {
    /// A bare interface with only an id and MAC.
    pub fn new(id: impl Into<String>, mac: impl Into<String>) -> Self {
        Interface {
            id: id.into(),
            mac: mac.into(),
            ip: None,
            vlan: None,
            mode: None,
            allowed_vlans: None,
        }
    }

    /// Effective port mode; unset defaults to access.
    pub fn port_mode(&self) -> PortMode {
        self.mode.unwrap_or(PortMode::Access)
    }

    /// Configured access VLAN, defaulting to 1.
    pub fn access_vlan(&self) -> u16 {
        self.vlan.unwrap_or(1)
    }
}

// ── Routes and ACL rules ──────────────────────────────────────────────

/// A static route on a router: destination prefix, next hop, egress port.
///
/// Ordering in the route list is not significant — longest prefix wins,
/// with the earlier route breaking ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRoute {
    /// Destination prefix in CIDR form.
    pub prefix: String,
    pub next_hop: String,
    /// Interface id on this router. Routes naming a nonexistent
    /// interface are tolerated and simply never emit.
    pub egress: String,
}

/// Action of an ACL rule or a firewall default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    Allow,
    Deny,
}

impl Default for AclAction {
    fn default() -> Self {
        AclAction::Allow
    }
}

/// One ordered match-and-action rule on a firewall.
///
/// A clause left unset (or set to `"any"`) matches everything. An
/// address clause containing a `/` is matched by CIDR containment,
/// otherwise by address equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRule {
    pub id: String,
    pub order: u32,
    pub action: AclAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
}

impl AclRule {
    /// A rule matching everything, to be narrowed with the `with_*` helpers.
    pub fn new(order: u32, action: AclAction) -> Self {
        AclRule {
            id: format!("rule-{}", order),
            order,
            action,
            src_ip: None,
            dst_ip: None,
            proto: None,
            src_port: None,
            dst_port: None,
        }
    }

    pub fn with_src_ip(mut self, src: impl Into<String>) -> Self {
        self.src_ip = Some(src.into());
        self
    }

    pub fn with_dst_ip(mut self, dst: impl Into<String>) -> Self {
        self.dst_ip = Some(dst.into());
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }

    pub fn with_src_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn with_dst_port(mut self, port: u16) -> Self {
        self.dst_port = Some(port);
        self
    }
}

// ── Node ──────────────────────────────────────────────────────────────

/// Device type tag plus its type-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum NodeKind {
    Host,
    Phone,
    Server,
    Laptop,
    Cloud,
    Switch {
        #[serde(default = "default_true")]
        mac_learning: bool,
        /// VLAN database (ids >= 1).
        #[serde(default)]
        vlans: BTreeSet<u16>,
    },
    Router {
        #[serde(default)]
        routes: Vec<StaticRoute>,
    },
    Firewall {
        #[serde(default)]
        rules: Vec<AclRule>,
        #[serde(default)]
        default_policy: AclAction,
    },
}

fn default_true() -> bool {
    true
}

impl NodeKind {
    /// Host-like devices originate packets and terminate delivery.
    pub fn is_host_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Host | NodeKind::Phone | NodeKind::Server | NodeKind::Laptop
        )
    }

    /// The lowercase tag used in editor documents and messages.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Host => "host",
            NodeKind::Phone => "phone",
            NodeKind::Server => "server",
            NodeKind::Laptop => "laptop",
            NodeKind::Cloud => "cloud",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Router { .. } => "router",
            NodeKind::Firewall { .. } => "firewall",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A device in the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Ordered list of ports; iteration order is the configured order
    /// and is semantically significant (flood and route emission order).
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            id: id.into(),
            label: label.into(),
            kind,
            interfaces: Vec::new(),
        }
    }

    /// Look up an interface by id.
    pub fn iface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    /// The first configured interface, if any.
    pub fn first_iface(&self) -> Option<&Interface> {
        self.interfaces.first()
    }
}

// ── Links ─────────────────────────────────────────────────────────────

/// One endpoint of a link: a `(node, interface)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEnd {
    pub node: String,
    pub iface: String,
}

impl LinkEnd {
    pub fn new(node: impl Into<String>, iface: impl Into<String>) -> Self {
        LinkEnd {
            node: node.into(),
            iface: iface.into(),
        }
    }

    fn is(&self, node: &str, iface: &str) -> bool {
        self.node == node && self.iface == iface
    }
}

/// An undirected edge between two `(node, interface)` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub a: LinkEnd,
    pub b: LinkEnd,
}

impl Link {
    pub fn new(a: LinkEnd, b: LinkEnd) -> Self {
        Link { a, b }
    }

    /// The far endpoint if `(node, iface)` is one of this link's ends.
    pub fn peer_of(&self, node: &str, iface: &str) -> Option<&LinkEnd> {
        if self.a.is(node, iface) {
            Some(&self.b)
        } else if self.b.is(node, iface) {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// The connected peer of `(node, iface)` across the link set, if any.
///
/// A `(node, interface)` pair appears in at most one link, so the first
/// match is the only match.
pub fn peer_of<'a>(links: &'a [Link], node: &str, iface: &str) -> Option<&'a LinkEnd> {
    links.iter().find_map(|l| l.peer_of(node, iface))
}

// ── Topology ──────────────────────────────────────────────────────────

/// The complete engine-side topology: nodes plus undirected links.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Topology {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The connected peer of `(node, iface)`, if any.
    pub fn peer_of(&self, node: &str, iface: &str) -> Option<&LinkEnd> {
        peer_of(&self.links, node, iface)
    }
}

//! Fluent builder for constructing topologies in tests and demos.
//!
//! Hides the boilerplate of interfaces, links, routes and ACL rules
//! while keeping everything deterministic: infrastructure MACs are
//! minted from a counter, so two identical builder programs produce
//! identical topologies.
//!
//! # Example
//! ```rust
//! use packetlab::builder::{access, TopologyBuilder};
//!
//! let topo = TopologyBuilder::new()
//!     .host("a", "02:AA:00:00:00:01", "192.168.1.10/24")
//!     .host("b", "02:AA:00:00:00:02", "192.168.1.11/24")
//!     .switch("s1", &[access("p1", 1), access("p2", 1)])
//!     .link("a", "eth0", "s1", "p1")
//!     .link("b", "eth0", "s1", "p2")
//!     .build();
//! assert_eq!(topo.nodes.len(), 3);
//! ```

use std::collections::BTreeSet;

use crate::topology::{
    AclAction, AclRule, Interface, Link, LinkEnd, Node, NodeKind, PortMode, StaticRoute, Topology,
};

// ── Port specs ────────────────────────────────────────────────────────

/// Declarative switch-port description consumed by [`TopologyBuilder::switch`].
#[derive(Debug, Clone)]
pub struct PortSpec {
    id: String,
    mode: PortMode,
    vlan: Option<u16>,
    allowed_vlans: Option<Vec<u16>>,
}

/// An access port carrying `vlan` untagged.
pub fn access(id: &str, vlan: u16) -> PortSpec {
    PortSpec {
        id: id.to_string(),
        mode: PortMode::Access,
        vlan: Some(vlan),
        allowed_vlans: None,
    }
}

/// A trunk port carrying all VLANs.
pub fn trunk(id: &str) -> PortSpec {
    PortSpec {
        id: id.to_string(),
        mode: PortMode::Trunk,
        vlan: None,
        allowed_vlans: None,
    }
}

/// A trunk port restricted to an explicit allowed set.
pub fn trunk_allowing(id: &str, allowed: &[u16]) -> PortSpec {
    PortSpec {
        id: id.to_string(),
        mode: PortMode::Trunk,
        vlan: None,
        allowed_vlans: Some(allowed.to_vec()),
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Fluent topology builder.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    mac_seq: u16,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        TopologyBuilder::default()
    }

    /// Mint the next locally administered infrastructure MAC.
    fn next_mac(&mut self) -> String {
        self.mac_seq += 1;
        format!(
            "02:00:00:00:{:02X}:{:02X}",
            self.mac_seq >> 8,
            self.mac_seq & 0xFF
        )
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    // ── Host-like nodes ───────────────────────────────────────

    /// A host with one `eth0` interface.
    pub fn host(self, id: &str, mac: &str, ip: &str) -> Self {
        self.host_like(NodeKind::Host, id, mac, ip)
    }

    /// A host-like node (host, phone, server, laptop) with one `eth0`.
    pub fn host_like(mut self, kind: NodeKind, id: &str, mac: &str, ip: &str) -> Self {
        let mut node = Node::new(id, id.to_uppercase(), kind);
        let mut iface = Interface::new("eth0", mac);
        iface.ip = Some(ip.to_string());
        node.interfaces = vec![iface];
        self.nodes.push(node);
        self
    }

    /// A cloud endpoint with one `eth0` interface and no IP.
    pub fn cloud(mut self, id: &str) -> Self {
        let mac = self.next_mac();
        let mut node = Node::new(id, id.to_uppercase(), NodeKind::Cloud);
        node.interfaces = vec![Interface::new("eth0", mac)];
        self.nodes.push(node);
        self
    }

    // ── Infrastructure nodes ──────────────────────────────────

    /// A switch with MAC learning enabled.
    pub fn switch(self, id: &str, ports: &[PortSpec]) -> Self {
        self.switch_config(id, ports, true)
    }

    /// A switch with explicit learning configuration.
    pub fn switch_config(mut self, id: &str, ports: &[PortSpec], mac_learning: bool) -> Self {
        let mut vlans: BTreeSet<u16> = BTreeSet::from([1]);
        let mut interfaces = Vec::with_capacity(ports.len());
        for port in ports {
            let mac = self.next_mac();
            let mut iface = Interface::new(&port.id, mac);
            iface.mode = Some(port.mode);
            iface.vlan = port.vlan;
            iface.allowed_vlans = port.allowed_vlans.clone();
            if let Some(vlan) = port.vlan {
                vlans.insert(vlan);
            }
            if let Some(allowed) = &port.allowed_vlans {
                vlans.extend(allowed.iter().copied());
            }
            interfaces.push(iface);
        }
        let mut node = Node::new(
            id,
            id.to_uppercase(),
            NodeKind::Switch { mac_learning, vlans },
        );
        node.interfaces = interfaces;
        self.nodes.push(node);
        self
    }

    /// A router with `(interface id, CIDR address)` pairs.
    pub fn router(mut self, id: &str, ifaces: &[(&str, &str)]) -> Self {
        let interfaces = ifaces
            .iter()
            .map(|(iface_id, cidr)| {
                let mac = self.next_mac();
                let mut iface = Interface::new(*iface_id, mac);
                iface.ip = Some(cidr.to_string());
                iface
            })
            .collect();
        let mut node = Node::new(id, id.to_uppercase(), NodeKind::Router { routes: vec![] });
        node.interfaces = interfaces;
        self.nodes.push(node);
        self
    }

    /// Append a static route to a previously declared router.
    pub fn route(mut self, router_id: &str, prefix: &str, next_hop: &str, egress: &str) -> Self {
        if let Some(node) = self.node_mut(router_id) {
            if let NodeKind::Router { routes } = &mut node.kind {
                routes.push(StaticRoute {
                    prefix: prefix.to_string(),
                    next_hop: next_hop.to_string(),
                    egress: egress.to_string(),
                });
            }
        }
        self
    }

    /// A firewall with `(interface id, CIDR address)` pairs.
    pub fn firewall(mut self, id: &str, ifaces: &[(&str, &str)], default_policy: AclAction) -> Self {
        let interfaces = ifaces
            .iter()
            .map(|(iface_id, cidr)| {
                let mac = self.next_mac();
                let mut iface = Interface::new(*iface_id, mac);
                iface.ip = Some(cidr.to_string());
                iface
            })
            .collect();
        let mut node = Node::new(
            id,
            id.to_uppercase(),
            NodeKind::Firewall {
                rules: vec![],
                default_policy,
            },
        );
        node.interfaces = interfaces;
        self.nodes.push(node);
        self
    }

    /// Append an ACL rule to a previously declared firewall.
    pub fn rule(mut self, firewall_id: &str, rule: AclRule) -> Self {
        if let Some(node) = self.node_mut(firewall_id) {
            if let NodeKind::Firewall { rules, .. } = &mut node.kind {
                rules.push(rule);
            }
        }
        self
    }

    // ── Links ─────────────────────────────────────────────────

    /// An undirected link between two `(node, interface)` endpoints.
    pub fn link(mut self, a_node: &str, a_iface: &str, b_node: &str, b_iface: &str) -> Self {
        self.links.push(Link::new(
            LinkEnd::new(a_node, a_iface),
            LinkEnd::new(b_node, b_iface),
        ));
        self
    }

    pub fn build(self) -> Topology {
        Topology {
            nodes: self.nodes,
            links: self.links,
        }
    }
}

//! Per-device packet-processing state machines.
//!
//! Every behavior is a pure function from `(device state, ingress
//! interface, packet, links, clock)` to `(emitted events, trace hops,
//! delivered?)` — with one sanctioned exception: a switch call also
//! mutates that switch's own MAC table.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`host`] | [`HostDevice`] (host/phone/server/laptop), [`CloudDevice`] |
//! | [`switch`] | [`SwitchDevice`] — VLANs, learning, flood/forward |
//! | [`router`] | [`RouterDevice`] — longest-prefix routing, TTL |
//! | [`firewall`] | [`FirewallDevice`] — ordered ACL filter |
//! | [`mac_table`] | [`MacTable`], [`MacTableEntry`], [`LearnOutcome`] |

pub mod firewall;
pub mod host;
pub mod mac_table;
pub mod router;
pub mod switch;

pub use firewall::FirewallDevice;
pub use host::{CloudDevice, HostDevice};
pub use mac_table::{LearnOutcome, MacTable, MacTableEntry};
pub use router::RouterDevice;
pub use switch::SwitchDevice;

use crate::packet::Packet;
use crate::queue::{PacketEvent, SimTime};
use crate::topology::{Link, Node, NodeKind};
use crate::trace::{TraceAction, TraceHop};


// ── Device output ─────────────────────────────────────────────────────

/// What one device call produced: follow-up events, trace hops, and
/// whether the packet terminated here.
#[derive(Debug, Clone, Default)]
pub struct DeviceOutput {
    pub events: Vec<PacketEvent>,
    pub trace: Vec<TraceHop>,
    pub delivered: bool,
}

impl DeviceOutput {
    pub fn new() -> Self {
        DeviceOutput::default()
    }

    pub(crate) fn push_hop(
        &mut self,
        time: SimTime,
        node: &str,
        label: &str,
        iface: &str,
        action: TraceAction,
        reason: impl Into<String>,
        packet: &Packet,
    ) {
        self.trace.push(TraceHop {
            time,
            node: node.to_string(),
            node_label: label.to_string(),
            iface: iface.to_string(),
            action,
            reason: reason.into(),
            packet: packet.clone(),
        });
    }
}

// ── Device dispatch ───────────────────────────────────────────────────

/// A device instance, constructed by tag from a topology [`Node`].
///
/// The driver creates one per node at startup and discards them when
/// the result is returned.
#[derive(Debug, Clone)]
pub enum Device {
    Host(HostDevice),
    Cloud(CloudDevice),
    Switch(SwitchDevice),
    Router(RouterDevice),
    Firewall(FirewallDevice),
}

impl Device {
    /// Constructor-by-tag factory.
    pub fn from_node(node: &Node) -> Device {
        match &node.kind {
            NodeKind::Host | NodeKind::Phone | NodeKind::Server | NodeKind::Laptop => {
                Device::Host(HostDevice::from_node(node))
            }
            NodeKind::Cloud => Device::Cloud(CloudDevice::from_node(node)),
            NodeKind::Switch { mac_learning, vlans } => {
                Device::Switch(SwitchDevice::from_node(node, *mac_learning, vlans.clone()))
            }
            NodeKind::Router { routes } => {
                Device::Router(RouterDevice::from_node(node, routes.clone()))
            }
            NodeKind::Firewall { rules, default_policy } => Device::Firewall(
                FirewallDevice::from_node(node, rules.clone(), *default_policy),
            ),
        }
    }

    /// Process one delivered packet.
    ///
    /// Takes `&mut self` solely for the switch arm: a switch owns its
    /// MAC table and learning mutates it. Every other device type is
    /// read-only.
    pub fn process(
        &mut self,
        iface: &str,
        packet: &Packet,
        links: &[Link],
        now: SimTime,
    ) -> DeviceOutput {
        match self {
            Device::Host(host) => host.process(iface, packet, now),
            Device::Cloud(cloud) => cloud.process(iface, packet, now),
            Device::Switch(switch) => switch.process(iface, packet, links, now),
            Device::Router(router) => router.process(iface, packet, links, now),
            Device::Firewall(firewall) => firewall.process(iface, packet, links, now),
        }
    }
}

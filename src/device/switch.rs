//! Layer-2 switch: VLAN resolution, MAC learning, flood/forward.
//!
//! A switch never delivers — it only moves frames. The only mutable
//! state it touches is the MAC table it owns, so the learning side
//! effect is confined to the device instance itself.

use std::collections::BTreeSet;

use tracing::trace;

use crate::packet::Packet;
use crate::queue::{PacketEvent, SimTime};
use crate::subnet::{is_broadcast_mac, is_multicast_mac, normalize_mac};
use crate::topology::{peer_of, Interface, Link, Node, PortMode};
use crate::trace::TraceAction;

use super::{DeviceOutput, MacTable};

/// A switch instance with its own MAC table.
#[derive(Debug, Clone)]
pub struct SwitchDevice {
    pub id: String,
    pub label: String,
    pub interfaces: Vec<Interface>,
    pub mac_learning: bool,
    /// VLAN database (ids >= 1). Configuration surface for the editor;
    /// forwarding decisions are driven by per-port VLAN fields.
    pub vlans: BTreeSet<u16>,
    table: MacTable,
}

impl SwitchDevice {
    pub fn from_node(node: &Node, mac_learning: bool, vlans: BTreeSet<u16>) -> Self {
        SwitchDevice {
            id: node.id.clone(),
            label: node.label.clone(),
            interfaces: node.interfaces.clone(),
            mac_learning,
            vlans,
            table: MacTable::new(),
        }
    }

    /// The bindings this switch has learned so far.
    pub fn mac_table(&self) -> &MacTable {
        &self.table
    }

    fn iface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    /// The VLAN a frame belongs to after ingress classification.
    ///
    /// Access ports assign their configured VLAN; trunk ports trust the
    /// tag (untagged defaults to 1) and enforce their allowed set.
    fn ingress_vlan(iface: &Interface, packet: &Packet) -> Result<u16, u16> {
        match iface.port_mode() {
            PortMode::Access => Ok(iface.access_vlan()),
            PortMode::Trunk => {
                let vlan = packet.vlan.unwrap_or(1);
                match &iface.allowed_vlans {
                    Some(allowed) if !allowed.contains(&vlan) => Err(vlan),
                    _ => Ok(vlan),
                }
            }
        }
    }

    /// May `iface` transmit frames belonging to `vlan`?
    fn carries(iface: &Interface, vlan: u16) -> bool {
        match iface.port_mode() {
            PortMode::Access => iface.access_vlan() == vlan,
            PortMode::Trunk => iface
                .allowed_vlans
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&vlan)),
        }
    }

    /// Tag handling on egress: stripped on access, preserved on trunk.
    fn egress_packet(packet: &Packet, egress: &Interface, vlan: u16) -> Packet {
        let mut copy = packet.clone();
        copy.vlan = match egress.port_mode() {
            PortMode::Access => None,
            PortMode::Trunk => Some(vlan),
        };
        copy
    }

    pub fn process(
        &mut self,
        iface_id: &str,
        packet: &Packet,
        links: &[Link],
        now: SimTime,
    ) -> DeviceOutput {
        let mut out = DeviceOutput::new();
        let ingress = match self.iface(iface_id) {
            Some(iface) => iface,
            None => return out,
        };

        // Ingress VLAN classification.
        let vlan = match Self::ingress_vlan(ingress, packet) {
            Ok(vlan) => vlan,
            Err(rejected) => {
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    iface_id,
                    TraceAction::Drop,
                    format!("VLAN {} not allowed on trunk", rejected),
                    packet,
                );
                return out;
            }
        };

        // The frame carries its effective VLAN while inside the switch.
        let mut frame = packet.clone();
        frame.vlan = Some(vlan);

        // Source learning. Re-observing the same binding stays silent;
        // a new or moved binding emits a `learn` hop.
        if self.mac_learning && !frame.src_mac.is_empty() {
            let outcome = self.table.learn(&frame.src_mac, vlan, iface_id, now);
            if outcome.is_change() {
                trace!(
                    switch = %self.id,
                    mac = %normalize_mac(&frame.src_mac),
                    vlan,
                    iface = iface_id,
                    "learned source address"
                );
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    iface_id,
                    TraceAction::Learn,
                    format!(
                        "Learned {} on {} (VLAN {})",
                        normalize_mac(&frame.src_mac),
                        iface_id,
                        vlan
                    ),
                    &frame.learn_snapshot(),
                );
            }
        }

        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::Receive,
            format!("Received on {} (VLAN {})", iface_id, vlan),
            &frame,
        );

        // Egress decision: group addresses always flood; known unicast
        // on a different port forwards; everything else floods.
        if is_broadcast_mac(&frame.dst_mac) || is_multicast_mac(&frame.dst_mac) {
            self.flood(
                &mut out,
                iface_id,
                &frame,
                vlan,
                links,
                now,
                format!("Broadcast flood on VLAN {}", vlan),
            );
            return out;
        }

        let known = self
            .table
            .lookup(&frame.dst_mac, vlan)
            .filter(|entry| entry.iface != iface_id)
            .map(|entry| entry.iface.clone());

        match known.as_deref().and_then(|id| self.iface(id)) {
            Some(egress) => {
                let copy = Self::egress_packet(&frame, egress, vlan);
                if let Some(peer) = peer_of(links, &self.id, &egress.id) {
                    out.push_hop(
                        now,
                        &self.id,
                        &self.label,
                        &egress.id,
                        TraceAction::Forward,
                        format!(
                            "Forwarding to {} via {}",
                            normalize_mac(&frame.dst_mac),
                            egress.id
                        ),
                        &copy,
                    );
                    out.events.push(PacketEvent::new(
                        copy,
                        peer.node.clone(),
                        peer.iface.clone(),
                        now,
                    ));
                }
            }
            None => {
                self.flood(
                    &mut out,
                    iface_id,
                    &frame,
                    vlan,
                    links,
                    now,
                    format!(
                        "Destination {} unknown, flooding VLAN {}",
                        normalize_mac(&frame.dst_mac),
                        vlan
                    ),
                );
            }
        }
        out
    }

    /// Emit one `flood` hop, then a copy of the frame out of every
    /// admissible interface except the ingress.
    #[allow(clippy::too_many_arguments)]
    fn flood(
        &self,
        out: &mut DeviceOutput,
        ingress_id: &str,
        frame: &Packet,
        vlan: u16,
        links: &[Link],
        now: SimTime,
        reason: String,
    ) {
        out.push_hop(
            now,
            &self.id,
            &self.label,
            ingress_id,
            TraceAction::Flood,
            reason,
            frame,
        );
        for iface in &self.interfaces {
            if iface.id == ingress_id || !Self::carries(iface, vlan) {
                continue;
            }
            if let Some(peer) = peer_of(links, &self.id, &iface.id) {
                let copy = Self::egress_packet(frame, iface, vlan);
                out.events.push(PacketEvent::new(
                    copy,
                    peer.node.clone(),
                    peer.iface.clone(),
                    now,
                ));
            }
        }
    }
}

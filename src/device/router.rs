//! Layer-3 router: directly connected subnets, longest-prefix static
//! routes, TTL accounting.
//!
//! MAC handling is deliberately simplified: the router rewrites the
//! source MAC to the egress interface and leaves the destination MAC
//! untouched. There is no ARP exchange; downstream switch learning
//! carries delivery the rest of the way.

use tracing::trace;

use crate::packet::Packet;
use crate::queue::{PacketEvent, SimTime};
use crate::subnet::{cidr_contains, host_addr, ips_equal, longest_prefix_match};
use crate::topology::{peer_of, Interface, Link, Node, StaticRoute};
use crate::trace::TraceAction;

use super::DeviceOutput;

/// A router instance.
#[derive(Debug, Clone)]
pub struct RouterDevice {
    pub id: String,
    pub label: String,
    pub interfaces: Vec<Interface>,
    pub routes: Vec<StaticRoute>,
}

impl RouterDevice {
    pub fn from_node(node: &Node, routes: Vec<StaticRoute>) -> Self {
        RouterDevice {
            id: node.id.clone(),
            label: node.label.clone(),
            interfaces: node.interfaces.clone(),
            routes,
        }
    }

    fn iface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    /// Is the destination one of this router's own addresses?
    fn is_local(&self, dst_ip: &str) -> bool {
        self.interfaces
            .iter()
            .filter_map(|i| i.ip.as_deref())
            .any(|ip| ips_equal(ip, dst_ip))
    }

    pub fn process(
        &self,
        iface_id: &str,
        packet: &Packet,
        links: &[Link],
        now: SimTime,
    ) -> DeviceOutput {
        let mut out = DeviceOutput::new();

        // The only case a router consumes a packet.
        if let Some(dst_ip) = packet.dst_ip.as_deref() {
            if self.is_local(dst_ip) {
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    iface_id,
                    TraceAction::Deliver,
                    format!("Delivered to {}", self.label),
                    packet,
                );
                out.delivered = true;
                return out;
            }
        }

        if packet.ttl <= 1 {
            out.push_hop(
                now,
                &self.id,
                &self.label,
                iface_id,
                TraceAction::Drop,
                "TTL expired",
                packet,
            );
            return out;
        }
        let mut packet = packet.clone();
        packet.ttl -= 1;

        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::Receive,
            format!("Received on {}", iface_id),
            &packet,
        );

        let dst_ip = match packet.dst_ip.clone() {
            Some(ip) => ip,
            None => {
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    iface_id,
                    TraceAction::Drop,
                    "No destination IP for routing",
                    &packet,
                );
                return out;
            }
        };

        // Directly connected networks first; interface order decides.
        for iface in &self.interfaces {
            if iface.id == iface_id {
                continue;
            }
            let ip = match iface.ip.as_deref() {
                Some(ip) if ip.contains('/') => ip,
                _ => continue,
            };
            if cidr_contains(ip, &dst_ip) {
                trace!(router = %self.id, dst = %dst_ip, iface = %iface.id, "directly connected");
                self.emit(
                    &mut out,
                    &packet,
                    iface,
                    links,
                    now,
                    format!("Routing to directly connected network via {}", iface.id),
                );
                return out;
            }
        }

        // Static routes, longest prefix wins.
        if let Some(route) = longest_prefix_match(&self.routes, &dst_ip) {
            trace!(router = %self.id, dst = %dst_ip, prefix = %route.prefix, "static route");
            if let Some(egress) = self.iface(&route.egress) {
                self.emit(
                    &mut out,
                    &packet,
                    egress,
                    links,
                    now,
                    format!(
                        "Routing via {} next hop {}",
                        route.prefix,
                        host_addr(&route.next_hop)
                    ),
                );
            }
            // A route naming a missing interface emits nothing; the
            // simulation ends without a delivery.
            return out;
        }

        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::Drop,
            format!("No route to {}", dst_ip),
            &packet,
        );
        out
    }

    /// Rewrite the source MAC to the egress interface and forward to
    /// its link peer. With no peer the step is silently suppressed.
    fn emit(
        &self,
        out: &mut DeviceOutput,
        packet: &Packet,
        egress: &Interface,
        links: &[Link],
        now: SimTime,
        reason: String,
    ) {
        let peer = match peer_of(links, &self.id, &egress.id) {
            Some(peer) => peer,
            None => return,
        };
        let mut copy = packet.clone();
        copy.src_mac = egress.mac.clone();

        out.push_hop(
            now,
            &self.id,
            &self.label,
            &egress.id,
            TraceAction::Route,
            reason,
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

//! Host-like devices (host, phone, server, laptop) and cloud endpoints.
//!
//! Hosts originate packets and terminate delivery; they never forward.
//! A cloud accepts anything arriving on its interface and never
//! originates.

use crate::packet::{Packet, PacketSpec, DEFAULT_TTL};
use crate::queue::{PacketEvent, SimTime};
use crate::subnet::{host_addr, ips_equal, is_broadcast_mac, macs_equal};
use crate::topology::{peer_of, Interface, Link, Node};
use crate::trace::TraceAction;

use super::DeviceOutput;

// ── Host ──────────────────────────────────────────────────────────────

/// A host-like device: host, phone, server or laptop.
#[derive(Debug, Clone)]
pub struct HostDevice {
    pub id: String,
    pub label: String,
    pub interfaces: Vec<Interface>,
}

impl HostDevice {
    pub fn from_node(node: &Node) -> Self {
        HostDevice {
            id: node.id.clone(),
            label: node.label.clone(),
            interfaces: node.interfaces.clone(),
        }
    }

    /// Synthesize and send the initial packet out the first interface.
    ///
    /// The caller supplies the resolved destination MAC/IP and the
    /// minted packet id; everything else comes from this host's first
    /// interface and the spec.
    pub fn originate(
        &self,
        dst_mac: &str,
        dst_ip: Option<String>,
        spec: &PacketSpec,
        packet_id: String,
        links: &[Link],
        now: SimTime,
    ) -> DeviceOutput {
        let mut out = DeviceOutput::new();
        let iface = match self.interfaces.first() {
            Some(iface) => iface,
            None => return out,
        };

        let packet = Packet {
            id: packet_id,
            src_mac: iface.mac.clone(),
            dst_mac: dst_mac.to_string(),
            src_ip: iface.ip.as_deref().map(|ip| host_addr(ip).to_string()),
            dst_ip,
            vlan: None,
            protocol: spec.protocol,
            src_port: spec.src_port,
            dst_port: spec.dst_port,
            ttl: spec.ttl.unwrap_or(DEFAULT_TTL),
            payload: spec.payload.clone(),
        };

        match peer_of(links, &self.id, &iface.id) {
            Some(peer) => {
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    &iface.id,
                    TraceAction::Forward,
                    format!(
                        "Sending {} to {}",
                        packet.protocol,
                        packet.dst_ip.as_deref().unwrap_or(&packet.dst_mac)
                    ),
                    &packet,
                );
                out.events.push(PacketEvent::new(
                    packet,
                    peer.node.clone(),
                    peer.iface.clone(),
                    now,
                ));
            }
            None => {
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    &iface.id,
                    TraceAction::Drop,
                    "No link connected",
                    &packet,
                );
            }
        }
        out
    }

    /// Reception: deliver if the packet is addressed to us, drop otherwise.
    pub fn process(&self, iface_id: &str, packet: &Packet, now: SimTime) -> DeviceOutput {
        let mut out = DeviceOutput::new();
        let iface = self.interfaces.iter().find(|i| i.id == iface_id);

        let for_us = match iface {
            Some(iface) => {
                macs_equal(&packet.dst_mac, &iface.mac)
                    || is_broadcast_mac(&packet.dst_mac)
                    || matches!(
                        (&packet.dst_ip, &iface.ip),
                        (Some(dst), Some(ip)) if ips_equal(dst, ip)
                    )
            }
            None => false,
        };

        if for_us {
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
        } else {
            out.push_hop(
                now,
                &self.id,
                &self.label,
                iface_id,
                TraceAction::Drop,
                "Packet not addressed to this host",
                packet,
            );
        }
        out
    }
}

// ── Cloud ─────────────────────────────────────────────────────────────

/// A cloud endpoint: accepts any packet arriving on its interface.
#[derive(Debug, Clone)]
pub struct CloudDevice {
    pub id: String,
    pub label: String,
}

impl CloudDevice {
    pub fn from_node(node: &Node) -> Self {
        CloudDevice {
            id: node.id.clone(),
            label: node.label.clone(),
        }
    }

    pub fn process(&self, iface_id: &str, packet: &Packet, now: SimTime) -> DeviceOutput {
        let mut out = DeviceOutput::new();
        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::Deliver,
            "Accepted by cloud endpoint",
            packet,
        );
        out.delivered = true;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{LinkEnd, NodeKind};

    fn host(id: &str, mac: &str, ip: &str) -> HostDevice {
        let mut node = Node::new(id, id.to_uppercase(), NodeKind::Host);
        let mut iface = Interface::new("eth0", mac);
        iface.ip = Some(ip.to_string());
        node.interfaces.push(iface);
        HostDevice::from_node(&node)
    }

    fn link(a: (&str, &str), b: (&str, &str)) -> Link {
        Link::new(LinkEnd::new(a.0, a.1), LinkEnd::new(b.0, b.1))
    }

    #[test]
    fn test_originate_emits_one_event() {
        let a = host("a", "02:AA:00:00:00:01", "10.0.0.1/24");
        let links = vec![link(("a", "eth0"), ("s1", "eth1"))];
        let spec = PacketSpec::ping("a", "b");

        let out = a.originate(
            "02:AA:00:00:00:02",
            Some("10.0.0.2".into()),
            &spec,
            "pkt-0".into(),
            &links,
            SimTime::ZERO,
        );

        assert_eq!(out.events.len(), 1);
        let event = &out.events[0];
        assert_eq!(event.node, "s1");
        assert_eq!(event.iface, "eth1");
        assert_eq!(event.packet.src_mac, "02:AA:00:00:00:01");
        assert_eq!(event.packet.src_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.packet.ttl, DEFAULT_TTL);
        assert!(event.packet.vlan.is_none());

        assert_eq!(out.trace.len(), 1);
        assert_eq!(out.trace[0].action, TraceAction::Forward);
        assert!(!out.delivered);
    }

    #[test]
    fn test_originate_without_link_drops() {
        let a = host("a", "02:AA:00:00:00:01", "10.0.0.1/24");
        let spec = PacketSpec::ping("a", "b");

        let out = a.originate(
            "02:AA:00:00:00:02",
            None,
            &spec,
            "pkt-0".into(),
            &[],
            SimTime::ZERO,
        );

        assert!(out.events.is_empty());
        assert_eq!(out.trace.len(), 1);
        assert_eq!(out.trace[0].action, TraceAction::Drop);
        assert_eq!(out.trace[0].reason, "No link connected");
    }

    #[test]
    fn test_originate_honors_ttl_override() {
        let a = host("a", "02:AA:00:00:00:01", "10.0.0.1/24");
        let links = vec![link(("a", "eth0"), ("r1", "eth0"))];
        let mut spec = PacketSpec::ping("a", "b");
        spec.ttl = Some(1);

        let out = a.originate("02:AA:00:00:00:02", None, &spec, "pkt-0".into(), &links, SimTime::ZERO);
        assert_eq!(out.events[0].packet.ttl, 1);
    }

    fn icmp_packet(dst_mac: &str, dst_ip: Option<&str>) -> Packet {
        Packet {
            id: "pkt-0".into(),
            src_mac: "02:AA:00:00:00:09".into(),
            dst_mac: dst_mac.into(),
            src_ip: None,
            dst_ip: dst_ip.map(Into::into),
            vlan: None,
            protocol: crate::packet::Protocol::Icmp,
            src_port: None,
            dst_port: None,
            ttl: 64,
            payload: None,
        }
    }

    #[test]
    fn test_delivery_by_mac() {
        let b = host("b", "02:AA:00:00:00:02", "10.0.0.2/24");
        let out = b.process("eth0", &icmp_packet("02:aa:00:00:00:02", None), SimTime::new(2));
        assert!(out.delivered);
        assert_eq!(out.trace[0].action, TraceAction::Deliver);
    }

    #[test]
    fn test_delivery_by_broadcast() {
        let b = host("b", "02:AA:00:00:00:02", "10.0.0.2/24");
        let out = b.process("eth0", &icmp_packet("FF:FF:FF:FF:FF:FF", None), SimTime::new(2));
        assert!(out.delivered);
    }

    #[test]
    fn test_delivery_by_ip() {
        let b = host("b", "02:AA:00:00:00:02", "10.0.0.2/24");
        let out = b.process(
            "eth0",
            &icmp_packet("02:AA:00:00:00:77", Some("10.0.0.2")),
            SimTime::new(2),
        );
        assert!(out.delivered);
    }

    #[test]
    fn test_drop_when_not_addressed() {
        let b = host("b", "02:AA:00:00:00:02", "10.0.0.2/24");
        let out = b.process(
            "eth0",
            &icmp_packet("02:AA:00:00:00:77", Some("10.0.0.99")),
            SimTime::new(2),
        );
        assert!(!out.delivered);
        assert!(out.events.is_empty());
        assert_eq!(out.trace[0].action, TraceAction::Drop);
        assert_eq!(out.trace[0].reason, "Packet not addressed to this host");
    }

    #[test]
    fn test_cloud_accepts_anything() {
        let node = Node::new("c1", "Cloud", NodeKind::Cloud);
        let cloud = CloudDevice::from_node(&node);
        let out = cloud.process("eth0", &icmp_packet("02:AA:00:00:00:77", None), SimTime::new(3));
        assert!(out.delivered);
        assert_eq!(out.trace[0].action, TraceAction::Deliver);
    }
}

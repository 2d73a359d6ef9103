//! Stateless firewall: ordered ACL evaluation with a default policy.
//!
//! Rules are evaluated in ascending `order`; the first rule whose every
//! configured clause matches decides the packet. No connection state is
//! kept — each packet is judged alone.

use crate::packet::Packet;
use crate::queue::{PacketEvent, SimTime};
use crate::subnet::{cidr_contains, ips_equal};
use crate::topology::{peer_of, AclAction, AclRule, Interface, Link, Node};
use crate::trace::TraceAction;

use super::DeviceOutput;

/// A firewall instance. Rules are kept sorted by `order`.
#[derive(Debug, Clone)]
pub struct FirewallDevice {
    pub id: String,
    pub label: String,
    pub interfaces: Vec<Interface>,
    pub rules: Vec<AclRule>,
    pub default_policy: AclAction,
}

impl FirewallDevice {
    pub fn from_node(node: &Node, mut rules: Vec<AclRule>, default_policy: AclAction) -> Self {
        rules.sort_by_key(|r| r.order);
        FirewallDevice {
            id: node.id.clone(),
            label: node.label.clone(),
            interfaces: node.interfaces.clone(),
            rules,
            default_policy,
        }
    }

    /// An address clause matches when unset or `"any"`; a value with a
    /// `/` matches by CIDR containment, anything else by equality.
    fn ip_clause_matches(clause: Option<&str>, addr: Option<&str>) -> bool {
        let clause = match clause {
            None => return true,
            Some(c) if c.trim().is_empty() || c.trim().eq_ignore_ascii_case("any") => return true,
            Some(c) => c.trim(),
        };
        let addr = match addr {
            Some(addr) => addr,
            None => return false,
        };
        if clause.contains('/') {
            cidr_contains(clause, addr)
        } else {
            ips_equal(clause, addr)
        }
    }

    fn port_clause_matches(clause: Option<u16>, port: Option<u16>) -> bool {
        match clause {
            None => true,
            Some(wanted) => port == Some(wanted),
        }
    }

    /// Every configured clause must match.
    fn rule_matches(rule: &AclRule, packet: &Packet) -> bool {
        packet.protocol.matches_clause(rule.proto.as_deref())
            && Self::ip_clause_matches(rule.src_ip.as_deref(), packet.src_ip.as_deref())
            && Self::ip_clause_matches(rule.dst_ip.as_deref(), packet.dst_ip.as_deref())
            && Self::port_clause_matches(rule.src_port, packet.src_port)
            && Self::port_clause_matches(rule.dst_port, packet.dst_port)
    }

    /// Is the destination one of this firewall's own addresses?
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

        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::Receive,
            format!("Received on {}", iface_id),
            packet,
        );

        let verdict = self.rules.iter().find(|rule| Self::rule_matches(rule, packet));
        let (action, reason_allow, reason_deny) = match verdict {
            Some(rule) => (
                rule.action,
                format!("Allowed by rule {}", rule.order),
                format!("Denied by rule {}", rule.order),
            ),
            None => (
                self.default_policy,
                "Allowed by default policy".to_string(),
                "Denied by default policy".to_string(),
            ),
        };

        if action == AclAction::Deny {
            out.push_hop(
                now,
                &self.id,
                &self.label,
                iface_id,
                TraceAction::AclDeny,
                reason_deny,
                packet,
            );
            return out;
        }

        out.push_hop(
            now,
            &self.id,
            &self.label,
            iface_id,
            TraceAction::AclAllow,
            reason_allow,
            packet,
        );

        // Forward out the first non-ingress interface that has a peer,
        // rewriting the source MAC to that interface. With no eligible
        // egress the packet simply stops here.
        for iface in &self.interfaces {
            if iface.id == iface_id {
                continue;
            }
            if let Some(peer) = peer_of(links, &self.id, &iface.id) {
                let mut copy = packet.clone();
                copy.src_mac = iface.mac.clone();
                out.push_hop(
                    now,
                    &self.id,
                    &self.label,
                    &iface.id,
                    TraceAction::Forward,
                    format!("Forwarding via {}", iface.id),
                    &copy,
                );
                out.events.push(PacketEvent::new(
                    copy,
                    peer.node.clone(),
                    peer.iface.clone(),
                    now,
                ));
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Protocol;
    use crate::topology::{LinkEnd, NodeKind};

    fn firewall(rules: Vec<AclRule>, default_policy: AclAction) -> FirewallDevice {
        let mut node = Node::new(
            "f1",
            "Firewall 1",
            NodeKind::Firewall {
                rules: vec![],
                default_policy,
            },
        );
        let mut eth0 = Interface::new("eth0", "02:CC:00:00:00:01");
        eth0.ip = Some("10.0.0.254/24".into());
        let mut eth1 = Interface::new("eth1", "02:CC:00:00:00:02");
        eth1.ip = Some("10.0.1.254/24".into());
        node.interfaces = vec![eth0, eth1];
        FirewallDevice::from_node(&node, rules, default_policy)
    }

    fn links() -> Vec<Link> {
        vec![
            Link::new(LinkEnd::new("f1", "eth0"), LinkEnd::new("a", "eth0")),
            Link::new(LinkEnd::new("f1", "eth1"), LinkEnd::new("b", "eth0")),
        ]
    }

    fn packet(proto: Protocol, dst_ip: &str, dst_port: Option<u16>) -> Packet {
        Packet {
            id: "pkt-0".into(),
            src_mac: "02:AA:00:00:00:01".into(),
            dst_mac: "02:AA:00:00:00:02".into(),
            src_ip: Some("10.0.0.10".into()),
            dst_ip: Some(dst_ip.into()),
            vlan: None,
            protocol: proto,
            src_port: None,
            dst_port,
            ttl: 64,
            payload: None,
        }
    }

    #[test]
    fn test_deny_rule_stops_packet() {
        let fw = firewall(
            vec![AclRule::new(1, AclAction::Deny)
                .with_dst_ip("10.0.1.10")
                .with_proto("icmp")],
            AclAction::Allow,
        );
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links(), SimTime::new(1));

        assert!(out.events.is_empty());
        assert!(!out.delivered);
        let last = out.trace.last().unwrap();
        assert_eq!(last.action, TraceAction::AclDeny);
        assert_eq!(last.reason, "Denied by rule 1");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let fw = firewall(
            vec![
                AclRule::new(2, AclAction::Deny).with_proto("icmp"),
                AclRule::new(1, AclAction::Allow).with_proto("icmp"),
            ],
            AclAction::Deny,
        );
        // Rules sort by order: rule 1 (allow) is evaluated first.
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links(), SimTime::new(1));
        assert_eq!(out.events.len(), 1);
        assert!(out
            .trace
            .iter()
            .any(|h| h.action == TraceAction::AclAllow && h.reason == "Allowed by rule 1"));
    }

    #[test]
    fn test_unmatched_falls_to_default_policy() {
        let fw = firewall(
            vec![AclRule::new(1, AclAction::Allow).with_proto("tcp")],
            AclAction::Deny,
        );
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links(), SimTime::new(1));
        let last = out.trace.last().unwrap();
        assert_eq!(last.action, TraceAction::AclDeny);
        assert_eq!(last.reason, "Denied by default policy");
    }

    #[test]
    fn test_cidr_clause() {
        let fw = firewall(
            vec![AclRule::new(1, AclAction::Deny).with_src_ip("10.0.0.0/24")],
            AclAction::Allow,
        );
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links(), SimTime::new(1));
        assert_eq!(out.trace.last().unwrap().action, TraceAction::AclDeny);
    }

    #[test]
    fn test_port_clause() {
        let fw = firewall(
            vec![AclRule::new(1, AclAction::Deny)
                .with_proto("tcp")
                .with_dst_port(23)],
            AclAction::Allow,
        );
        let telnet = packet(Protocol::Tcp, "10.0.1.10", Some(23));
        let https = packet(Protocol::Tcp, "10.0.1.10", Some(443));

        let out = fw.process("eth0", &telnet, &links(), SimTime::new(1));
        assert_eq!(out.trace.last().unwrap().action, TraceAction::AclDeny);

        let out = fw.process("eth0", &https, &links(), SimTime::new(1));
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn test_any_clause_matches_everything() {
        let fw = firewall(
            vec![AclRule::new(1, AclAction::Deny)
                .with_proto("any")
                .with_src_ip("any")],
            AclAction::Allow,
        );
        let out = fw.process("eth0", &packet(Protocol::Udp, "10.0.1.10", None), &links(), SimTime::new(1));
        assert_eq!(out.trace.last().unwrap().action, TraceAction::AclDeny);
    }

    #[test]
    fn test_allow_forwards_with_rewritten_source_mac() {
        let fw = firewall(vec![], AclAction::Allow);
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links(), SimTime::new(1));

        let actions: Vec<_> = out.trace.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![TraceAction::Receive, TraceAction::AclAllow, TraceAction::Forward]
        );
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].node, "b");
        assert_eq!(out.events[0].packet.src_mac, "02:CC:00:00:00:02");
    }

    #[test]
    fn test_allow_without_egress_stops_quietly() {
        let fw = firewall(vec![], AclAction::Allow);
        // Only the ingress side is linked.
        let links = vec![Link::new(
            LinkEnd::new("f1", "eth0"),
            LinkEnd::new("a", "eth0"),
        )];
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.10", None), &links, SimTime::new(1));
        assert!(out.events.is_empty());
        assert_eq!(out.trace.last().unwrap().action, TraceAction::AclAllow);
    }

    #[test]
    fn test_delivers_to_own_address() {
        let fw = firewall(vec![AclRule::new(1, AclAction::Deny)], AclAction::Deny);
        // Even with a deny-everything policy, the for-us check wins.
        let out = fw.process("eth0", &packet(Protocol::Icmp, "10.0.1.254", None), &links(), SimTime::new(1));
        assert!(out.delivered);
        assert_eq!(out.trace[0].action, TraceAction::Deliver);
    }
}

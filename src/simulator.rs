//! The simulation driver: seeds the first packet, drains the FIFO
//! queue, dispatches per device type, and classifies the outcome.
//!
//! One `Simulator` serves one simulation call: `run` consumes it, so
//! the devices (and the MAC tables the switches carry) are created at
//! startup and gone once the result is returned. Independent
//! simulations share nothing.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::Device;
use crate::graph::GraphAnalyzer;
use crate::packet::{PacketIdGen, PacketSpec};
use crate::queue::EventQueue;
use crate::subnet::{host_addr, BROADCAST_MAC};
use crate::topology::Topology;
use crate::trace::{TraceAction, TraceHop};

// ── Options ───────────────────────────────────────────────────────────

/// How much of the decision process lands in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Suppress `receive` and `learn` hops.
    Minimal,
    /// Every action emits a hop.
    Detailed,
}

/// Caller-facing simulation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationOptions {
    /// Hard ceiling on loop iterations.
    pub max_hops: u32,
    /// Reserved for UI pacing; no effect on semantics.
    pub step_mode: bool,
    pub trace_level: TraceLevel,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            max_hops: 100,
            step_mode: false,
            trace_level: TraceLevel::Detailed,
        }
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// The outcome of one simulation call.
///
/// `success` is true only when `delivered` is. `blocked` reports an ACL
/// verdict; TTL and VLAN drops are *not* blocked — the UI distinguishes
/// "the firewall said no" from "the packet got lost".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub success: bool,
    pub delivered: bool,
    pub blocked: bool,
    #[serde(rename = "loop")]
    pub looped: bool,
    pub trace: Vec<TraceHop>,
    pub reason: String,
}

impl SimulationResult {
    fn failure(reason: impl Into<String>) -> Self {
        SimulationResult {
            success: false,
            delivered: false,
            blocked: false,
            looped: false,
            trace: Vec::new(),
            reason: reason.into(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────

/// Play one packet through the topology and report what happened.
pub fn simulate(topology: &Topology, spec: &PacketSpec, opts: SimulationOptions) -> SimulationResult {
    Simulator::new(topology.clone(), opts).run(spec)
}

// ── Simulator ─────────────────────────────────────────────────────────

/// Driver state for one simulation call.
pub struct Simulator {
    topology: Topology,
    devices: BTreeMap<String, Device>,
    analyzer: GraphAnalyzer,
    opts: SimulationOptions,
    ids: PacketIdGen,
}

impl Simulator {
    /// Instantiate devices and the graph analyzer from a topology
    /// snapshot.
    pub fn new(topology: Topology, opts: SimulationOptions) -> Self {
        let devices = topology
            .nodes
            .iter()
            .map(|node| (node.id.clone(), Device::from_node(node)))
            .collect();
        let analyzer = GraphAnalyzer::new(&topology);
        Simulator {
            topology,
            devices,
            analyzer,
            opts,
            ids: PacketIdGen::new(),
        }
    }

    /// Replace the packet-id minter, e.g. with a seeded one for replay.
    pub fn with_packet_ids(mut self, ids: PacketIdGen) -> Self {
        self.ids = ids;
        self
    }

    /// The analyzer built over this topology (UI pre-flight checks).
    pub fn analyzer(&self) -> &GraphAnalyzer {
        &self.analyzer
    }

    /// Run one packet spec to completion, consuming the driver: the
    /// devices and their MAC tables live exactly as long as this call.
    pub fn run(mut self, spec: &PacketSpec) -> SimulationResult {
        let src = match self.topology.node(&spec.src_node) {
            Some(node) => node,
            None => {
                return SimulationResult::failure(format!(
                    "Source node '{}' not found",
                    spec.src_node
                ))
            }
        };
        let dst = match self.topology.node(&spec.dst_node) {
            Some(node) => node,
            None => {
                return SimulationResult::failure(format!(
                    "Destination node '{}' not found",
                    spec.dst_node
                ))
            }
        };
        if !src.kind.is_host_like() {
            return SimulationResult::failure(format!(
                "Source node '{}' cannot originate traffic",
                spec.src_node
            ));
        }
        if src.interfaces.is_empty() {
            return SimulationResult::failure(format!(
                "Source node '{}' has no interfaces",
                spec.src_node
            ));
        }

        // Fail fast on a fragmented graph.
        if !self.analyzer.is_reachable(&spec.src_node, &spec.dst_node) {
            debug!(src = %spec.src_node, dst = %spec.dst_node, "unreachable, failing fast");
            return SimulationResult::failure(format!(
                "No path exists between {} and {}",
                spec.src_node, spec.dst_node
            ));
        }

        // Resolve the destination addresses the source will aim at.
        let dst_mac = dst
            .first_iface()
            .map(|iface| iface.mac.clone())
            .filter(|mac| !mac.is_empty())
            .unwrap_or_else(|| BROADCAST_MAC.to_string());
        let dst_ip = dst
            .first_iface()
            .and_then(|iface| iface.ip.as_deref())
            .map(|ip| host_addr(ip).to_string())
            .or_else(|| spec.dst_ip.clone());

        // Per-call mutable state: the clock-owning queue, the trace,
        // and the loop-detection keys.
        let mut queue = EventQueue::new();
        let mut trace: Vec<TraceHop> = Vec::new();
        let mut visited: HashSet<(String, String, String)> = HashSet::new();

        // Seed: only host-like devices originate.
        let host = match self.devices.get(&spec.src_node) {
            Some(Device::Host(host)) => host,
            _ => {
                return SimulationResult::failure(format!(
                    "Source node '{}' cannot originate traffic",
                    spec.src_node
                ))
            }
        };
        let packet_id = self.ids.next_id();
        debug!(src = %spec.src_node, dst = %spec.dst_node, packet = %packet_id, "seeding simulation");
        let seed = host.originate(
            &dst_mac,
            dst_ip,
            spec,
            packet_id,
            &self.topology.links,
            queue.now(),
        );
        self.record(&mut trace, seed.trace);
        for event in seed.events {
            queue.push(event);
        }

        // Main loop: dequeue (which ticks the clock), detect loops,
        // dispatch, enqueue.
        let mut hops = 0u32;
        while hops < self.opts.max_hops {
            let event = match queue.pop_next() {
                Some(event) => event,
                None => break,
            };
            let now = queue.now();

            let key = (
                event.node.clone(),
                event.iface.clone(),
                event.packet.id.clone(),
            );
            if !visited.insert(key) {
                debug!(node = %event.node, iface = %event.iface, "loop detected");
                return SimulationResult {
                    success: false,
                    delivered: false,
                    blocked: false,
                    looped: true,
                    trace,
                    reason: format!("Loop detected at {} ({})", event.node, event.iface),
                };
            }

            // A dangling link endpoint is configuration-inert.
            let device = match self.devices.get_mut(&event.node) {
                Some(device) => device,
                None => {
                    hops += 1;
                    continue;
                }
            };
            let out = device.process(&event.iface, &event.packet, &self.topology.links, now);
            self.record(&mut trace, out.trace);

            if out.delivered {
                debug!(hops, "packet delivered");
                return SimulationResult {
                    success: true,
                    delivered: true,
                    blocked: false,
                    looped: false,
                    trace,
                    reason: "Packet delivered".to_string(),
                };
            }
            for event in out.events {
                queue.push(event);
            }
            hops += 1;
        }

        if !queue.is_empty() {
            debug!(hops, "hop cap exceeded");
            return SimulationResult {
                success: false,
                delivered: false,
                blocked: false,
                looped: true,
                trace,
                reason: "Max hops exceeded".to_string(),
            };
        }

        // Queue drained without a delivery: classify from the final hop.
        let (blocked, reason) = match trace.last() {
            Some(hop) if hop.action == TraceAction::AclDeny => (true, hop.reason.clone()),
            Some(hop) if hop.action == TraceAction::Drop => (false, hop.reason.clone()),
            _ => (false, "Packet did not reach destination".to_string()),
        };
        debug!(hops, blocked, "queue drained without delivery");
        SimulationResult {
            success: false,
            delivered: false,
            blocked,
            looped: false,
            trace,
            reason,
        }
    }

    /// Append hops, honoring the configured trace level.
    fn record(&self, trace: &mut Vec<TraceHop>, hops: Vec<TraceHop>) {
        for hop in hops {
            if self.opts.trace_level == TraceLevel::Minimal
                && matches!(hop.action, TraceAction::Receive | TraceAction::Learn)
            {
                continue;
            }
            trace.push(hop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{access, trunk, TopologyBuilder};
    use crate::topology::{AclAction, AclRule};

    const MAC_A: &str = "02:AA:00:00:00:01";
    const MAC_B: &str = "02:AA:00:00:00:02";

    /// S1: two hosts on one learning switch, both ports access VLAN 1.
    fn switched_pair() -> Topology {
        TopologyBuilder::new()
            .host("a", MAC_A, "192.168.1.10/24")
            .host("b", MAC_B, "192.168.1.11/24")
            .switch("s1", &[access("p1", 1), access("p2", 1)])
            .link("a", "eth0", "s1", "p1")
            .link("b", "eth0", "s1", "p2")
            .build()
    }

    /// S3: two subnets joined by a router.
    fn routed_pair() -> Topology {
        TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.10/24")
            .host("b", MAC_B, "10.0.1.10/24")
            .router("r1", &[("eth0", "10.0.0.1/24"), ("eth1", "10.0.1.1/24")])
            .link("a", "eth0", "r1", "eth0")
            .link("b", "eth0", "r1", "eth1")
            .build()
    }

    fn actions(result: &SimulationResult) -> Vec<TraceAction> {
        result.trace.iter().map(|h| h.action).collect()
    }

    #[test]
    fn test_s1_basic_switched_connectivity() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );

        assert!(result.success);
        assert!(result.delivered);
        assert!(!result.blocked);
        assert!(!result.looped);
        assert_eq!(
            actions(&result),
            vec![
                TraceAction::Forward,
                TraceAction::Learn,
                TraceAction::Receive,
                TraceAction::Flood,
                TraceAction::Deliver,
            ]
        );

        let learn = &result.trace[1];
        assert_eq!(learn.node, "s1");
        assert!(learn.reason.contains("02:AA:00:00:00:01"));
        assert!(learn.reason.contains("p1"));

        assert_eq!(result.trace.last().unwrap().node, "b");
    }

    #[test]
    fn test_s2_vlan_isolation() {
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "192.168.1.10/24")
            .host("b", MAC_B, "192.168.1.11/24")
            .switch("s1", &[access("p1", 10), access("p2", 20)])
            .link("a", "eth0", "s1", "p1")
            .link("b", "eth0", "s1", "p2")
            .build();

        let result = simulate(&topo, &PacketSpec::ping("a", "b"), SimulationOptions::default());

        assert!(!result.success);
        assert!(!result.delivered);
        assert!(!result.blocked);
        // The trace ends at the switch: nothing ever reached b.
        assert_eq!(result.trace.last().unwrap().node, "s1");
        assert!(result.trace.iter().all(|h| h.node != "b"));
        assert_eq!(result.reason, "Packet did not reach destination");
    }

    #[test]
    fn test_s3_router_between_subnets() {
        let result = simulate(
            &routed_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );

        assert!(result.success);
        assert_eq!(
            actions(&result),
            vec![
                TraceAction::Forward,
                TraceAction::Receive,
                TraceAction::Route,
                TraceAction::Deliver,
            ]
        );
        let route = &result.trace[2];
        assert_eq!(route.node, "r1");
        assert_eq!(route.reason, "Routing to directly connected network via eth1");
        assert_eq!(result.trace.last().unwrap().node, "b");
    }

    #[test]
    fn test_s4_ttl_expiry() {
        let mut spec = PacketSpec::ping("a", "b");
        spec.ttl = Some(1);
        let result = simulate(&routed_pair(), &spec, SimulationOptions::default());

        assert!(!result.delivered);
        assert!(!result.blocked);
        assert!(!result.looped);
        let last = result.trace.last().unwrap();
        assert_eq!(last.node, "r1");
        assert_eq!(last.action, TraceAction::Drop);
        assert_eq!(last.reason, "TTL expired");
        assert_eq!(result.reason, "TTL expired");
    }

    #[test]
    fn test_s5_acl_deny() {
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.10/24")
            .host("b", MAC_B, "10.0.1.10/24")
            .firewall(
                "f1",
                &[("eth0", "10.0.0.254/24"), ("eth1", "10.0.1.254/24")],
                AclAction::Allow,
            )
            .rule(
                "f1",
                AclRule::new(1, AclAction::Deny)
                    .with_dst_ip("10.0.1.10")
                    .with_proto("icmp"),
            )
            .link("a", "eth0", "f1", "eth0")
            .link("b", "eth0", "f1", "eth1")
            .build();

        let result = simulate(&topo, &PacketSpec::ping("a", "b"), SimulationOptions::default());

        assert!(!result.delivered);
        assert!(result.blocked);
        let last = result.trace.last().unwrap();
        assert_eq!(last.action, TraceAction::AclDeny);
        assert_eq!(last.reason, "Denied by rule 1");
        assert_eq!(result.reason, "Denied by rule 1");
    }

    #[test]
    fn test_s5_firewall_allows_other_protocols() {
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.10/24")
            .host("b", MAC_B, "10.0.1.10/24")
            .firewall(
                "f1",
                &[("eth0", "10.0.0.254/24"), ("eth1", "10.0.1.254/24")],
                AclAction::Allow,
            )
            .rule(
                "f1",
                AclRule::new(1, AclAction::Deny)
                    .with_dst_ip("10.0.1.10")
                    .with_proto("icmp"),
            )
            .link("a", "eth0", "f1", "eth0")
            .link("b", "eth0", "f1", "eth1")
            .build();

        let result = simulate(&topo, &PacketSpec::tcp("a", "b", 443), SimulationOptions::default());
        assert!(result.success);
        assert!(result
            .trace
            .iter()
            .any(|h| h.action == TraceAction::AclAllow));
    }

    #[test]
    fn test_s6_disconnected_graph() {
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.1/24")
            .host("b", MAC_B, "10.0.0.2/24")
            .build();

        let result = simulate(&topo, &PacketSpec::ping("a", "b"), SimulationOptions::default());

        assert!(!result.success);
        assert!(result.trace.is_empty());
        assert!(result.reason.contains("No path exists"));
    }

    /// S7: two switches joined by two parallel links. A frame that no
    /// host claims circulates until the repeated-(node, iface, packet)
    /// check fires.
    fn parallel_link_fabric() -> Topology {
        TopologyBuilder::new()
            .host("a", MAC_A, "192.168.1.10/24")
            .host("b", MAC_B, "192.168.1.11/24")
            .switch("s1", &[access("p1", 1), trunk("t1"), trunk("t2")])
            .switch("s2", &[access("p1", 1), trunk("t1"), trunk("t2")])
            .link("a", "eth0", "s1", "p1")
            .link("b", "eth0", "s2", "p1")
            .link("s1", "t1", "s2", "t1")
            .link("s1", "t2", "s2", "t2")
            .build()
    }

    #[test]
    fn test_s7_loop_detection_fires() {
        // Pinging yourself through the fabric leaves the destination
        // MAC pinned to the ingress port everywhere, so every switch
        // floods and the copies chase each other around both links.
        let result = simulate(
            &parallel_link_fabric(),
            &PacketSpec::ping("a", "a"),
            SimulationOptions::default(),
        );

        assert!(!result.success);
        assert!(!result.delivered);
        assert!(result.looped);
        assert!(result.reason.contains("Loop detected"));
    }

    #[test]
    fn test_s7_broadcast_storm_is_bounded() {
        let opts = SimulationOptions::default();
        let topo = parallel_link_fabric();
        let result = simulate(&topo, &PacketSpec::ping("a", "b"), opts);
        let rerun = simulate(&topo, &PacketSpec::ping("a", "b"), opts);

        // Terminates under the hop cap with a bounded, reproducible trace.
        assert!(result.trace.len() < 4 * opts.max_hops as usize);
        assert_eq!(result, rerun);
    }

    #[test]
    fn test_max_hops_exceeded() {
        let mut opts = SimulationOptions::default();
        opts.max_hops = 1;
        let result = simulate(&switched_pair(), &PacketSpec::ping("a", "b"), opts);

        assert!(!result.success);
        assert!(result.looped);
        assert_eq!(result.reason, "Max hops exceeded");
    }

    // ── Topology failures ─────────────────────────────────────

    #[test]
    fn test_unknown_source_node() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("zz", "b"),
            SimulationOptions::default(),
        );
        assert!(!result.success);
        assert!(result.trace.is_empty());
        assert_eq!(result.reason, "Source node 'zz' not found");
    }

    #[test]
    fn test_unknown_destination_node() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("a", "zz"),
            SimulationOptions::default(),
        );
        assert_eq!(result.reason, "Destination node 'zz' not found");
    }

    #[test]
    fn test_switch_cannot_originate() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("s1", "b"),
            SimulationOptions::default(),
        );
        assert!(!result.success);
        assert_eq!(result.reason, "Source node 's1' cannot originate traffic");
    }

    #[test]
    fn test_cloud_terminates_anything() {
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.10/24")
            .cloud("net")
            .switch("s1", &[access("p1", 1), access("p2", 1)])
            .link("a", "eth0", "s1", "p1")
            .link("net", "eth0", "s1", "p2")
            .build();

        let result = simulate(&topo, &PacketSpec::ping("a", "net"), SimulationOptions::default());
        assert!(result.success);
        assert_eq!(result.trace.last().unwrap().node, "net");
        assert_eq!(result.trace.last().unwrap().action, TraceAction::Deliver);
    }

    // ── Invariants ────────────────────────────────────────────

    #[test]
    fn test_trace_times_are_monotone() {
        let result = simulate(
            &routed_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );
        for window in result.trace.windows(2) {
            assert!(
                window[0].time <= window[1].time,
                "time went backward: {} then {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let topo = switched_pair();
        let spec = PacketSpec::ping("a", "b");
        let run1 = simulate(&topo, &spec, SimulationOptions::default());
        let run2 = simulate(&topo, &spec, SimulationOptions::default());
        assert_eq!(run1, run2, "simulation is not deterministic");
    }

    #[test]
    fn test_each_event_received_at_most_once() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );
        let mut receives: Vec<(String, String, String)> = result
            .trace
            .iter()
            .filter(|h| h.action == TraceAction::Receive)
            .map(|h| (h.node.clone(), h.iface.clone(), h.packet.id.clone()))
            .collect();
        let before = receives.len();
        receives.sort();
        receives.dedup();
        assert_eq!(receives.len(), before);
    }

    #[test]
    fn test_minimal_trace_level_suppresses_receive_and_learn() {
        let mut opts = SimulationOptions::default();
        opts.trace_level = TraceLevel::Minimal;
        let result = simulate(&switched_pair(), &PacketSpec::ping("a", "b"), opts);

        assert!(result.success);
        assert!(result
            .trace
            .iter()
            .all(|h| h.action != TraceAction::Receive && h.action != TraceAction::Learn));
        assert_eq!(
            actions(&result),
            vec![TraceAction::Forward, TraceAction::Flood, TraceAction::Deliver]
        );
    }

    #[test]
    fn test_learning_converges_to_single_learn_hop() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );
        let learns = result
            .trace
            .iter()
            .filter(|h| h.action == TraceAction::Learn)
            .count();
        assert_eq!(learns, 1);
    }

    #[test]
    fn test_static_route_chain_delivers() {
        // a — r1 — r2 — b with a static default on r1 and a host route
        // back on r2; exercises LPM across two routers.
        let topo = TopologyBuilder::new()
            .host("a", MAC_A, "10.0.0.10/24")
            .host("b", MAC_B, "10.0.2.10/24")
            .router("r1", &[("eth0", "10.0.0.1/24"), ("eth1", "10.0.1.1/24")])
            .router("r2", &[("eth0", "10.0.1.2/24"), ("eth1", "10.0.2.1/24")])
            .route("r1", "10.0.2.0/24", "10.0.1.2", "eth1")
            .link("a", "eth0", "r1", "eth0")
            .link("r1", "eth1", "r2", "eth0")
            .link("b", "eth0", "r2", "eth1")
            .build();

        let result = simulate(&topo, &PacketSpec::ping("a", "b"), SimulationOptions::default());

        assert!(result.success);
        let route_hops: Vec<_> = result
            .trace
            .iter()
            .filter(|h| h.action == TraceAction::Route)
            .collect();
        assert_eq!(route_hops.len(), 2);
        assert!(route_hops[0].reason.contains("10.0.2.0/24"));
        assert!(route_hops[1]
            .reason
            .contains("directly connected network via eth1"));
        // TTL decremented once per router.
        assert_eq!(result.trace.last().unwrap().packet.ttl, 62);
    }

    #[test]
    fn test_result_serde_exposes_loop_field() {
        let result = simulate(
            &switched_pair(),
            &PacketSpec::ping("a", "b"),
            SimulationOptions::default(),
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"loop\":false"));
        assert!(json.contains("\"success\":true"));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: SimulationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, SimulationOptions::default());

        let opts: SimulationOptions =
            serde_json::from_str(r#"{"maxHops":10,"traceLevel":"minimal"}"#).unwrap();
        assert_eq!(opts.max_hops, 10);
        assert_eq!(opts.trace_level, TraceLevel::Minimal);
    }
}

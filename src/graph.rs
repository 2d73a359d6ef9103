//! Undirected graph analysis over the node/link set.
//!
//! The driver only needs `is_reachable` for its fail-fast pre-check;
//! `shortest_path` and `validate` exist for UI pre-flight and path
//! highlighting. A plain adjacency-list BFS is all the sizes here call
//! for.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::subnet::normalize_mac;
use crate::topology::Topology;

/// Graph view of a topology, built once per simulation.
#[derive(Debug, Clone)]
pub struct GraphAnalyzer {
    /// Node id → neighbor ids. Every node appears, linked or not.
    adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Normalized MAC → owning `node/iface` labels, for duplicate
    /// detection. Empty MACs are skipped.
    macs: BTreeMap<String, Vec<String>>,
}

impl GraphAnalyzer {
    pub fn new(topology: &Topology) -> Self {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut macs: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for node in &topology.nodes {
            adjacency.entry(node.id.clone()).or_default();
            for iface in &node.interfaces {
                if iface.mac.is_empty() {
                    continue;
                }
                macs.entry(normalize_mac(&iface.mac))
                    .or_default()
                    .push(format!("{}/{}", node.id, iface.id));
            }
        }
        for link in &topology.links {
            adjacency
                .entry(link.a.node.clone())
                .or_default()
                .insert(link.b.node.clone());
            adjacency
                .entry(link.b.node.clone())
                .or_default()
                .insert(link.a.node.clone());
        }

        GraphAnalyzer { adjacency, macs }
    }

    /// BFS reachability between two nodes. Unknown ids are unreachable.
    pub fn is_reachable(&self, a: &str, b: &str) -> bool {
        if !self.adjacency.contains_key(a) || !self.adjacency.contains_key(b) {
            return false;
        }
        self.connected_component(a).contains(b)
    }

    /// Shortest path (by hop count) from `a` to `b` as a node-id
    /// sequence including both endpoints, or `None`.
    pub fn shortest_path(&self, a: &str, b: &str) -> Option<Vec<String>> {
        if !self.adjacency.contains_key(a) || !self.adjacency.contains_key(b) {
            return None;
        }
        if a == b {
            return Some(vec![a.to_string()]);
        }

        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = VecDeque::from([a]);
        while let Some(current) = queue.pop_front() {
            for next in &self.adjacency[current] {
                if next == a || parent.contains_key(next.as_str()) {
                    continue;
                }
                parent.insert(next, current);
                if next == b {
                    let mut path = vec![b.to_string()];
                    let mut cursor = b;
                    while let Some(&prev) = parent.get(cursor) {
                        path.push(prev.to_string());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// All node ids reachable from `n`, including `n` itself.
    pub fn connected_component(&self, n: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        if !self.adjacency.contains_key(n) {
            return seen;
        }
        let mut queue = VecDeque::from([n.to_string()]);
        seen.insert(n.to_string());
        while let Some(current) = queue.pop_front() {
            for next in &self.adjacency[&current] {
                if seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }

    /// All connected components, each as a node-id set.
    pub fn components(&self) -> Vec<BTreeSet<String>> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut components = Vec::new();
        for node in self.adjacency.keys() {
            if seen.contains(node) {
                continue;
            }
            let component = self.connected_component(node);
            seen.extend(component.iter().cloned());
            components.push(component);
        }
        components
    }

    /// Human-readable diagnostics: isolated nodes, a fragmented graph,
    /// and duplicate interface MACs. None of these abort a simulation.
    pub fn validate(&self) -> Vec<String> {
        let mut diagnostics = Vec::new();

        for (node, neighbors) in &self.adjacency {
            if neighbors.is_empty() {
                diagnostics.push(format!("Node '{}' has no links", node));
            }
        }

        let components = self.components();
        if components.len() > 1 {
            diagnostics.push(format!(
                "Topology has {} disconnected components",
                components.len()
            ));
        }

        for (mac, owners) in &self.macs {
            if owners.len() > 1 {
                diagnostics.push(format!(
                    "Duplicate MAC {} on {}",
                    mac,
                    owners.join(", ")
                ));
            }
        }

        diagnostics
    }
}

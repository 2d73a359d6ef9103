//! Trace hops — the explainable record of every device decision.
//!
//! Hops are append-only; a component never edits a previously emitted
//! hop. The UI animates the sequence and shows `reason` verbatim.

use serde::{Deserialize, Serialize};

use crate::packet::Packet;
use crate::queue::SimTime;

/// The closed set of actions a trace hop can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceAction {
    Receive,
    Forward,
    Flood,
    Drop,
    Deliver,
    Learn,
    Route,
    Arp,
    AclAllow,
    AclDeny,
}

impl TraceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceAction::Receive => "receive",
            TraceAction::Forward => "forward",
            TraceAction::Flood => "flood",
            TraceAction::Drop => "drop",
            TraceAction::Deliver => "deliver",
            TraceAction::Learn => "learn",
            TraceAction::Route => "route",
            TraceAction::Arp => "arp",
            TraceAction::AclAllow => "acl-allow",
            TraceAction::AclDeny => "acl-deny",
        }
    }
}

impl std::fmt::Display for TraceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped record describing one device's decision about
/// one packet. `packet` is an immutable copy taken at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceHop {
    pub time: SimTime,
    pub node: String,
    pub node_label: String,
    pub iface: String,
    pub action: TraceAction,
    pub reason: String,
    pub packet: Packet,
}

impl std::fmt::Display for TraceHop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {}/{}] {} — {}",
            self.time, self.node, self.iface, self.action, self.reason
        )
    }
}

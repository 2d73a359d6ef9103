//! Packets, packet specifications, and the deterministic id minter.
//!
//! A packet's id is immutable for its whole lifetime: copies made while
//! forwarding keep the id, which is exactly what loop detection keys on.

use serde::{Deserialize, Serialize};

/// Default TTL stamped on packets at origination.
pub const DEFAULT_TTL: u8 = 64;

// ── Protocol ──────────────────────────────────────────────────────────

/// The protocols the simulator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Arp,
    Other,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Arp => "arp",
            Protocol::Other => "other",
        }
    }

    /// Does an ACL protocol clause name this protocol?
    /// `None` and `"any"` match everything.
    pub fn matches_clause(self, clause: Option<&str>) -> bool {
        match clause {
            None => true,
            Some(name) => {
                let name = name.trim();
                name.is_empty()
                    || name.eq_ignore_ascii_case("any")
                    || name.eq_ignore_ascii_case(self.as_str())
            }
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Icmp
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Packet ────────────────────────────────────────────────────────────

/// A simulated packet.
///
/// Deliberately a flat value type — trace hops snapshot it wholesale,
/// and forwarding points copy-on-modify (TTL, VLAN tag, source MAC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Process-unique id, immutable across forwarding.
    pub id: String,
    pub src_mac: String,
    pub dst_mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    /// VLAN tag; absent outside switched segments and on access egress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    pub ttl: u8,
    /// Opaque payload carried only for tracing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Packet {
    /// A minimal snapshot carrying only the id and source MAC, used by
    /// switches to annotate `learn` hops.
    pub fn learn_snapshot(&self) -> Packet {
        Packet {
            id: self.id.clone(),
            src_mac: self.src_mac.clone(),
            dst_mac: String::new(),
            src_ip: None,
            dst_ip: None,
            vlan: None,
            protocol: self.protocol,
            src_port: None,
            dst_port: None,
            ttl: 0,
            payload: None,
        }
    }
}

// ── Packet id minting ─────────────────────────────────────────────────

/// Deterministic, strictly-increasing packet-id minter.
///
/// Each simulation owns exactly one. Seeding it makes `simulate` a pure
/// function of its inputs, so two runs produce identical traces.
#[derive(Debug, Clone)]
pub struct PacketIdGen {
    next: u64,
}

impl PacketIdGen {
    /// Create a minter starting at 0.
    pub fn new() -> Self {
        PacketIdGen { next: 0 }
    }

    /// Create a minter starting at a specific value.
    pub fn starting_at(start: u64) -> Self {
        PacketIdGen { next: start }
    }

    /// Mint the next packet id.
    pub fn next_id(&mut self) -> String {
        let id = format!("pkt-{}", self.next);
        self.next += 1;
        id
    }
}

impl Default for PacketIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ── Packet spec ───────────────────────────────────────────────────────

/// What the caller asks the simulator to play: "can `src` reach `dst`?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketSpec {
    pub src_node: String,
    pub dst_node: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    /// Fallback destination IP when the destination node has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    /// TTL override at origination; defaults to [`DEFAULT_TTL`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl PacketSpec {
    /// An ICMP ping from `src` to `dst`.
    pub fn ping(src: impl Into<String>, dst: impl Into<String>) -> Self {
        PacketSpec {
            src_node: src.into(),
            dst_node: dst.into(),
            protocol: Protocol::Icmp,
            src_port: None,
            dst_port: None,
            dst_ip: None,
            ttl: None,
            payload: None,
        }
    }

    /// A TCP probe to a destination port.
    pub fn tcp(src: impl Into<String>, dst: impl Into<String>, dst_port: u16) -> Self {
        PacketSpec {
            dst_port: Some(dst_port),
            protocol: Protocol::Tcp,
            ..PacketSpec::ping(src, dst)
        }
    }
}

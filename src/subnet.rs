//! IP, CIDR and MAC utilities shared by every device behavior.
//!
//! Addresses stay in the string form the editor stores them in; this
//! module is the single place that parses them. Parsing failures are
//! treated as "does not match" — partial configuration must never abort
//! a simulation.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::topology::StaticRoute;

/// The layer-2 broadcast address.
pub const BROADCAST_MAC: &str = "FF:FF:FF:FF:FF:FF";

// ── MAC helpers ───────────────────────────────────────────────────────

/// Canonical (uppercase) form of a MAC address.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_uppercase()
}

/// Case-insensitive MAC equality.
pub fn macs_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Is this the all-ones broadcast address?
pub fn is_broadcast_mac(mac: &str) -> bool {
    macs_equal(mac, BROADCAST_MAC)
}

/// Is the low bit of the first octet set (group address)?
///
/// Broadcast is a multicast address too; callers that care about the
/// distinction must check [`is_broadcast_mac`] first.
pub fn is_multicast_mac(mac: &str) -> bool {
    let first = match mac.trim().split(':').next() {
        Some(octet) => octet,
        None => return false,
    };
    match u8::from_str_radix(first, 16) {
        Ok(byte) => byte & 0x01 != 0,
        Err(_) => false,
    }
}

/// Composite MAC-table key: uppercased MAC plus VLAN id.
pub fn mac_table_key(mac: &str, vlan: u16) -> String {
    format!("{}|{}", normalize_mac(mac), vlan)
}

// ── IP / CIDR helpers ─────────────────────────────────────────────────

/// The host part of an address that may carry a prefix length
/// (`"10.0.0.1/24"` → `"10.0.0.1"`).
pub fn host_addr(addr: &str) -> &str {
    addr.split('/').next().unwrap_or(addr).trim()
}

/// Parse an IPv4 address, tolerating a trailing prefix length.
pub fn parse_ip(addr: &str) -> Option<Ipv4Addr> {
    host_addr(addr).parse().ok()
}

/// Parse a CIDR prefix such as `"10.0.0.0/24"`.
pub fn parse_cidr(cidr: &str) -> Option<Ipv4Net> {
    cidr.trim().parse().ok()
}

/// IPv4 equality over the editor's string forms; prefix lengths on
/// either side are ignored.
pub fn ips_equal(a: &str, b: &str) -> bool {
    match (parse_ip(a), parse_ip(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Does `cidr` contain `ip`? Host bits in `cidr` are tolerated, so an
/// interface address like `"10.0.0.1/24"` describes its own subnet.
pub fn cidr_contains(cidr: &str, ip: &str) -> bool {
    match (parse_cidr(cidr), parse_ip(ip)) {
        (Some(net), Some(addr)) => net.contains(&addr),
        _ => false,
    }
}

/// Longest-prefix match over a static route list.
///
/// Scans every route whose prefix parses and contains `dst`; the
/// maximal prefix length wins and ties resolve to the earlier route.
/// A linear scan is plenty for the tens of routes a lab router carries.
pub fn longest_prefix_match<'a>(routes: &'a [StaticRoute], dst: &str) -> Option<&'a StaticRoute> {
    let dst = parse_ip(dst)?;
    let mut best: Option<(&StaticRoute, u8)> = None;
    for route in routes {
        let net = match parse_cidr(&route.prefix) {
            Some(net) => net,
            None => continue,
        };
        if !net.contains(&dst) {
            continue;
        }
        match best {
            Some((_, len)) if net.prefix_len() <= len => {}
            _ => best = Some((route, net.prefix_len())),
        }
    }
    best.map(|(route, _)| route)
}

//! # PacketLab — Deterministic Packet-Level Network Simulator
//!
//! The engine behind a browser-hosted, drag-and-drop network lab:
//! build a topology of hosts, switches, routers, firewalls and cloud
//! endpoints, then ask "can host A reach host B?" The answer is played
//! out packet by packet — layer-2 MAC learning and VLAN tagging,
//! layer-3 longest-prefix routing with TTL, ordered ACL matching — and
//! explained as a hop-by-hop trace the UI animates.
//!
//! No async, no threads, no wall-clock time: one simulation call runs
//! to completion synchronously, driven by a FIFO event queue and a
//! logical clock.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │          Simulator             │ ← seeds, dequeues, classifies
//! │  ┌─────────────────────────┐  │
//! │  │      EventQueue          │  │ ← FIFO deliveries; its clock
//! │  └─────────────────────────┘  │   ticks once per dequeue
//! │  ┌─────────────────────────┐  │
//! │  │  Device behaviors        │  │ ← host / switch / router /
//! │  │  (+ per-switch MacTable) │  │   firewall / cloud
//! │  └─────────────────────────┘  │
//! │  ┌─────────────────────────┐  │
//! │  │     GraphAnalyzer        │  │ ← reachability pre-check
//! │  └─────────────────────────┘  │
//! └───────────────────────────────┘
//! ```
//!
//! The editor, persistence and worker plumbing live outside the engine;
//! [`convert`] is the boundary they talk through.

pub mod builder;
pub mod convert;
pub mod device;
pub mod error;
pub mod graph;
pub mod packet;
pub mod queue;
pub mod simulator;
pub mod subnet;
pub mod topology;
pub mod trace;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience.
pub use builder::TopologyBuilder;
pub use device::{Device, DeviceOutput, MacTable};
pub use error::{SimError, SimResult};
pub use graph::GraphAnalyzer;
pub use packet::{Packet, PacketIdGen, PacketSpec, Protocol};
pub use queue::{EventQueue, PacketEvent, SimTime};
pub use simulator::{simulate, SimulationOptions, SimulationResult, Simulator, TraceLevel};
pub use topology::{
    AclAction, AclRule, Interface, Link, LinkEnd, Node, NodeKind, PortMode, StaticRoute, Topology,
};
pub use trace::{TraceAction, TraceHop};

//! FIFO queue of pending packet deliveries and the logical clock that
//! drives them.
//!
//! Dispatch order is strict first-in first-out — no priorities, no
//! time-keyed reordering: events dequeue in exactly the order devices
//! emitted them. The clock is owned by the queue and advances exactly
//! once per event handed out, so trace times are a pure function of
//! dispatch order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::packet::Packet;

// ── Logical time ──────────────────────────────────────────────────────

/// A logical timestamp: how many events had been dispatched when this
/// moment was stamped. Events carry the time of their enqueue, trace
/// hops the time of their dispatch; wall-clock time never appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The moment before the first dispatch.
    pub const ZERO: SimTime = SimTime(0);

    #[inline]
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The moment after one more dispatch. Saturates at the far end of
    /// the scale; the hop cap keeps real runs nowhere close.
    fn next(self) -> SimTime {
        SimTime(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

// ── Events ────────────────────────────────────────────────────────────

/// A scheduled delivery of a packet to one interface of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEvent {
    pub packet: Packet,
    pub node: String,
    pub iface: String,
    /// Logical clock value at enqueue.
    pub time: SimTime,
}

impl PacketEvent {
    pub fn new(packet: Packet, node: impl Into<String>, iface: impl Into<String>, time: SimTime) -> Self {
        PacketEvent {
            packet,
            node: node.into(),
            iface: iface.into(),
            time,
        }
    }
}

// ── Queue ─────────────────────────────────────────────────────────────

/// The driver's FIFO event queue plus the monotone clock it ticks.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    queue: VecDeque<PacketEvent>,
    now: SimTime,
}

impl EventQueue {
    /// Create an empty queue with the clock at zero.
    pub fn new() -> Self {
        EventQueue {
            queue: VecDeque::new(),
            now: SimTime::ZERO,
        }
    }

    /// Current logical time: the number of events dispatched so far.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Append an event at the back.
    pub fn push(&mut self, event: PacketEvent) {
        self.queue.push_back(event);
    }

    /// Pop the oldest event, advancing the clock by one tick.
    ///
    /// Returns `None` (and leaves the clock untouched) when the queue
    /// is empty.
    pub fn pop_next(&mut self) -> Option<PacketEvent> {
        let event = self.queue.pop_front()?;
        self.now = self.now.next();
        Some(event)
    }

    /// Peek at the oldest event without removing it or ticking.
    pub fn peek_next(&self) -> Option<&PacketEvent> {
        self.queue.front()
    }

    /// Returns `true` if there are no pending events.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drain all events in FIFO order into a `Vec`, without advancing
    /// the clock. Useful for tests and snapshots.
    pub fn drain_ordered(&mut self) -> Vec<PacketEvent> {
        self.queue.drain(..).collect()
    }
}

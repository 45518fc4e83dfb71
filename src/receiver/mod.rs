//! Protocol receiver tasks: one long-lived task per protocol, each owning
//! its UDP socket (spec §5).

pub mod artnet;
pub mod sacn;

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-receiver counters (spec §7): nothing in here is fatal, everything
/// is a counter the caller can inspect.
#[derive(Default)]
pub struct ReceiverStats {
    pub packets_received: AtomicU64,
    pub invalid: AtomicU64,
    pub sequence_errors: AtomicU64,
    pub routed: AtomicU64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> ReceiverStatsSnapshot {
        ReceiverStatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            sequence_errors: self.sequence_errors.load(Ordering::Relaxed),
            routed: self.routed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverStatsSnapshot {
    pub packets_received: u64,
    pub invalid: u64,
    pub sequence_errors: u64,
    pub routed: u64,
}

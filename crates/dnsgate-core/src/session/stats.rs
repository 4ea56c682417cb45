//! Per-session packet counters

use crate::engine::{PacketDecision, Reason};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the worker
#[derive(Debug, Default)]
pub(crate) struct Stats {
    packets_read: AtomicU64,
    bytes_read: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    dns_queries: AtomicU64,
    write_failures: AtomicU64,
}

impl Stats {
    pub(crate) fn record_read(&self, len: usize) {
        self.packets_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_decision(&self, decision: &PacketDecision) {
        if matches!(decision.reason, Reason::Domain(_)) {
            self.dns_queries.fetch_add(1, Ordering::Relaxed);
        }
        if decision.is_block() {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.packets_read,
            &self.bytes_read,
            &self.allowed,
            &self.blocked,
            &self.dns_queries,
            &self.write_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_read: self.packets_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            dns_queries: self.dns_queries.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the session counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Packets read from the tunnel
    pub packets_read: u64,
    /// Bytes read from the tunnel
    pub bytes_read: u64,
    /// Packets written back
    pub allowed: u64,
    /// Packets dropped
    pub blocked: u64,
    /// Packets carrying a DNS question
    pub dns_queries: u64,
    /// Failed writes of allowed packets
    pub write_failures: u64,
}

//! Runtime counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the backend and its ingress
#[derive(Debug, Default)]
pub struct MeshStats {
    events_originated: AtomicU64,
    propagations_ok: AtomicU64,
    propagations_failed: AtomicU64,
    events_received: AtomicU64,
    events_rejected: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MeshStatsSnapshot {
    /// Local events handed to the backend
    pub events_originated: u64,
    /// Peer calls that were acknowledged
    pub propagations_ok: u64,
    pub propagations_failed: u64,
    /// Events delivered locally on behalf of a peer
    pub events_received: u64,
    /// Malformed events refused from peers
    pub events_rejected: u64,
}

impl MeshStats {
    pub(crate) fn originated(&self) {
        self.events_originated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn propagation(&self, ok: bool) {
        let counter = if ok {
            &self.propagations_ok
        } else {
            &self.propagations_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MeshStatsSnapshot {
        MeshStatsSnapshot {
            events_originated: self.events_originated.load(Ordering::Relaxed),
            propagations_ok: self.propagations_ok.load(Ordering::Relaxed),
            propagations_failed: self.propagations_failed.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
        }
    }
}

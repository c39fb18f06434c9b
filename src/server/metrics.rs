//! Decision metrics
//!
//! Lock-free counters of the decisions served by the HTTP API.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Decision counters
pub struct DecisionMetrics {
    start_time: Instant,
    start_system_time: SystemTime,
    granted: AtomicU64,
    denied: AtomicU64,
    recognized: AtomicU64,
    rejected: AtomicU64,
    reloads: AtomicU64,
}

/// Serializable metrics snapshot for the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub start_time: u64,
    pub total_decisions: u64,
    pub granted: u64,
    pub denied: u64,
    /// Decisions taken for callers recognized by network
    pub recognized: u64,
    /// Malformed requests that never reached a decision
    pub rejected: u64,
    pub reloads: u64,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            start_system_time: SystemTime::now(),
            granted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            recognized: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
        }
    }

    /// Record a decision
    pub fn record_decision(&self, allowed: bool, recognized: bool) {
        if allowed {
            self.granted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
        if recognized {
            self.recognized.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request rejected before evaluation
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful configuration reload
    pub fn record_reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let granted = self.granted.load(Ordering::Relaxed);
        let denied = self.denied.load(Ordering::Relaxed);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            start_time: self
                .start_system_time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            total_decisions: granted + denied,
            granted,
            denied,
            recognized: self.recognized.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

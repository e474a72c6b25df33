use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the route counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RouteMetrics {
    pub routed_total: u64,
    pub handled: u64,
    pub malformed: u64,
    pub no_such_name: u64,
    pub not_handled: u64,
}

impl RouteMetrics {
    /// Get handled share as percentage
    pub fn success_rate(&self) -> f64 {
        if self.routed_total == 0 {
            return 100.0;
        }
        (self.handled as f64 / self.routed_total as f64) * 100.0
    }
}

/// Route counters shared by concurrent callers
#[derive(Debug, Default)]
pub struct Metrics {
    routed_total: AtomicU64,
    handled: AtomicU64,
    malformed: AtomicU64,
    no_such_name: AtomicU64,
    not_handled: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request an adapter answered
    pub fn record_handled(&self) {
        self.bump(&self.handled);
    }

    /// Record a path that failed to decode
    pub fn record_malformed(&self) {
        self.bump(&self.malformed);
    }

    /// Record a path that did not match the tree
    pub fn record_no_such_name(&self) {
        self.bump(&self.no_such_name);
    }

    /// Record a resolved path that no adapter claimed
    pub fn record_not_handled(&self) {
        self.bump(&self.not_handled);
    }

    fn bump(&self, counter: &AtomicU64) {
        self.routed_total.fetch_add(1, Ordering::Relaxed);
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouteMetrics {
        RouteMetrics {
            routed_total: self.routed_total.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            no_such_name: self.no_such_name.load(Ordering::Relaxed),
            not_handled: self.not_handled.load(Ordering::Relaxed),
        }
    }
}

//! Observability stubs (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters/gauges
#[derive(Debug, Default)]
pub struct Metrics {
    refreshes_completed: AtomicU64,
    refreshes_failed: AtomicU64,
    legacy_fallbacks: AtomicU64,
    push_messages: AtomicU64,
    reconnects: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_completed(&self) {
        self.refreshes_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "refreshes_completed", "Metric incremented");
    }

    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "refreshes_failed", "Metric incremented");
    }

    pub fn legacy_fallback(&self) {
        self.legacy_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "legacy_fallbacks", "Metric incremented");
    }

    pub fn push_message(&self) {
        self.push_messages.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "push_messages", "Metric incremented");
    }

    pub fn reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "reconnects", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes_completed: self.refreshes_completed.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            legacy_fallbacks: self.legacy_fallbacks.load(Ordering::Relaxed),
            push_messages: self.push_messages.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub refreshes_completed: u64,
    pub refreshes_failed: u64,
    pub legacy_fallbacks: u64,
    pub push_messages: u64,
    pub reconnects: u64,
}

//! Per-forwarder delivery metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single consumer forwarder
#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    /// Events queued onto the consumer's context
    scheduled: AtomicU64,
    /// Events that reached the consumer callback
    delivered: AtomicU64,
    /// Events dropped because the consumer was already gone
    dead_consumer: AtomicU64,
    /// Surface-changed deliveries that carried no handle
    empty_surface: AtomicU64,
}

impl ForwarderMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Events queued onto the context
    pub fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Increment scheduled count
    pub fn inc_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Events that reached the consumer
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Events dropped on a dead consumer
    pub fn dead_consumer(&self) -> u64 {
        self.dead_consumer.load(Ordering::Relaxed)
    }

    /// Increment dead-consumer count
    pub fn inc_dead_consumer(&self) {
        self.dead_consumer.fetch_add(1, Ordering::Relaxed);
    }

    /// Surface-changed deliveries with no handle
    pub fn empty_surface(&self) -> u64 {
        self.empty_surface.load(Ordering::Relaxed)
    }

    /// Increment empty-surface count
    pub fn inc_empty_surface(&self) {
        self.empty_surface.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ForwarderSnapshot {
        ForwarderSnapshot {
            scheduled: self.scheduled(),
            delivered: self.delivered(),
            dead_consumer: self.dead_consumer(),
            empty_surface: self.empty_surface(),
        }
    }
}

/// Snapshot of forwarder metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct ForwarderSnapshot {
    pub scheduled: u64,
    pub delivered: u64,
    pub dead_consumer: u64,
    pub empty_surface: u64,
}

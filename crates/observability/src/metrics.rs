//! Hub metrics collection
//!
//! Recording helpers for the `metrics` facade plus an in-memory aggregator
//! for delivery statistics.

use std::collections::HashMap;

use metrics::{counter, gauge};

/// Record a consumer attach, labeled by delivery mechanism.
pub fn record_consumer_attached(mechanism: &str) {
    counter!(
        "framehub_consumers_attached_total",
        "mechanism" => mechanism.to_string()
    )
    .increment(1);
}

/// Record a consumer detach, labeled by delivery mechanism.
pub fn record_consumer_detached(mechanism: &str) {
    counter!(
        "framehub_consumers_detached_total",
        "mechanism" => mechanism.to_string()
    )
    .increment(1);
}

/// Record the number of currently attached consumers.
pub fn set_attached_consumers(count: usize) {
    gauge!("framehub_consumers_attached").set(count as f64);
}

/// Record a backend-reported error.
pub fn record_backend_error(code: i32) {
    counter!(
        "framehub_backend_errors_total",
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record per-consumer delivery statistics (gauges, absolute values taken
/// from a forwarder snapshot).
pub fn record_delivery_stats(consumer_id: &str, scheduled: u64, delivered: u64) {
    gauge!(
        "framehub_events_scheduled",
        "consumer" => consumer_id.to_string()
    )
    .set(scheduled as f64);
    gauge!(
        "framehub_events_delivered",
        "consumer" => consumer_id.to_string()
    )
    .set(delivered as f64);
}

/// In-memory delivery statistics aggregator.
///
/// Fed from forwarder snapshots; keeps per-consumer absolute values and
/// produces a printable summary.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    /// Latest snapshot per consumer: (scheduled, delivered, dead, empty)
    per_consumer: HashMap<String, (u64, u64, u64, u64)>,
}

impl DeliveryStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update one consumer's snapshot.
    pub fn update(
        &mut self,
        consumer_id: &str,
        scheduled: u64,
        delivered: u64,
        dead_consumer: u64,
        empty_surface: u64,
    ) {
        self.per_consumer.insert(
            consumer_id.to_string(),
            (scheduled, delivered, dead_consumer, empty_surface),
        );
    }

    /// Generate a summary report.
    pub fn summary(&self) -> DeliverySummary {
        let mut summary = DeliverySummary {
            consumers: self.per_consumer.len(),
            ..Default::default()
        };
        for (scheduled, delivered, dead, empty) in self.per_consumer.values() {
            summary.total_scheduled += scheduled;
            summary.total_delivered += delivered;
            summary.total_dead_consumer += dead;
            summary.total_empty_surface += empty;
        }
        summary.per_consumer = self.per_consumer.clone();
        summary
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        self.per_consumer.clear();
    }
}

/// Aggregated delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub consumers: usize,
    pub total_scheduled: u64,
    pub total_delivered: u64,
    pub total_dead_consumer: u64,
    pub total_empty_surface: u64,
    pub per_consumer: HashMap<String, (u64, u64, u64, u64)>,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Consumers: {}", self.consumers)?;
        writeln!(
            f,
            "Scheduled: {}, delivered: {}",
            self.total_scheduled, self.total_delivered
        )?;
        writeln!(
            f,
            "Dropped on dead consumers: {}",
            self.total_dead_consumer
        )?;
        writeln!(f, "Empty-surface deliveries: {}", self.total_empty_surface)?;

        if !self.per_consumer.is_empty() {
            writeln!(f, "Per consumer:")?;
            for (consumer, (scheduled, delivered, dead, empty)) in &self.per_consumer {
                writeln!(
                    f,
                    "  {consumer}: scheduled={scheduled}, delivered={delivered}, dead={dead}, empty={empty}"
                )?;
            }
        }

        Ok(())
    }
}

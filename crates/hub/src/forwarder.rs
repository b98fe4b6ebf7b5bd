//! ConsumerForwarder - per-consumer backend adapter
//!
//! One forwarder per attached consumer. It implements the callback shapes the
//! backend expects ([`PortObserver`]) and re-dispatches every event onto the
//! consumer's [`ExecutionContext`]. The backend's notifying thread never runs
//! consumer code and never waits on a consumer's queue draining.

use std::sync::{Arc, Weak};

use contracts::{
    ConsumerId, DamageRect, FrameConsumer, OpaqueSurface, PortObserver, RegistrationId,
};
use tracing::trace;

use crate::context::ExecutionContext;
use crate::metrics::ForwarderMetrics;
use crate::resolver::SurfaceResolver;

/// Normalizes backend events for one consumer and marshals them onto the
/// consumer's execution context.
///
/// Holds the consumer weakly: a forwarder must not keep its consumer alive.
/// The [`RegistrationId`] makes backend registration and unregistration
/// symmetric.
pub struct ConsumerForwarder {
    consumer: Weak<dyn FrameConsumer>,
    consumer_id: ConsumerId,
    registration: RegistrationId,
    context: ExecutionContext,
    resolver: SurfaceResolver,
    metrics: Arc<ForwarderMetrics>,
}

impl ConsumerForwarder {
    /// Create a forwarder for `consumer`, delivering on `context`.
    pub fn new(
        consumer: &Arc<dyn FrameConsumer>,
        context: ExecutionContext,
        resolver: SurfaceResolver,
    ) -> Self {
        Self {
            consumer: Arc::downgrade(consumer),
            consumer_id: consumer.consumer_id().clone(),
            registration: RegistrationId::new(),
            context,
            resolver,
            metrics: Arc::new(ForwarderMetrics::new()),
        }
    }

    /// The consumer this forwarder serves.
    pub fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    /// Correlation id for the backend registration.
    pub fn registration(&self) -> RegistrationId {
        self.registration
    }

    /// The consumer's delivery context.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Delivery metrics for this forwarder.
    pub fn metrics(&self) -> &Arc<ForwarderMetrics> {
        &self.metrics
    }

    /// Queue a delivery onto the consumer's context.
    ///
    /// The consumer is upgraded at delivery time, not enqueue time: a
    /// consumer dropped while the event was in flight is counted and skipped.
    fn schedule(&self, deliver: impl FnOnce(&Arc<dyn FrameConsumer>) + Send + 'static) {
        self.metrics.inc_scheduled();

        let consumer = Weak::clone(&self.consumer);
        let consumer_id = self.consumer_id.clone();
        let metrics = Arc::clone(&self.metrics);

        self.context.dispatch(move || match consumer.upgrade() {
            Some(consumer) => {
                deliver(&consumer);
                metrics.inc_delivered();
            }
            None => {
                metrics.inc_dead_consumer();
                trace!(consumer = %consumer_id, "consumer gone, delivery dropped");
            }
        });
    }
}

impl PortObserver for ConsumerForwarder {
    fn observer_id(&self) -> &str {
        self.consumer_id.as_str()
    }

    fn surface_changed(&self, surface: OpaqueSurface) {
        match self.resolver.resolve(surface) {
            Some(handle) => {
                trace!(
                    consumer = %self.consumer_id,
                    surface = %handle.surface_id(),
                    "surface changed"
                );

                // The extra reference must be taken before the hop: the
                // backend may replace or reclaim the resource between now
                // and delivery. The guard drops after the callback returns,
                // on every path.
                let retained = handle.retain();
                self.schedule(move |consumer| {
                    consumer.on_surface_changed(Some(retained.handle().clone()));
                    drop(retained);
                });
            }
            None => {
                trace!(consumer = %self.consumer_id, "surface changed to none");
                self.metrics.inc_empty_surface();
                self.schedule(|consumer| consumer.on_surface_changed(None));
            }
        }
    }

    fn damage_rect(&self, rect: DamageRect) {
        self.schedule(move |consumer| consumer.on_damage_rect(rect));
    }
}

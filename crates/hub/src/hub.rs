//! FramebufferHub - façade over registry, port and renderable surface
//!
//! Owns the backend port reference, the renderable surface reference and the
//! consumer registry. Probes the port's delivery capability exactly once at
//! construction; every attach/detach afterwards dispatches through that
//! decision.

use std::fmt;
use std::sync::Arc;

use contracts::{
    BackendError, BackendErrorSink, ConsumerId, DisplayPort, FrameConsumer, PortObserver,
    RenderableSurface, SurfaceHandle,
};
use tracing::{debug, error, info, instrument, warn};

use crate::context::ExecutionContext;
use crate::error::{HubError, Result};
use crate::forwarder::ConsumerForwarder;
use crate::metrics::ForwarderSnapshot;
use crate::registry::ConsumerRegistry;
use crate::resolver::SurfaceResolver;

/// The backend delivery mechanism selected at construction.
///
/// Fixed for the hub's lifetime; attach and detach dispatch through it
/// directly instead of re-probing capabilities per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMechanism {
    /// Per-consumer attach with correlation id and dedicated error channel
    ConsumerChannel,
    /// Attach-by-port without per-consumer identity
    PortCallbacks,
    /// Legacy UUID-keyed callback registration on the surface object
    SurfaceRegistry,
}

impl DeliveryMechanism {
    /// Probe the port/surface pair, highest priority first.
    pub fn probe(port: &dyn DisplayPort, surface: &dyn RenderableSurface) -> Option<Self> {
        if port.consumer_channel().is_some() {
            Some(Self::ConsumerChannel)
        } else if port.port_callbacks().is_some() {
            Some(Self::PortCallbacks)
        } else if surface.callback_registry().is_some() {
            Some(Self::SurfaceRegistry)
        } else {
            None
        }
    }
}

impl fmt::Display for DeliveryMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConsumerChannel => "consumer_channel",
            Self::PortCallbacks => "port_callbacks",
            Self::SurfaceRegistry => "surface_registry",
        };
        write!(f, "{name}")
    }
}

/// Hub construction options.
#[derive(Default)]
pub struct HubOptions {
    /// Handler for errors the backend reports through the richer attach
    /// mechanism's error channel. Errors are logged either way; without a
    /// handler they go nowhere else.
    pub on_backend_error: Option<BackendErrorSink>,
}

impl fmt::Debug for HubOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubOptions")
            .field("on_backend_error", &self.on_backend_error.is_some())
            .finish()
    }
}

/// Fan-out hub for one port/surface pairing.
///
/// Created once per pairing and lives for its lifetime. Attach/detach calls
/// are expected from a single logical owner; backend events arrive
/// concurrently on backend-owned threads and only ever touch registry
/// snapshots.
pub struct FramebufferHub {
    port: Arc<dyn DisplayPort>,
    surface: Arc<dyn RenderableSurface>,
    mechanism: DeliveryMechanism,
    registry: ConsumerRegistry,
    resolver: SurfaceResolver,
    error_sink: BackendErrorSink,
}

impl FramebufferHub {
    /// Create a hub with default options.
    pub fn new(port: Arc<dyn DisplayPort>, surface: Arc<dyn RenderableSurface>) -> Result<Self> {
        Self::with_options(port, surface, HubOptions::default())
    }

    /// Create a hub, probing the delivery capability once.
    #[instrument(name = "hub_new", skip(port, surface, options), fields(port = port.port_id()))]
    pub fn with_options(
        port: Arc<dyn DisplayPort>,
        surface: Arc<dyn RenderableSurface>,
        options: HubOptions,
    ) -> Result<Self> {
        let mechanism = DeliveryMechanism::probe(port.as_ref(), surface.as_ref())
            .ok_or_else(|| HubError::no_delivery_mechanism(port.port_id()))?;

        info!(%mechanism, "delivery mechanism selected");

        let resolver = SurfaceResolver::new(port.surface_lookup());
        let error_sink = backend_error_sink(port.port_id(), options.on_backend_error);

        Ok(Self {
            port,
            surface,
            mechanism,
            registry: ConsumerRegistry::new(),
            resolver,
            error_sink,
        })
    }

    /// The mechanism selected at construction.
    pub fn delivery_mechanism(&self) -> DeliveryMechanism {
        self.mechanism
    }

    /// Attach a consumer, delivering its callbacks on `context`.
    ///
    /// Returns the current surface as a point-in-time reference; subsequent
    /// changes arrive through the consumer's callbacks, not through further
    /// attach calls. Fails with [`HubError::AlreadyAttached`] if the consumer
    /// is already attached, leaving the prior attachment untouched.
    #[instrument(
        name = "hub_attach",
        skip(self, consumer, context),
        fields(consumer = %consumer.consumer_id(), context = %context.id())
    )]
    pub fn attach(
        &self,
        consumer: &Arc<dyn FrameConsumer>,
        context: ExecutionContext,
    ) -> Result<Option<SurfaceHandle>> {
        let forwarder = Arc::new(ConsumerForwarder::new(
            consumer,
            context,
            self.resolver.clone(),
        ));

        let displaced = self.registry.register(consumer, Arc::clone(&forwarder))?;
        if let Some(stale) = displaced {
            // The previous consumer with this id died without detach; its
            // backend registration is still live and must be retracted now.
            self.unregister_backend(&stale.forwarder);
        }

        self.register_backend(&forwarder);

        info!(
            registration = %forwarder.registration(),
            mechanism = %self.mechanism,
            "consumer attached"
        );

        Ok(self.current_surface())
    }

    /// Detach a consumer. No-op if it is not attached.
    ///
    /// Stops new deliveries; events already queued on the consumer's context
    /// may still arrive shortly after this returns.
    #[instrument(name = "hub_detach", skip(self, consumer), fields(consumer = %consumer.consumer_id()))]
    pub fn detach(&self, consumer: &dyn FrameConsumer) {
        let Some(entry) = self.registry.unregister(consumer.consumer_id().as_str()) else {
            debug!("detach on unattached consumer ignored");
            return;
        };

        self.unregister_backend(&entry.forwarder);
        info!(registration = %entry.forwarder.registration(), "consumer detached");
    }

    /// Retract backend registrations for consumers that were dropped without
    /// an explicit detach. Returns how many were cleaned up.
    #[instrument(name = "hub_detach_defunct", skip(self))]
    pub fn detach_defunct(&self) -> usize {
        let defunct = self.registry.take_defunct();
        for entry in &defunct {
            self.unregister_backend(&entry.forwarder);
        }
        if !defunct.is_empty() {
            info!(count = defunct.len(), "retracted defunct registrations");
        }
        defunct.len()
    }

    /// Detach every consumer. Idempotent.
    #[instrument(name = "hub_detach_all", skip(self))]
    pub fn detach_all(&self) {
        let entries = self.registry.drain();
        for entry in &entries {
            self.unregister_backend(&entry.forwarder);
        }
        info!(count = entries.len(), "all consumers detached");
    }

    /// Snapshot of currently attached consumers.
    pub fn attached_consumers(&self) -> Vec<Arc<dyn FrameConsumer>> {
        self.registry.consumers()
    }

    /// Whether this consumer is currently attached.
    pub fn is_attached(&self, consumer: &dyn FrameConsumer) -> bool {
        self.registry.contains(consumer.consumer_id().as_str())
    }

    /// Number of attached consumers.
    pub fn attached_count(&self) -> usize {
        self.registry.attached_count()
    }

    /// Point-in-time resolve of the surface's current attachment.
    ///
    /// The returned handle is a snapshot; holding it across time requires an
    /// explicit retain.
    pub fn current_surface(&self) -> Option<SurfaceHandle> {
        self.resolver.resolve(self.surface.current_surface())
    }

    /// Delivery metrics for every attached consumer.
    pub fn metrics(&self) -> Vec<(ConsumerId, ForwarderSnapshot)> {
        self.registry
            .forwarders()
            .into_iter()
            .map(|(id, forwarder)| (id, forwarder.metrics().snapshot()))
            .collect()
    }

    fn register_backend(&self, forwarder: &Arc<ConsumerForwarder>) {
        let observer: Arc<dyn PortObserver> = forwarder.clone();

        match self.mechanism {
            DeliveryMechanism::ConsumerChannel => {
                if let Some(channel) = self.port.consumer_channel() {
                    channel.attach_consumer(
                        forwarder.registration(),
                        observer,
                        Arc::clone(&self.error_sink),
                    );
                } else {
                    error!(port = self.port.port_id(), "consumer channel capability vanished");
                }
            }
            DeliveryMechanism::PortCallbacks => {
                if let Some(callbacks) = self.port.port_callbacks() {
                    callbacks.attach(observer);
                } else {
                    error!(port = self.port.port_id(), "port callbacks capability vanished");
                }
            }
            DeliveryMechanism::SurfaceRegistry => {
                if let Some(registry) = self.surface.callback_registry() {
                    registry.register_callbacks(forwarder.registration(), observer);
                } else {
                    error!(port = self.port.port_id(), "surface registry capability vanished");
                }
            }
        }
    }

    fn unregister_backend(&self, forwarder: &Arc<ConsumerForwarder>) {
        match self.mechanism {
            DeliveryMechanism::ConsumerChannel => {
                if let Some(channel) = self.port.consumer_channel() {
                    channel.detach_consumer(forwarder.registration());
                }
            }
            DeliveryMechanism::PortCallbacks => {
                if let Some(callbacks) = self.port.port_callbacks() {
                    let observer: Arc<dyn PortObserver> = forwarder.clone();
                    callbacks.detach(&observer);
                }
            }
            DeliveryMechanism::SurfaceRegistry => {
                if let Some(registry) = self.surface.callback_registry() {
                    registry.unregister_callbacks(forwarder.registration());
                }
            }
        }
    }
}

/// Build the error sink handed to the backend at attach time.
///
/// Backend-reported errors are never silently discarded: they are logged at
/// warn level and forwarded to the caller's handler when one is configured.
fn backend_error_sink(port_id: &str, handler: Option<BackendErrorSink>) -> BackendErrorSink {
    let port_id = port_id.to_string();
    Arc::new(move |backend_error: BackendError| {
        warn!(
            port = %port_id,
            code = backend_error.code,
            message = %backend_error.message,
            "backend reported error"
        );
        if let Some(handler) = &handler {
            handler(backend_error);
        }
    })
}

//! Backend port traits - the three delivery generations and their seams
//!
//! A device port exposes at most a subset of three registration mechanisms,
//! probed once at hub construction in fixed priority order:
//!
//! 1. [`ConsumerChannel`] - per-consumer attach keyed by [`RegistrationId`],
//!    with a dedicated backend error sink
//! 2. [`PortCallbacks`] - attach-by-port, no per-consumer identity
//! 3. [`SurfaceCallbackRegistry`] - legacy UUID-keyed registration on the
//!    renderable surface itself
//!
//! All three deliver through the same observer shape, [`PortObserver`].

use std::sync::Arc;

use thiserror::Error;

use crate::{DamageRect, OpaqueSurface, RegistrationId, SurfaceHandle, TransportToken};

/// Callback shapes the backend expects from a registered observer.
///
/// Invoked on a backend-owned thread; implementations must not block and
/// must not call back into the consumer synchronously.
pub trait PortObserver: Send + Sync {
    /// Consumer identity, used by backend generations that route
    /// per-consumer diagnostics.
    fn observer_id(&self) -> &str;

    /// The port's surface was replaced (or went away).
    fn surface_changed(&self, surface: OpaqueSurface);

    /// A region of the current surface changed.
    fn damage_rect(&self, rect: DamageRect);
}

/// Error reported by the backend through the richer attach mechanism's
/// dedicated error channel.
#[derive(Debug, Clone, Error)]
#[error("backend error {code}: {message}")]
pub struct BackendError {
    pub code: i32,
    pub message: String,
}

impl BackendError {
    /// Create a new backend error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Sink for backend-reported errors, shared with the backend at attach time.
pub type BackendErrorSink = Arc<dyn Fn(BackendError) + Send + Sync>;

/// Generation 1: per-consumer attach with explicit correlation id and a
/// dedicated error-delivery channel.
pub trait ConsumerChannel: Send + Sync {
    /// Register an observer under a correlation id.
    fn attach_consumer(
        &self,
        registration: RegistrationId,
        observer: Arc<dyn PortObserver>,
        errors: BackendErrorSink,
    );

    /// Retract the registration made under `registration`. Idempotent.
    fn detach_consumer(&self, registration: RegistrationId);
}

/// Generation 2: attach-by-port without per-consumer identity; the observer
/// object itself is the registration key.
pub trait PortCallbacks: Send + Sync {
    /// Register an observer with the port.
    fn attach(&self, observer: Arc<dyn PortObserver>);

    /// Retract the registration for this exact observer. Idempotent.
    fn detach(&self, observer: &Arc<dyn PortObserver>);
}

/// Generation 3 (legacy): UUID-keyed callback registration directly on the
/// renderable surface object.
pub trait SurfaceCallbackRegistry: Send + Sync {
    /// Register callbacks under a key.
    fn register_callbacks(&self, key: RegistrationId, observer: Arc<dyn PortObserver>);

    /// Remove the callbacks registered under `key`. Idempotent.
    fn unregister_callbacks(&self, key: RegistrationId);
}

/// Cross-process surface lookup.
///
/// Resolves a transport-wrapped reference to a native handle; `None` for
/// malformed or already-revoked tokens, which is an absence, not an error.
pub trait SurfaceLookup: Send + Sync {
    fn lookup_surface(&self, token: TransportToken) -> Option<SurfaceHandle>;
}

/// External device-IO handle identifying which physical display/stream is
/// being observed. Supplied by the discovery collaborator; never constructed
/// by the hub.
pub trait DisplayPort: Send + Sync {
    /// Port identity for logging/diagnostics.
    fn port_id(&self) -> &str;

    /// Generation 1 capability, if this port supports it.
    fn consumer_channel(&self) -> Option<&dyn ConsumerChannel>;

    /// Generation 2 capability, if this port supports it.
    fn port_callbacks(&self) -> Option<&dyn PortCallbacks>;

    /// The port's cross-process surface lookup.
    fn surface_lookup(&self) -> Arc<dyn SurfaceLookup>;
}

/// The renderable surface object the hub observes.
pub trait RenderableSurface: Send + Sync {
    /// Point-in-time snapshot of the current surface attachment.
    fn current_surface(&self) -> OpaqueSurface;

    /// Generation 3 capability, if this surface supports it.
    fn callback_registry(&self) -> Option<&dyn SurfaceCallbackRegistry>;
}

//! FrameConsumer trait - the consumer-facing notification protocol
//!
//! Every delivery mechanism the backend offers is normalized to these two
//! callbacks. Consumers are owned entirely by their callers; the hub holds
//! only weak references.

use crate::{ConsumerId, DamageRect, SurfaceHandle};

/// A consumer of frame-surface notifications.
///
/// Callbacks are invoked on the execution context the consumer was attached
/// with, never on the backend's notifying thread. Per-consumer delivery order
/// matches backend raise order.
///
/// # Ownership
///
/// The hub never keeps a consumer alive: attach stores a `Weak` reference.
/// Callers must detach before dropping their last strong reference; relying
/// on weak-entry cleanup leaks the backend registration (see
/// `FramebufferHub::detach_defunct`).
pub trait FrameConsumer: Send + Sync {
    /// Stable identifier, unique among attached consumers.
    fn consumer_id(&self) -> &ConsumerId;

    /// The frame surface was replaced. `None` means the backend currently
    /// has no renderable surface; a handle stays valid for the duration of
    /// the callback even if the backend drops its own reference concurrently.
    fn on_surface_changed(&self, surface: Option<SurfaceHandle>);

    /// A region of the current surface changed.
    fn on_damage_rect(&self, rect: DamageRect);
}

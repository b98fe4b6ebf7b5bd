//! SurfaceResolver - opaque backend value to native handle
//!
//! Backends hand observers one of three shapes: nothing, an already-typed
//! handle, or a transport-wrapped reference requiring a cross-process
//! lookup. The resolver normalizes all three to `Option<SurfaceHandle>`.

use std::sync::Arc;

use contracts::{OpaqueSurface, SurfaceHandle, SurfaceLookup};
use tracing::trace;

/// Resolves opaque backend surface values.
///
/// The cross-process lookup is a strategy captured at construction, so the
/// resolver is testable against a table stub and shares the port's lookup in
/// production.
#[derive(Clone)]
pub struct SurfaceResolver {
    lookup: Arc<dyn SurfaceLookup>,
}

impl SurfaceResolver {
    /// Create a resolver over the given lookup strategy.
    pub fn new(lookup: Arc<dyn SurfaceLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve an opaque value to a native handle.
    ///
    /// Returns `None` for an empty value and for a token the lookup no
    /// longer knows; neither is an error, only an absence. A resolved handle
    /// is a point-in-time reference: holding it past the current call
    /// requires an explicit [`contracts::SurfaceRetain`].
    pub fn resolve(&self, opaque: OpaqueSurface) -> Option<SurfaceHandle> {
        match opaque {
            OpaqueSurface::Empty => None,
            OpaqueSurface::Handle(handle) => Some(handle),
            OpaqueSurface::Transport(token) => {
                let resolved = self.lookup.lookup_surface(token);
                if resolved.is_none() {
                    trace!(%token, "transport token did not resolve");
                }
                resolved
            }
        }
    }
}

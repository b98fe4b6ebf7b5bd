//! Mock surface table - allocation and cross-process lookup stand-in
//!
//! In production the transport lookup crosses a process boundary; here it is
//! a map from token to handle. Revoking a token models the backend
//! invalidating a reference while consumers may still hold retained handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use contracts::{
    SurfaceDescriptor, SurfaceFormat, SurfaceHandle, SurfaceId, SurfaceLookup, TransportToken,
};
use tracing::debug;

/// Surface allocator and transport-token table.
pub struct MockSurfaceTable {
    /// Surface id counter; starts high to make mock ids recognizable
    next_surface: AtomicU64,
    next_token: AtomicU64,
    entries: Mutex<HashMap<TransportToken, SurfaceHandle>>,
}

impl MockSurfaceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            next_surface: AtomicU64::new(1000),
            next_token: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a surface with the given layout.
    pub fn create_surface(&self, descriptor: SurfaceDescriptor) -> SurfaceHandle {
        let id = SurfaceId(self.next_surface.fetch_add(1, Ordering::SeqCst));
        SurfaceHandle::allocate(id, descriptor)
    }

    /// Allocate a packed BGRA surface.
    pub fn create_packed_surface(&self, width: u32, height: u32) -> SurfaceHandle {
        self.create_surface(SurfaceDescriptor::packed(width, height, SurfaceFormat::Bgra8))
    }

    /// Publish a handle for cross-process lookup, returning its token.
    pub fn publish(&self, handle: &SurfaceHandle) -> TransportToken {
        let token = TransportToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.entries.lock().unwrap().insert(token, handle.clone());
        debug!(%token, surface = %handle.surface_id(), "surface published");
        token
    }

    /// Drop the table's reference for `token`. Outstanding retained handles
    /// stay valid; only the token stops resolving. Returns whether the token
    /// was known.
    pub fn revoke(&self, token: TransportToken) -> bool {
        let removed = self.entries.lock().unwrap().remove(&token).is_some();
        if removed {
            debug!(%token, "surface revoked");
        }
        removed
    }

    /// Number of currently published tokens.
    pub fn published_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Default for MockSurfaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceLookup for MockSurfaceTable {
    fn lookup_surface(&self, token: TransportToken) -> Option<SurfaceHandle> {
        self.entries.lock().unwrap().get(&token).cloned()
    }
}

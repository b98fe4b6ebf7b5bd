//! Surface types - the shared frame buffer resource and its references
//!
//! A [`SurfaceHandle`] is a reference-counted view of the live frame buffer.
//! The backend rewrites the buffer contents out of band, so a handle obtained
//! at one moment is a snapshot of *identity*, not of pixels. Any code path
//! that carries a handle across an asynchronous boundary must take a
//! [`SurfaceRetain`] before scheduling and drop it exactly once after the
//! scheduled work completes.

use std::fmt;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Identity of a surface resource, stable for the resource's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Pixel layout of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormat {
    Bgra8,
    Rgba8,
}

impl SurfaceFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            SurfaceFormat::Bgra8 | SurfaceFormat::Rgba8 => 4,
        }
    }
}

/// Geometry and layout of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceDescriptor {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Bytes per row (>= width * bytes_per_pixel)
    pub stride_bytes: u32,

    /// Pixel format
    pub format: SurfaceFormat,
}

impl SurfaceDescriptor {
    /// Descriptor with a tightly packed stride.
    pub fn packed(width: u32, height: u32, format: SurfaceFormat) -> Self {
        Self {
            width,
            height,
            stride_bytes: width * format.bytes_per_pixel(),
            format,
        }
    }

    /// Total byte length of the buffer this descriptor describes.
    pub fn byte_len(&self) -> usize {
        (self.stride_bytes as usize) * (self.height as usize)
    }
}

/// The shared-memory frame buffer resource.
///
/// Contents are interior-mutable: the backend overwrites them between (and
/// during) notifications, which is exactly why consumers receive damage
/// rects rather than pixel diffs.
pub struct SurfaceBuffer {
    id: SurfaceId,
    descriptor: SurfaceDescriptor,
    contents: RwLock<Bytes>,
}

/// Reference-counted handle to a [`SurfaceBuffer`].
///
/// Cloning is a retain: the underlying buffer stays alive while any clone
/// exists, even after the backend has dropped its own reference.
#[derive(Clone)]
pub struct SurfaceHandle {
    inner: Arc<SurfaceBuffer>,
}

impl SurfaceHandle {
    /// Allocate a zero-filled surface.
    pub fn allocate(id: SurfaceId, descriptor: SurfaceDescriptor) -> Self {
        let contents = Bytes::from(vec![0u8; descriptor.byte_len()]);
        Self {
            inner: Arc::new(SurfaceBuffer {
                id,
                descriptor,
                contents: RwLock::new(contents),
            }),
        }
    }

    /// Identity of the underlying resource.
    pub fn surface_id(&self) -> SurfaceId {
        self.inner.id
    }

    /// Geometry and layout.
    pub fn descriptor(&self) -> SurfaceDescriptor {
        self.inner.descriptor
    }

    /// Current contents snapshot (zero-copy clone of the backing `Bytes`).
    pub fn contents(&self) -> Bytes {
        self.inner.contents.read().unwrap().clone()
    }

    /// Overwrite the buffer contents. Backend-side operation; happens out of
    /// band with respect to any outstanding handles.
    pub fn overwrite(&self, data: Bytes) {
        *self.inner.contents.write().unwrap() = data;
    }

    /// Whether two handles reference the same underlying resource.
    pub fn same_resource(&self, other: &SurfaceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take an explicit extra reference for an asynchronous hand-off.
    ///
    /// The guard must be moved into the scheduled work and dropped after the
    /// consumer callback returns; the resource stays valid for exactly that
    /// window.
    pub fn retain(&self) -> SurfaceRetain {
        SurfaceRetain {
            handle: self.clone(),
        }
    }

    /// Current reference count of the underlying resource.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("id", &self.inner.id)
            .field("descriptor", &self.inner.descriptor)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Scoped ownership guard bracketing a handle across an asynchronous hop.
///
/// Taken via [`SurfaceHandle::retain`] before scheduling cross-context work;
/// dropping it releases the extra reference, exactly once, regardless of
/// delivery outcome.
pub struct SurfaceRetain {
    handle: SurfaceHandle,
}

impl SurfaceRetain {
    /// The retained handle.
    pub fn handle(&self) -> &SurfaceHandle {
        &self.handle
    }
}

impl fmt::Debug for SurfaceRetain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SurfaceRetain").field(&self.handle).finish()
    }
}

/// Transport-wrapped cross-process reference to a surface.
///
/// Resolving a token requires a lookup through [`crate::SurfaceLookup`];
/// tokens become stale when the backend revokes the underlying mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportToken(pub u64);

impl fmt::Display for TransportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token-{}", self.0)
    }
}

/// The opaque surface value a backend hands to observers.
///
/// Backends differ in what they deliver: nothing, an already-typed handle,
/// or a transport reference requiring a cross-process lookup.
#[derive(Debug, Clone)]
pub enum OpaqueSurface {
    /// No surface available
    Empty,

    /// Already-typed native handle
    Handle(SurfaceHandle),

    /// Transport-wrapped reference requiring lookup
    Transport(TransportToken),
}

impl OpaqueSurface {
    /// Whether this value carries anything resolvable at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, OpaqueSurface::Empty)
    }
}

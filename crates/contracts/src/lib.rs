//! # Contracts
//!
//! Frozen interface contracts for the frame-surface fan-out hub, defining the
//! data structures and seam traits shared by every business crate. Business
//! crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Resource Model
//! - A [`SurfaceHandle`] is a reference-counted view of the live frame buffer;
//!   the backend rewrites its contents out of band.
//! - Holding a handle across an asynchronous hop requires an explicit
//!   [`SurfaceRetain`] taken before the hop and dropped after delivery.

mod consumer;
mod consumer_id;
mod port;
mod rect;
mod registration;
mod surface;

pub use consumer::FrameConsumer;
pub use consumer_id::ConsumerId;
pub use port::*;
pub use rect::DamageRect;
pub use registration::RegistrationId;
pub use surface::*;

//! # Mock Backend
//!
//! In-process stand-in for a real display backend, used by tests, demos and
//! development without device access.
//!
//! Provides:
//! - [`MockDisplayPort`] - a port configurable to expose any one of the
//!   three delivery generations, with event raising and call recording
//! - [`MockSurfaceTable`] - surface allocation plus the cross-process
//!   lookup stand-in (publish/revoke transport tokens)
//! - [`RecordingConsumer`] - a consumer that records every delivery

mod consumer;
mod port;
mod surface_table;

pub use consumer::{RecordedEvent, RecordingConsumer, SurfaceProbe};
pub use port::{BackendGeneration, MockDisplayPort};
pub use surface_table::MockSurfaceTable;

//! # Hub
//!
//! Frame-surface fan-out hub.
//!
//! Responsibilities:
//! - Normalize the backend's delivery mechanism into the uniform
//!   [`contracts::FrameConsumer`] notification protocol
//! - Marshal every delivery onto the consumer's [`ExecutionContext`]
//! - Keep the consumer registry and the backend registrations symmetric

pub mod context;
pub mod error;
pub mod forwarder;
pub mod hub;
pub mod metrics;
pub mod registry;
pub mod resolver;

pub use contracts::{ConsumerId, DamageRect, FrameConsumer, SurfaceHandle};
pub use context::{ContextId, ExecutionContext};
pub use error::HubError;
pub use forwarder::ConsumerForwarder;
pub use hub::{DeliveryMechanism, FramebufferHub, HubOptions};
pub use metrics::{ForwarderMetrics, ForwarderSnapshot};
pub use registry::ConsumerRegistry;
pub use resolver::SurfaceResolver;

//! Hub error types

use contracts::ConsumerId;
use thiserror::Error;

/// Hub-specific errors
#[derive(Debug, Error)]
pub enum HubError {
    /// Consumer is already attached. Double-attachment is a caller contract
    /// violation; the registry is left untouched.
    #[error("consumer '{consumer_id}' is already attached")]
    AlreadyAttached { consumer_id: ConsumerId },

    /// The port/surface pair exposes none of the known delivery mechanisms.
    #[error("port '{port_id}' exposes no delivery mechanism")]
    NoDeliveryMechanism { port_id: String },
}

impl HubError {
    /// Create an already-attached error.
    pub fn already_attached(consumer_id: ConsumerId) -> Self {
        Self::AlreadyAttached { consumer_id }
    }

    /// Create a no-delivery-mechanism error.
    pub fn no_delivery_mechanism(port_id: impl Into<String>) -> Self {
        Self::NoDeliveryMechanism {
            port_id: port_id.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, HubError>;

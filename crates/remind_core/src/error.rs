use thiserror::Error;

use crate::ids::{ActivationId, DisplayId};

/// Failures reported by the host notification facility.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("notification channels are not supported on this platform")]
    Unsupported,
    #[error("notification channel `{0}` is not registered")]
    MissingChannel(String),
    #[error("platform resources exhausted: {0}")]
    Exhausted(String),
    #[error("platform call failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to register notification channel `{id}`")]
    Configuration {
        id: String,
        #[source]
        source: PlatformError,
    },
    #[error("failed to display notification #{display_id}")]
    Delivery {
        display_id: DisplayId,
        #[source]
        source: PlatformError,
    },
    #[error("failed to register alarm #{alarm_id}")]
    Scheduling {
        alarm_id: ActivationId,
        #[source]
        source: PlatformError,
    },
    #[error("failed to allocate a notification id")]
    IdAllocation(#[source] PlatformError),
    #[error("malformed trigger payload: {0}")]
    MalformedPayload(String),
}

//! Error types for the world server host.

use world_index::{EntityId, WorldError};

/// Failures raised by the host around the world index.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The merged configuration failed validation
    #[error("Configuration validation failed: {0}")]
    InvalidConfig(String),

    /// The world index refused an operation
    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// No outbox channel is registered for the observer
    #[error("No outbox registered for observer {0}")]
    UnknownObserver(EntityId),

    /// The observer's receiving half has been dropped
    #[error("Outbox for observer {0} is closed")]
    ObserverClosed(EntityId),
}

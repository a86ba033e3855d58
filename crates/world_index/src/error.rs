//! Error types for world operations.
//!
//! Most public world operations report failure as `bool` or `Option` because
//! every failure in this layer is non-fatal. The `try_*` variants expose the
//! underlying [`WorldError`] for callers that want the reason.

use crate::types::{EntityId, MapId};

/// Enumeration of possible world errors.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The map id is not registered with this world
    #[error("Unknown map: {0}")]
    UnknownMap(MapId),

    /// The coordinate lies outside the map's dimensions
    #[error("Point ({x}, {y}) is outside {map}")]
    OutOfBounds { map: MapId, x: i32, y: i32 },

    /// The handle does not resolve to a live entity
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// The entity already occupies a cell
    #[error("Entity {0} is already placed")]
    AlreadyPlaced(EntityId),

    /// The entity is not attached to any map
    #[error("Entity {0} is not placed on any map")]
    NotPlaced(EntityId),

    /// An open marker with the same view already occupies the cell
    #[error("Marker with view {view} already open at ({x}, {y}) on {map}")]
    DuplicateMarker { map: MapId, x: i32, y: i32, view: u32 },

    /// The marker pool refused to hand out another instance
    #[error("Marker pool exhausted")]
    PoolExhausted,

    /// The entity exists but is not a visible marker
    #[error("Entity {0} is not a visible marker")]
    NotAMarker(EntityId),

    /// A broadcast message could not be produced
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A per-tick entity update failed
    #[error("Update error: {0}")]
    Update(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for WorldError {
    fn from(err: serde_json::Error) -> Self {
        WorldError::Serialization(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type WorldResult<T> = Result<T, WorldError>;

//! # World Index
//!
//! The spatial core of a tile-based multiplayer simulation server. It answers
//! three questions every server tick depends on:
//!
//! * **Where is everything?** Every placed entity lives in exactly one
//!   [`MapCell`] of a [`SpatialGrid`], indexed by kind in a [`WorldMap`].
//! * **Who needs to know?** The [`VisibilityBroadcaster`] pushes appear and
//!   disappear messages to every player inside a fixed window around a change.
//! * **How much work this tick?** The [`UpdateScheduler`] advances a bounded
//!   slice of long-lived entities per heartbeat with a resumable cursor, and the
//!   [`DeferredDeletionQueue`] recycles closed markers into an [`ObjectPool`]
//!   after a grace window.
//!
//! Everything is composed by [`World`], a plain synchronous value. Concurrent
//! callers share it through [`SharedWorld`], which guards the whole world with
//! one `tokio` mutex.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use world_index::{Actor, MapDefinition, MapId, NullSink, OpenTerrain, World, WorldConfig};
//!
//! let mut config = WorldConfig::default();
//! config.maps.push(MapDefinition::new(MapId(1), 64, 64));
//!
//! let mut world = World::new(config, Arc::new(NullSink), Arc::new(OpenTerrain))?;
//! let player = world.spawn(Box::new(Actor::player("ayla")));
//! assert!(world.place_entity(player, MapId(1), 10, 10));
//! assert_eq!(world.entities_in_range(MapId(1), 10, 10, 1), vec![player]);
//! # Ok::<(), world_index::WorldError>(())
//! ```

pub mod broadcast;
pub mod config;
pub mod deletion;
pub mod error;
pub mod events;
pub mod grid;
pub mod marker;
pub mod object;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod search;
pub mod stats;
pub mod timer;
pub mod types;
pub mod world;

#[cfg(test)]
mod tests;

pub use broadcast::{BroadcastStats, Notice, NullSink, ObserverSink, VisibilityBroadcaster};
pub use config::{MapDefinition, WorldConfig, MAX_DELETION_GRACE_MS};
pub use deletion::{DeferredDeletionQueue, DeletionEntry};
pub use error::{WorldError, WorldResult};
pub use events::{ListenerId, ListenerRegistry, WorldEvent, WorldListener};
pub use grid::{CellFlags, MapCell, SpatialGrid};
pub use marker::{MarkerBehavior, MarkerSpec, VisibleMarker};
pub use object::{
    snapshot_message, Actor, Broadcastable, MessageContext, TickContext, TickOutcome, WorldObject,
};
pub use pool::{ObjectPool, PoolStats, Poolable};
pub use registry::{MapEntry, RangeFilter, WorldMap};
pub use scheduler::{ActiveList, BatchReport, UpdateCursor, UpdateScheduler};
pub use search::{BlockingOracle, OpenTerrain, PointSearchEngine, SEARCH_OFFSETS};
pub use stats::WorldStats;
pub use timer::IntervalTimer;
pub use types::{EntityId, EntityKind, MapId, Placement, Point};
pub use world::{EntityRecord, SharedWorld, TickReport, World};

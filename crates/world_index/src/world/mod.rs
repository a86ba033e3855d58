//! # World
//!
//! [`World`] composes the grid registries, the broadcaster, the point search,
//! both update schedulers, the deferred deletion queue and the marker pool
//! into the per-world manager game logic talks to.
//!
//! A world is a plain synchronous value: every operation takes `&self` or
//! `&mut self`, runs in memory and is bounded by the map size or the batch
//! size. Concurrent callers go through [`SharedWorld`], which serializes them
//! behind a single lock.
//!
//! ## Entity lifecycle
//!
//! ```text
//! spawn ──► place_entity ──► (move_entity)* ──► remove_entity ──► despawn
//!                 │                                    │
//!                 └─ appear broadcast                  └─ disappear broadcast
//! ```
//!
//! Visible markers follow their own path through
//! [`create_visible_marker`](World::create_visible_marker) and
//! [`close_visible_marker`](World::close_visible_marker); closed markers wait in
//! the deletion queue and are recycled into the marker pool by
//! [`tick`](World::tick).

mod arena;
mod markers;
mod placement;
mod shared;
mod tick;

pub use arena::EntityRecord;
pub use shared::SharedWorld;
pub use tick::TickReport;

use crate::broadcast::{ObserverSink, VisibilityBroadcaster};
use crate::config::WorldConfig;
use crate::deletion::DeferredDeletionQueue;
use crate::error::WorldResult;
use crate::events::{ListenerId, ListenerRegistry, WorldListener};
use crate::marker::VisibleMarker;
use crate::object::WorldObject;
use crate::pool::ObjectPool;
use crate::registry::WorldMap;
use crate::scheduler::{ActiveList, UpdateCursor, UpdateScheduler};
use crate::search::{BlockingOracle, PointSearchEngine};
use crate::stats::WorldStats;
use crate::types::{EntityId, EntityKind, MapId, Placement};
use arena::EntityArena;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    ticks: u64,
    updates: u64,
    update_failures: u64,
    markers_created: u64,
    markers_rejected: u64,
    markers_recycled: u64,
    early_recycles: u64,
}

/// Per-world manager.
pub struct World {
    config: WorldConfig,
    maps: BTreeMap<MapId, WorldMap>,
    arena: EntityArena,
    broadcaster: VisibilityBroadcaster,
    oracle: Arc<dyn BlockingOracle>,
    search: PointSearchEngine,
    entity_scheduler: UpdateScheduler,
    behavior_scheduler: UpdateScheduler,
    active: ActiveList,
    behaviors: ActiveList,
    entity_cursor: UpdateCursor,
    behavior_cursor: UpdateCursor,
    deletions: DeferredDeletionQueue,
    marker_pool: ObjectPool<VisibleMarker>,
    listeners: ListenerRegistry,
    counters: Counters,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("maps", &self.maps.len())
            .field("entities", &self.arena.len())
            .field("active", &self.active.len())
            .field("behaviors", &self.behaviors.len())
            .field("pending_deletions", &self.deletions.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Builds a world and creates every map listed in `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before anything is allocated
    /// * `sink` - Delivery path for appear / disappear messages
    /// * `oracle` - Terrain blocking lookup used by point search
    ///
    /// # Returns
    ///
    /// The world, or [`WorldError::InvalidConfig`](crate::WorldError::InvalidConfig)
    /// when the configuration is inconsistent.
    pub fn new(
        config: WorldConfig,
        sink: Arc<dyn ObserverSink>,
        oracle: Arc<dyn BlockingOracle>,
    ) -> WorldResult<Self> {
        config.validate()?;

        let mut world = Self {
            maps: BTreeMap::new(),
            arena: EntityArena::default(),
            broadcaster: VisibilityBroadcaster::new(config.view_radius, sink),
            oracle,
            search: PointSearchEngine::new(config.drop_stack_limit),
            entity_scheduler: UpdateScheduler::new("entities", config.batch_size),
            behavior_scheduler: UpdateScheduler::new("behaviors", config.behavior_batch_size),
            active: ActiveList::new(),
            behaviors: ActiveList::new(),
            entity_cursor: UpdateCursor::start(),
            behavior_cursor: UpdateCursor::start(),
            deletions: DeferredDeletionQueue::new(config.deletion_queue_capacity),
            marker_pool: ObjectPool::with_preallocated(
                config.marker_pool_preallocate,
                config.marker_pool_limit,
            ),
            listeners: ListenerRegistry::new(),
            counters: Counters::default(),
            config,
        };

        for definition in world.config.maps.clone() {
            world.add_map(definition)?;
        }

        info!(
            maps = world.maps.len(),
            batch_size = world.config.batch_size,
            view_radius = world.config.view_radius,
            "🌍 World initialized"
        );
        Ok(world)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn map(&self, id: MapId) -> Option<&WorldMap> {
        self.maps.get(&id)
    }

    pub fn map_ids(&self) -> impl Iterator<Item = MapId> + '_ {
        self.maps.keys().copied()
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.arena.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.arena.get_mut(id)
    }

    /// Borrows an entity as its concrete type.
    pub fn get<T: WorldObject>(&self, id: EntityId) -> Option<&T> {
        self.arena.get(id)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: WorldObject>(&mut self, id: EntityId) -> Option<&mut T> {
        self.arena.get_mut(id)?.downcast_mut::<T>()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.arena.contains(id)
    }

    pub fn placement(&self, id: EntityId) -> Option<Placement> {
        self.arena.get(id)?.placement
    }

    /// Whether `id` is in either update list.
    pub fn is_scheduled(&self, id: EntityId) -> bool {
        self.active.contains(id) || self.behaviors.contains(id)
    }

    pub fn subscribe(&mut self, listener: Arc<dyn WorldListener>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            maps: self.maps.len(),
            entities: self.arena.len(),
            placed: self.maps.values().map(WorldMap::len).sum(),
            active: self.active.len(),
            behaviors: self.behaviors.len(),
            open_markers: self
                .maps
                .values()
                .map(|map| map.count_of(EntityKind::VisibleEvent))
                .sum(),
            pending_deletions: self.deletions.len(),
            ticks: self.counters.ticks,
            updates: self.counters.updates,
            update_failures: self.counters.update_failures,
            markers_created: self.counters.markers_created,
            markers_rejected: self.counters.markers_rejected,
            markers_recycled: self.counters.markers_recycled,
            early_recycles: self.counters.early_recycles,
            broadcast: self.broadcaster.stats(),
            marker_pool: self.marker_pool.stats(),
        }
    }
}

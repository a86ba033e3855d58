//! Shared, lock-guarded world handle for concurrent callers.

use super::{TickReport, World};
use crate::events::{ListenerId, WorldListener};
use crate::marker::{MarkerBehavior, MarkerSpec};
use crate::object::WorldObject;
use crate::stats::WorldStats;
use crate::types::{EntityId, EntityKind, MapId, Point};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle to a [`World`] behind one exclusive lock.
///
/// Every operation locks the whole world for its duration, which is the
/// single critical section covering placement, marker lifecycles, cursor
/// advancement and pool access. Nothing awaits while the lock is held.
#[derive(Debug, Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Locks the world for a sequence of operations.
    pub async fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock().await
    }

    /// Runs `f` with the world locked.
    pub async fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut world = self.inner.lock().await;
        f(&mut world)
    }

    pub async fn spawn(&self, object: Box<dyn WorldObject>) -> EntityId {
        self.inner.lock().await.spawn(object)
    }

    pub async fn despawn(&self, id: EntityId) -> Option<Box<dyn WorldObject>> {
        self.inner.lock().await.despawn(id)
    }

    pub async fn place_entity(&self, id: EntityId, map: MapId, x: i32, y: i32) -> bool {
        self.inner.lock().await.place_entity(id, map, x, y)
    }

    pub async fn remove_entity(&self, id: EntityId) -> bool {
        self.inner.lock().await.remove_entity(id)
    }

    pub async fn move_entity(&self, id: EntityId, x: i32, y: i32) -> bool {
        self.inner.lock().await.move_entity(id, x, y)
    }

    pub async fn cell_members(&self, map: MapId, x: i32, y: i32) -> Option<Vec<EntityId>> {
        let world = self.inner.lock().await;
        world.cell_at(map, x, y).map(|cell| cell.members().to_vec())
    }

    pub async fn entities_in_range(&self, map: MapId, x: i32, y: i32, radius: u32) -> Vec<EntityId> {
        self.inner.lock().await.entities_in_range(map, x, y, radius)
    }

    pub async fn count_duplicates_at(&self, map: MapId, x: i32, y: i32, kind: EntityKind) -> Option<usize> {
        self.inner.lock().await.count_duplicates_at(map, x, y, kind)
    }

    pub async fn create_visible_marker(
        &self,
        spec: MarkerSpec,
        behavior: Option<Box<dyn MarkerBehavior>>,
    ) -> Option<EntityId> {
        self.inner.lock().await.create_visible_marker(spec, behavior)
    }

    pub async fn close_visible_marker(&self, id: EntityId) -> bool {
        self.inner.lock().await.close_visible_marker(id)
    }

    pub async fn find_valid_points(&self, map: MapId, x: i32, y: i32, max: usize) -> Vec<Point> {
        self.inner.lock().await.find_valid_points(map, x, y, max)
    }

    pub async fn find_drop_points(&self, map: MapId, x: i32, y: i32, max: usize) -> Vec<Point> {
        self.inner.lock().await.find_drop_points(map, x, y, max)
    }

    pub async fn tick(&self) -> TickReport {
        self.inner.lock().await.tick()
    }

    pub async fn stats(&self) -> WorldStats {
        self.inner.lock().await.stats()
    }

    pub async fn subscribe(&self, listener: Arc<dyn WorldListener>) -> ListenerId {
        self.inner.lock().await.subscribe(listener)
    }

    pub async fn flush_deletions(&self) -> usize {
        self.inner.lock().await.flush_deletions()
    }
}

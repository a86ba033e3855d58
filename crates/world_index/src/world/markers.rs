//! Visible marker lifecycle: pool → create → place → close → grace → pool.

use super::World;
use crate::deletion::DeletionEntry;
use crate::error::{WorldError, WorldResult};
use crate::events::WorldEvent;
use crate::marker::{MarkerBehavior, MarkerSpec, VisibleMarker};
use crate::types::{EntityId, Placement};
use tokio::time::Instant;
use tracing::{debug, warn};

impl World {
    /// Creates and places a marker.
    ///
    /// Returns `None` when the map or point is invalid, when an open marker
    /// with the same view already sits on the cell, or when the marker pool is
    /// exhausted. Markers with a behavior join the behavior update list, the
    /// others join the active list.
    pub fn create_visible_marker(
        &mut self,
        spec: MarkerSpec,
        behavior: Option<Box<dyn MarkerBehavior>>,
    ) -> Option<EntityId> {
        self.create_visible_marker_at(spec, behavior, Instant::now())
    }

    /// [`create_visible_marker`](World::create_visible_marker) with the
    /// marker's timers armed at `now`, for callers driving
    /// [`tick_at`](World::tick_at).
    pub fn create_visible_marker_at(
        &mut self,
        spec: MarkerSpec,
        behavior: Option<Box<dyn MarkerBehavior>>,
        now: Instant,
    ) -> Option<EntityId> {
        match self.try_create_visible_marker_at(spec, behavior, now) {
            Ok(id) => Some(id),
            Err(err) => {
                self.counters.markers_rejected += 1;
                debug!(
                    map = %spec.map,
                    x = spec.point.x,
                    y = spec.point.y,
                    view = spec.view,
                    error = %err,
                    "Marker creation refused"
                );
                None
            }
        }
    }

    /// [`create_visible_marker`](World::create_visible_marker) with the
    /// failure reason.
    pub fn try_create_visible_marker(
        &mut self,
        spec: MarkerSpec,
        behavior: Option<Box<dyn MarkerBehavior>>,
    ) -> WorldResult<EntityId> {
        self.try_create_visible_marker_at(spec, behavior, Instant::now())
    }

    pub fn try_create_visible_marker_at(
        &mut self,
        spec: MarkerSpec,
        behavior: Option<Box<dyn MarkerBehavior>>,
        now: Instant,
    ) -> WorldResult<EntityId> {
        let world_map = self.maps.get(&spec.map).ok_or(WorldError::UnknownMap(spec.map))?;
        let cell = world_map.cell(spec.point).ok_or(WorldError::OutOfBounds {
            map: spec.map,
            x: spec.point.x,
            y: spec.point.y,
        })?;

        let duplicate = cell.members().iter().any(|member| {
            self.arena
                .get(*member)
                .and_then(|record| record.downcast_ref::<VisibleMarker>())
                .is_some_and(|marker| marker.matches(spec.view))
        });
        if duplicate {
            return Err(WorldError::DuplicateMarker {
                map: spec.map,
                x: spec.point.x,
                y: spec.point.y,
                view: spec.view,
            });
        }

        let mut marker = self.marker_pool.get().ok_or(WorldError::PoolExhausted)?;
        let has_behavior = behavior.is_some();
        marker.create(&spec, behavior, now);
        let id = self.arena.insert(marker);

        if let Err(err) = self.try_place(id, spec.map, spec.point) {
            self.discard_marker(id);
            return Err(err);
        }

        if has_behavior {
            self.behaviors.insert(id);
        } else {
            self.active.insert(id);
        }
        self.counters.markers_created += 1;
        self.listeners.publish(&WorldEvent::MarkerCreated {
            id,
            placement: Placement::new(spec.map, spec.point),
        });
        Ok(id)
    }

    /// Closes a marker. Idempotent: returns `false` if it was already closed
    /// or `id` is not a live marker.
    ///
    /// The marker is detached with a disappear broadcast and leaves both
    /// update lists at once; its storage is recycled after the grace window.
    pub fn close_visible_marker(&mut self, id: EntityId) -> bool {
        self.close_marker_at(id, Instant::now())
    }

    pub(crate) fn close_marker_at(&mut self, id: EntityId, now: Instant) -> bool {
        if !self.mark_closed(id) {
            return false;
        }

        let entry = DeletionEntry::new(id, self.config.deletion_grace(), now);
        if let Err(entry) = self.deletions.enqueue(entry) {
            warn!(
                entity = %id,
                capacity = self.deletions.capacity(),
                "⚠️ Deletion queue full, recycling marker immediately"
            );
            self.counters.early_recycles += 1;
            self.recycle_marker(entry.id(), true);
        }
        true
    }

    /// An open marker. `None` once it is closed, even while its storage is
    /// still waiting in the deletion queue.
    pub fn marker(&self, id: EntityId) -> Option<&VisibleMarker> {
        self.arena
            .get(id)?
            .downcast_ref::<VisibleMarker>()
            .filter(|marker| !marker.is_closed())
    }

    /// Recycles every marker waiting in the deletion queue, ignoring grace
    /// windows. Used on shutdown.
    pub fn flush_deletions(&mut self) -> usize {
        let entries = self.deletions.drain();
        entries
            .iter()
            .filter(|entry| self.recycle_marker(entry.id(), true))
            .count()
    }

    /// Closes a marker and recycles it without a grace window.
    pub(crate) fn retire_marker(&mut self, id: EntityId) {
        if self.mark_closed(id) {
            self.recycle_marker(id, true);
        }
    }

    /// Closes the marker, detaches it and drops it from the update lists.
    fn mark_closed(&mut self, id: EntityId) -> bool {
        let Some(record) = self.arena.get_mut(id) else {
            debug!(entity = %id, "Close of unknown entity ignored");
            return false;
        };
        let Some(marker) = record.downcast_mut::<VisibleMarker>() else {
            let err = WorldError::NotAMarker(id);
            debug!(error = %err, "Close rejected");
            return false;
        };
        if !marker.close() {
            return false;
        }

        if record.placement.is_some() {
            if let Err(err) = self.try_remove(id) {
                debug!(entity = %id, error = %err, "Detach on close failed");
            }
        }
        self.active.remove(id);
        self.behaviors.remove(id);
        self.listeners.publish(&WorldEvent::MarkerClosed { id });
        true
    }

    /// Returns a marker that never became visible to the pool. Nothing is
    /// published and no recycle is counted.
    pub(crate) fn discard_marker(&mut self, id: EntityId) -> bool {
        let Some(record) = self.arena.remove(id) else {
            return false;
        };
        self.active.remove(id);
        self.behaviors.remove(id);
        match record.object.into_any().downcast::<VisibleMarker>() {
            Ok(marker) => {
                self.marker_pool.put(marker);
                true
            }
            Err(_) => {
                warn!(entity = %id, "⚠️ Discarded entity is not a marker");
                false
            }
        }
    }

    /// Returns a marker's storage to the pool.
    pub(crate) fn recycle_marker(&mut self, id: EntityId, early: bool) -> bool {
        let Some(record) = self.arena.remove(id) else {
            return false;
        };
        match record.object.into_any().downcast::<VisibleMarker>() {
            Ok(marker) => self.marker_pool.put(marker),
            Err(_) => {
                warn!(entity = %id, "⚠️ Deletion queue held an entity that is not a marker");
                return false;
            }
        }

        self.counters.markers_recycled += 1;
        self.listeners.publish(&WorldEvent::MarkerRecycled { id, early });
        true
    }
}

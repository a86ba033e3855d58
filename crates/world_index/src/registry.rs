//! Per-map object registry.
//!
//! [`WorldMap`] pairs a [`SpatialGrid`] with category indices over the
//! entities placed on it. It is the only code that mutates cell membership, so
//! it owns the invariant that every placed entity sits in exactly one cell and
//! that cell matches its recorded point. It also maintains cell event flags:
//! a flag stays raised only while some event-kind occupant exposes it.

use crate::error::{WorldError, WorldResult};
use crate::grid::{CellFlags, MapCell, SpatialGrid};
use crate::types::{EntityId, EntityKind, MapId, Point};
use std::collections::{BTreeMap, BTreeSet};

/// What the registry remembers about a placed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub point: Point,
    pub kind: EntityKind,
    pub flags: CellFlags,
}

/// Which entities a range query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeFilter {
    #[default]
    All,
    Kind(EntityKind),
}

/// One map: its grid plus category indices.
#[derive(Debug)]
pub struct WorldMap {
    id: MapId,
    grid: SpatialGrid,
    entries: BTreeMap<EntityId, MapEntry>,
    players: BTreeSet<EntityId>,
    monsters: BTreeSet<EntityId>,
    npcs: BTreeSet<EntityId>,
    items: BTreeSet<EntityId>,
}

impl WorldMap {
    pub fn new(id: MapId, width: u32, height: u32) -> Self {
        Self {
            id,
            grid: SpatialGrid::new(width, height),
            entries: BTreeMap::new(),
            players: BTreeSet::new(),
            monsters: BTreeSet::new(),
            npcs: BTreeSet::new(),
            items: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn cell(&self, point: Point) -> Option<&MapCell> {
        self.grid.cell(point)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.grid.contains(point)
    }

    /// Registry entry of a placed entity.
    pub fn entry(&self, id: EntityId) -> Option<&MapEntry> {
        self.entries.get(&id)
    }

    /// Number of entities placed on this map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of placed entities of `kind`.
    pub fn count_of(&self, kind: EntityKind) -> usize {
        match self.category(kind) {
            Some(set) => set.len(),
            None => self.entries.values().filter(|entry| entry.kind == kind).count(),
        }
    }

    fn category(&self, kind: EntityKind) -> Option<&BTreeSet<EntityId>> {
        match kind {
            EntityKind::Player => Some(&self.players),
            EntityKind::Monster => Some(&self.monsters),
            EntityKind::Npc => Some(&self.npcs),
            EntityKind::Item => Some(&self.items),
            _ => None,
        }
    }

    fn category_mut(&mut self, kind: EntityKind) -> Option<&mut BTreeSet<EntityId>> {
        match kind {
            EntityKind::Player => Some(&mut self.players),
            EntityKind::Monster => Some(&mut self.monsters),
            EntityKind::Npc => Some(&mut self.npcs),
            EntityKind::Item => Some(&mut self.items),
            _ => None,
        }
    }

    /// Places `id` at `point` and indexes it under `kind`.
    pub(crate) fn add_object(
        &mut self,
        id: EntityId,
        kind: EntityKind,
        flags: CellFlags,
        point: Point,
    ) -> WorldResult<()> {
        if self.entries.contains_key(&id) {
            return Err(WorldError::AlreadyPlaced(id));
        }
        if !self.grid.place(id, point) {
            return Err(WorldError::OutOfBounds {
                map: self.id,
                x: point.x,
                y: point.y,
            });
        }

        let flags = if kind.is_event() { flags } else { CellFlags::NONE };
        if !flags.is_empty() {
            if let Some(cell) = self.grid.cell_mut(point) {
                let raised = cell.flags() | flags;
                cell.set_flags(raised);
            }
        }

        if let Some(category) = self.category_mut(kind) {
            category.insert(id);
        }
        self.entries.insert(id, MapEntry { point, kind, flags });
        Ok(())
    }

    /// Removes `id` from its cell and indices.
    ///
    /// Returns `None` when the entity is not on this map; nothing changes in
    /// that case.
    pub(crate) fn remove_object(&mut self, id: EntityId) -> Option<MapEntry> {
        let entry = self.entries.remove(&id)?;
        self.grid.remove(id, entry.point);
        if let Some(category) = self.category_mut(entry.kind) {
            category.remove(&id);
        }
        if !entry.flags.is_empty() {
            self.refresh_flags(entry.point);
        }
        Some(entry)
    }

    /// Recomputes a cell's flags from its remaining event-kind occupants.
    fn refresh_flags(&mut self, point: Point) {
        let Some(cell) = self.grid.cell(point) else {
            return;
        };
        let flags = cell
            .members()
            .iter()
            .filter_map(|member| self.entries.get(member))
            .filter(|entry| entry.kind.is_event())
            .fold(CellFlags::NONE, |acc, entry| acc | entry.flags);
        if let Some(cell) = self.grid.cell_mut(point) {
            cell.set_flags(flags);
        }
    }

    /// Entities within Chebyshev distance `radius` of `center`.
    ///
    /// A linear scan over the matching category index (or every entry for
    /// kinds without one). Results are ordered by entity id.
    pub fn objects_in_range(&self, center: Point, radius: u32, filter: RangeFilter) -> Vec<EntityId> {
        let in_range = |entry: &MapEntry| entry.point.chebyshev(center) <= radius;

        match filter {
            RangeFilter::All => self
                .entries
                .iter()
                .filter(|(_, entry)| in_range(*entry))
                .map(|(id, _)| *id)
                .collect(),
            RangeFilter::Kind(kind) => match self.category(kind) {
                Some(category) => category
                    .iter()
                    .filter(|id| self.entries.get(*id).is_some_and(in_range))
                    .copied()
                    .collect(),
                None => self
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.kind == kind && in_range(*entry))
                    .map(|(id, _)| *id)
                    .collect(),
            },
        }
    }

    /// Members of the cell at `point` with the given kind, in arrival order.
    pub fn members_of_kind(&self, point: Point, kind: EntityKind) -> Vec<EntityId> {
        self.grid
            .cell(point)
            .map(|cell| {
                cell.members()
                    .iter()
                    .filter(|member| self.entries.get(*member).is_some_and(|e| e.kind == kind))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Detaches every entity and clears the grid. Returns the detached ids.
    pub(crate) fn clear(&mut self) -> Vec<EntityId> {
        let detached: Vec<EntityId> = self.entries.keys().copied().collect();
        self.entries.clear();
        self.players.clear();
        self.monsters.clear();
        self.npcs.clear();
        self.items.clear();
        self.grid.clear();
        detached
    }
}

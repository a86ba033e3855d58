//! # Core Type Definitions
//!
//! The small value types every other module speaks in: entity handles, map
//! identifiers, grid coordinates and the entity kind discriminant.
//!
//! ## Design Principles
//!
//! - **Type Safety**: wrapper types keep map ids and entity handles apart
//! - **Stable Handles**: [`EntityId`] carries a generation so a recycled slot
//!   never aliases a stale handle
//! - **Integer Grid**: coordinates are signed so out-of-bounds input can be
//!   represented and rejected instead of wrapping

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to an entity stored in a world's arena.
///
/// The handle is an index plus a generation. Once an entity is despawned its
/// slot may be reused, but the generation is bumped, so an old handle simply
/// stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time this handle was issued.
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Identifier of a map (one grid) inside a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub u32);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

/// Integer cell coordinate on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by the given offset, or `None` when a
    /// coordinate would leave the `i32` range.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Chebyshev distance, `max(|dx|, |dy|)`.
    ///
    /// This is the range metric used by every "in range" query in the world.
    pub fn chebyshev(self, other: Point) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Discriminant describing what an entity is.
///
/// Players are the only observers; `Event` and `VisibleEvent` are the
/// event-kind entities allowed to raise cell flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Monster,
    Npc,
    Item,
    Event,
    VisibleEvent,
    Map,
}

impl EntityKind {
    /// Whether entities of this kind receive visibility notifications.
    pub const fn is_observer(self) -> bool {
        matches!(self, EntityKind::Player)
    }

    /// Whether entities of this kind may set cell event flags.
    pub const fn is_event(self) -> bool {
        matches!(self, EntityKind::Event | EntityKind::VisibleEvent)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Monster => "monster",
            EntityKind::Npc => "npc",
            EntityKind::Item => "item",
            EntityKind::Event => "event",
            EntityKind::VisibleEvent => "visible_event",
            EntityKind::Map => "map",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a placed entity currently is.
///
/// An entity without a placement is spawned but detached from every map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub map: MapId,
    pub point: Point,
}

impl Placement {
    pub const fn new(map: MapId, point: Point) -> Self {
        Self { map, point }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_uses_the_larger_axis() {
        let origin = Point::new(10, 10);
        assert_eq!(origin.chebyshev(Point::new(10, 10)), 0);
        assert_eq!(origin.chebyshev(Point::new(11, 11)), 1);
        assert_eq!(origin.chebyshev(Point::new(7, 12)), 3);
        assert_eq!(origin.chebyshev(Point::new(-2, 10)), 12);
    }

    #[test]
    fn test_only_players_observe() {
        assert!(EntityKind::Player.is_observer());
        assert!(!EntityKind::Monster.is_observer());
        assert!(!EntityKind::VisibleEvent.is_observer());
    }

    #[test]
    fn test_event_kinds() {
        assert!(EntityKind::Event.is_event());
        assert!(EntityKind::VisibleEvent.is_event());
        assert!(!EntityKind::Item.is_event());
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::new(4, 2).to_string(), "4v2");
        assert_eq!(MapId(7).to_string(), "map#7");
    }
}

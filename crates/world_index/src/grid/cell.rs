//! Per-coordinate occupancy record.

use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::{BitOr, BitOrAssign};

/// Event behavior bits stored on a cell.
///
/// The grid only stores these bits. They are raised and cleared by the
/// registry according to the event-kind entities occupying the cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellFlags(u8);

impl CellFlags {
    pub const NONE: Self = Self(0);
    /// An entity stepping onto the cell triggers an event
    pub const ENTER_EVENT: Self = Self(1 << 0);
    /// An entity stepping off the cell triggers an event
    pub const LEAVE_EVENT: Self = Self(1 << 1);
    /// The cell belongs to a town area
    pub const CITY_EVENT: Self = Self(1 << 2);

    pub const fn empty() -> Self {
        Self::NONE
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for CellFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for CellFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// One map coordinate: the entities standing on it, in arrival order, plus
/// its event flags.
#[derive(Debug, Clone, Default)]
pub struct MapCell {
    members: SmallVec<[EntityId; 4]>,
    flags: CellFlags,
}

impl MapCell {
    /// Entities on this cell in insertion order.
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub(crate) fn push(&mut self, id: EntityId) {
        self.members.push(id);
    }

    /// Removes `id`, preserving the order of the remaining members.
    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        match self.members.iter().position(|member| *member == id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_flags(&mut self, flags: CellFlags) {
        self.flags = flags;
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
        self.flags = CellFlags::NONE;
    }
}

//! # Visibility Broadcaster
//!
//! Area-of-interest notification. When an entity is placed, removed or moved,
//! every player inside a square window around the changed coordinate is told
//! about it. The window is `2r + 1` cells wide (25 × 25 for the default radius
//! of 12) and is scanned cell by cell, so each observer is visited once: an
//! entity occupies exactly one cell.
//!
//! The message is produced once per change and handed to the
//! [`ObserverSink`] for every observer. A message that fails to serialize is
//! logged and skipped; the caller of place or remove never sees the error.

use crate::error::WorldResult;
use crate::registry::WorldMap;
use crate::types::{EntityId, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Delivery of bytes to a player observer.
///
/// Delivery is best effort from the world's point of view; a sink that cannot
/// reach a player simply drops the message.
pub trait ObserverSink: Send + Sync {
    fn deliver(&self, observer: EntityId, message: &[u8]);
}

impl<F> ObserverSink for F
where
    F: Fn(EntityId, &[u8]) + Send + Sync,
{
    fn deliver(&self, observer: EntityId, message: &[u8]) {
        self(observer, message)
    }
}

/// Sink that discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ObserverSink for NullSink {
    fn deliver(&self, _observer: EntityId, _message: &[u8]) {}
}

/// Which notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Appear,
    Disappear,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Appear => f.write_str("appear"),
            Notice::Disappear => f.write_str("disappear"),
        }
    }
}

/// Broadcast counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastStats {
    /// Appear notifications broadcast
    pub appear_broadcasts: u64,
    /// Disappear notifications broadcast
    pub disappear_broadcasts: u64,
    /// Individual deliveries handed to the sink
    pub messages_delivered: u64,
    /// Notifications skipped because the message failed to serialize
    pub serialization_failures: u64,
}

/// Fixed-window appear / disappear notifier.
pub struct VisibilityBroadcaster {
    radius: u32,
    sink: Arc<dyn ObserverSink>,
    stats: BroadcastStats,
}

impl fmt::Debug for VisibilityBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityBroadcaster")
            .field("radius", &self.radius)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl VisibilityBroadcaster {
    pub fn new(radius: u32, sink: Arc<dyn ObserverSink>) -> Self {
        Self {
            radius,
            sink,
            stats: BroadcastStats::default(),
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn stats(&self) -> BroadcastStats {
        self.stats
    }

    /// Players in the window around `center`, excluding `exclude`.
    ///
    /// Observers come out in cell scan order (row-major), then arrival order
    /// within a cell.
    pub fn observers_around(&self, map: &WorldMap, center: Point, exclude: Option<EntityId>) -> Vec<EntityId> {
        self.scan(map, center, exclude, |map, member| {
            map.entry(member).is_some_and(|entry| entry.kind.is_observer())
        })
    }

    /// Every entity in the window around `center`, excluding `exclude`.
    pub fn members_around(&self, map: &WorldMap, center: Point, exclude: Option<EntityId>) -> Vec<EntityId> {
        self.scan(map, center, exclude, |_, _| true)
    }

    fn scan<P>(&self, map: &WorldMap, center: Point, exclude: Option<EntityId>, keep: P) -> Vec<EntityId>
    where
        P: Fn(&WorldMap, EntityId) -> bool,
    {
        let mut found = Vec::new();
        for point in map.grid().window(center, self.radius) {
            let Some(cell) = map.cell(point) else {
                continue;
            };
            for member in cell.members() {
                if Some(*member) != exclude && keep(map, *member) {
                    found.push(*member);
                }
            }
        }
        found
    }

    /// Notifies every observer around `center` about `subject`.
    ///
    /// Returns the number of deliveries. A failed message is logged, counted
    /// and results in zero deliveries.
    pub fn broadcast(
        &mut self,
        map: &WorldMap,
        center: Point,
        subject: EntityId,
        notice: Notice,
        message: WorldResult<Vec<u8>>,
    ) -> usize {
        let Some(bytes) = self.accept(subject, notice, message) else {
            return 0;
        };
        let observers = self.observers_around(map, center, Some(subject));
        self.deliver_to(&observers, &bytes)
    }

    /// Delivers `message` to an explicit observer list.
    pub fn deliver_to(&mut self, observers: &[EntityId], message: &[u8]) -> usize {
        for observer in observers {
            self.sink.deliver(*observer, message);
        }
        self.stats.messages_delivered += observers.len() as u64;
        observers.len()
    }

    /// Counts a notice and unwraps its message, logging serialization failure.
    pub fn accept(&mut self, subject: EntityId, notice: Notice, message: WorldResult<Vec<u8>>) -> Option<Vec<u8>> {
        match message {
            Ok(bytes) => {
                match notice {
                    Notice::Appear => self.stats.appear_broadcasts += 1,
                    Notice::Disappear => self.stats.disappear_broadcasts += 1,
                }
                trace!(entity = %subject, %notice, bytes = bytes.len(), "broadcasting");
                Some(bytes)
            }
            Err(err) => {
                self.stats.serialization_failures += 1;
                warn!(entity = %subject, %notice, error = %err, "⚠️ Skipping broadcast, message failed to serialize");
                None
            }
        }
    }
}

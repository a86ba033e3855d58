//! Deferred deletion of closed markers.
//!
//! A closed marker is no longer visible or scheduled, but its storage is held
//! for a grace window before it goes back to the pool. The queue is a plain
//! bounded FIFO: each maintenance step pops one entry and either hands it back
//! for recycling or, if its grace window is still running, puts it at the back.
//! Because every entry waits the same fixed window, this retry scan drains in
//! close order without a priority queue.

use crate::timer::IntervalTimer;
use crate::types::EntityId;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// A closed marker waiting out its grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionEntry {
    id: EntityId,
    grace: IntervalTimer,
}

impl DeletionEntry {
    /// Starts a grace window of `grace` at `now`. A zero window expires at once.
    pub fn new(id: EntityId, grace: Duration, now: Instant) -> Self {
        Self {
            id,
            grace: IntervalTimer::armed(grace, now),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Instant the entry was closed, if it has a grace window.
    pub fn closed_at(&self) -> Option<Instant> {
        self.grace.started_at()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        !self.grace.is_armed() || self.grace.has_elapsed(now)
    }
}

/// Bounded FIFO-with-retry of [`DeletionEntry`]s.
#[derive(Debug)]
pub struct DeferredDeletionQueue {
    entries: VecDeque<DeletionEntry>,
    capacity: usize,
}

impl DeferredDeletionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Queues `entry`, or gives it back when the queue is full so the caller
    /// can recycle it immediately.
    pub fn enqueue(&mut self, entry: DeletionEntry) -> Result<(), DeletionEntry> {
        if self.is_full() {
            return Err(entry);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// One maintenance step: pops the front entry and returns it if its grace
    /// window is over, otherwise moves it to the back.
    pub fn step(&mut self, now: Instant) -> Option<DeletionEntry> {
        let entry = self.entries.pop_front()?;
        if entry.is_expired(now) {
            Some(entry)
        } else {
            self.entries.push_back(entry);
            None
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empties the queue regardless of grace windows.
    pub fn drain(&mut self) -> Vec<DeletionEntry> {
        self.entries.drain(..).collect()
    }
}

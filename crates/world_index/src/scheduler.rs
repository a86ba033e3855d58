//! # Update Scheduler
//!
//! Amortizes per-tick work over long-lived entities. Each heartbeat advances at
//! most `batch_size` entries of an [`ActiveList`], starting where the previous
//! heartbeat stopped, so the cost of a tick is bounded by the batch size rather
//! than by the population.
//!
//! ## Cursor semantics
//!
//! The active list is keyed by a monotonically increasing insertion sequence.
//! An [`UpdateCursor`] remembers the first sequence number the next batch
//! should look at, not an element, so removing the entry it would have
//! visited is harmless: the next lookup resolves to the next live key. The
//! cursor moves past an entry *before* the entry is updated, which keeps the
//! traversal valid when the update removes the entry itself.
//!
//! Entries added during a cycle receive a higher sequence number than every
//! existing one and are therefore visited at most once before the cursor
//! wraps.

use crate::error::WorldResult;
use crate::types::EntityId;
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};

/// Insertion-ordered set of entity handles with stable sequence keys.
#[derive(Debug, Default)]
pub struct ActiveList {
    order: BTreeMap<u64, EntityId>,
    index: HashMap<EntityId, u64>,
    next_seq: u64,
}

impl ActiveList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id`. Returns `false` if it is already present.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id);
        self.index.insert(id, seq);
        true
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.index.remove(&id) {
            Some(seq) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.values().copied()
    }

    /// First live entry whose sequence is `seq` or later.
    pub fn first_from(&self, seq: u64) -> Option<(u64, EntityId)> {
        self.order.range(seq..).next().map(|(seq, id)| (*seq, *id))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

/// Saved traversal position into an [`ActiveList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCursor {
    next: u64,
}

impl UpdateCursor {
    /// A cursor at the start of the list.
    pub const fn start() -> Self {
        Self { next: 0 }
    }

    /// Sequence number the next batch begins at.
    pub fn position(&self) -> u64 {
        self.next
    }

    pub fn rewind(&mut self) {
        self.next = 0;
    }

    pub fn is_at_start(&self) -> bool {
        self.next == 0
    }
}

/// What a single batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Entries whose update ran
    pub visited: usize,
    /// Updates that returned an error
    pub failed: usize,
    /// The batch reached the end of the list and rewound the cursor
    pub wrapped: bool,
}

/// Bounded, resumable traversal over an [`ActiveList`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateScheduler {
    name: &'static str,
    batch_size: usize,
}

impl UpdateScheduler {
    /// Creates a scheduler. `name` only labels log output.
    pub fn new(name: &'static str, batch_size: usize) -> Self {
        Self {
            name,
            batch_size: batch_size.max(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs one batch.
    ///
    /// The list lives inside `host` so that `update` can mutate the host
    /// (including the list itself) between visits; `list` projects it back out
    /// on every step.
    ///
    /// # Arguments
    ///
    /// * `host` - Owner of the active list, handed to every update
    /// * `cursor` - Position saved by the previous batch
    /// * `list` - Accessor for the active list inside `host`
    /// * `update` - Per-entry update; an `Err` is logged and the batch goes on
    ///
    /// # Returns
    ///
    /// A [`BatchReport`] with the number of visits and failures.
    pub fn run_batch<H, F>(
        &self,
        host: &mut H,
        cursor: &mut UpdateCursor,
        list: fn(&H) -> &ActiveList,
        mut update: F,
    ) -> BatchReport
    where
        F: FnMut(&mut H, EntityId) -> WorldResult<()>,
    {
        let mut report = BatchReport::default();

        while report.visited < self.batch_size {
            let Some((seq, id)) = list(host).first_from(cursor.next) else {
                break;
            };
            cursor.next = seq + 1;
            report.visited += 1;

            if let Err(err) = update(host, id) {
                report.failed += 1;
                warn!(scheduler = self.name, entity = %id, error = %err, "⚠️ Update failed, continuing batch");
            }
        }

        if list(host).first_from(cursor.next).is_none() {
            cursor.rewind();
            report.wrapped = true;
        }

        trace!(
            scheduler = self.name,
            visited = report.visited,
            failed = report.failed,
            wrapped = report.wrapped,
            "batch complete"
        );
        report
    }
}

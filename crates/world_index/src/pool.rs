//! Reusable instance pool.
//!
//! Short-lived, frequently created entities (visible markers above all) are
//! handed out as boxes and returned to the pool instead of being freed, so a
//! busy map does not churn the allocator. The box itself is what gets reused:
//! a `Box<T>` checked out, coerced to a trait object and downcast back on
//! return keeps the same allocation.

use serde::{Deserialize, Serialize};

/// Types that can be stored in an [`ObjectPool`].
pub trait Poolable: Default {
    /// Clears all per-use state before the instance is stored for reuse.
    fn reset(&mut self);
}

/// Counters describing pool usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Instances waiting for reuse
    pub free: usize,
    /// Instances currently checked out
    pub outstanding: usize,
    /// Instances constructed over the pool's lifetime
    pub created: u64,
    /// Checkouts served from the free list
    pub reused: u64,
    /// Checkouts refused because the limit was reached
    pub refused: u64,
}

/// Pool of boxed, resettable instances.
///
/// `limit` bounds the number of instances checked out at once; `None` lets the
/// pool grow on demand. Exclusive ownership of the returned box means an
/// instance cannot be checked out twice without an intervening [`put`](Self::put).
#[derive(Debug)]
pub struct ObjectPool<T: Poolable> {
    free: Vec<Box<T>>,
    limit: Option<usize>,
    outstanding: usize,
    created: u64,
    reused: u64,
    refused: u64,
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            free: Vec::new(),
            limit,
            outstanding: 0,
            created: 0,
            reused: 0,
            refused: 0,
        }
    }

    /// Creates a pool and constructs `count` instances up front.
    pub fn with_preallocated(count: usize, limit: Option<usize>) -> Self {
        let mut pool = Self::new(limit);
        pool.preallocate(count);
        pool
    }

    /// Constructs instances until at least `count` are free.
    pub fn preallocate(&mut self, count: usize) {
        while self.free.len() < count {
            self.free.push(Box::default());
            self.created += 1;
        }
    }

    /// Checks out an instance.
    ///
    /// Returns a recycled instance when one is free, otherwise constructs a new
    /// one. Returns `None` when the outstanding limit is reached.
    pub fn get(&mut self) -> Option<Box<T>> {
        if self.limit.is_some_and(|limit| self.outstanding >= limit) {
            self.refused += 1;
            return None;
        }

        let item = match self.free.pop() {
            Some(item) => {
                self.reused += 1;
                item
            }
            None => {
                self.created += 1;
                Box::default()
            }
        };
        self.outstanding += 1;
        Some(item)
    }

    /// Resets an instance and stores it for reuse.
    pub fn put(&mut self, mut item: Box<T>) {
        item.reset();
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free.push(item);
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            outstanding: self.outstanding,
            created: self.created,
            reused: self.reused,
            refused: self.refused,
        }
    }
}

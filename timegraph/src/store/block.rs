//! Fixed-capacity timer block
//!
//! A block is appended to by the chain's single writer until it is full and
//! is immutable afterwards. It caches the `(min start, max end)` of its
//! records so range queries can reject the whole block in O(1).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use timegraph_common::{Tick, TimerInfo};

use super::arena::PushError;
use crate::domain::StoreError;

/// Outcome of [`TimerBlock::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Appended {
    At(usize),
    Full,
}

#[derive(Debug)]
pub struct TimerBlock {
    slots: Box<[OnceLock<TimerInfo>]>,
    len: AtomicUsize,
    min_start: AtomicU64,
    max_end: AtomicU64,
}

impl TimerBlock {
    /// Allocate an empty block able to hold `capacity` records.
    ///
    /// # Errors
    /// Returns [`StoreError::Allocation`] if the record slots cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, StoreError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, OnceLock::new);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            len: AtomicUsize::new(0),
            min_start: AtomicU64::new(Tick::MAX),
            max_end: AtomicU64::new(Tick::MIN),
        })
    }

    /// Single-writer append. Bounds are widened before the record is
    /// published, so a reader never sees a record outside the cached bounds.
    pub(crate) fn append(&self, timer: TimerInfo) -> Result<Appended, PushError> {
        let index = self.len.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(index) else {
            return Ok(Appended::Full);
        };

        slot.set(timer).map_err(|_| PushError::Occupied)?;
        self.min_start.fetch_min(timer.start, Ordering::Relaxed);
        self.max_end.fetch_max(timer.end, Ordering::Relaxed);
        self.len.store(index + 1, Ordering::Release);
        Ok(Appended::At(index))
    }


    /// Number of published records.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.size() == self.capacity()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimerInfo> {
        if index >= self.size() {
            return None;
        }
        self.slots.get(index)?.get()
    }

    /// Records published when the call was made, in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TimerInfo> + '_ {
        self.slots[..self.size()].iter().filter_map(OnceLock::get)
    }

    #[must_use]
    pub fn min_start(&self) -> Option<Tick> {
        if self.is_empty() {
            return None;
        }
        Some(self.min_start.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn max_end(&self) -> Option<Tick> {
        if self.is_empty() {
            return None;
        }
        Some(self.max_end.load(Ordering::Relaxed))
    }

    /// O(1) batch rejection test against the closed window `[start, end]`.
    #[must_use]
    pub fn intersects(&self, start: Tick, end: Tick) -> bool {
        if self.is_empty() {
            return false;
        }
        start <= self.max_end.load(Ordering::Relaxed)
            && end >= self.min_start.load(Ordering::Relaxed)
    }
}

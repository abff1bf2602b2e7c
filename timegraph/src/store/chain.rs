//! Timer chain: the unbounded, append-only record sequence of one
//! `(track, depth)` pair.
//!
//! The chain grows by opening new [`TimerBlock`]s in an [`Arena`], never by
//! reallocating, so every record handed to a reader keeps its address for
//! the lifetime of the chain. Only the last block is ever written, and only
//! by the chain's single writer.
//!
//! Records are addressed by [`ChainPosition`] (block index + slot index);
//! [`TimerRef`] pairs a borrowed record with its position so neighbours can
//! be found without searching.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{trace, warn};
use timegraph_common::{Tick, TimerInfo};

use super::arena::{Arena, PushError};
use super::block::{Appended, TimerBlock};
use crate::domain::StoreError;

/// Address of a record inside its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainPosition {
    pub block: usize,
    pub index: usize,
}

/// A stored record together with its position in the owning chain.
///
/// Two `TimerRef`s are equal only if they point at the same stored record.
#[derive(Clone, Copy)]
pub struct TimerRef<'a> {
    timer: &'a TimerInfo,
    position: ChainPosition,
}

impl<'a> TimerRef<'a> {
    fn at(timer: &'a TimerInfo, block: usize, index: usize) -> Self {
        Self {
            timer,
            position: ChainPosition { block, index },
        }
    }

    #[must_use]
    pub fn timer(&self) -> &'a TimerInfo {
        self.timer
    }

    #[must_use]
    pub fn position(&self) -> ChainPosition {
        self.position
    }
}

impl Deref for TimerRef<'_> {
    type Target = TimerInfo;

    fn deref(&self) -> &TimerInfo {
        self.timer
    }
}

impl PartialEq for TimerRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.timer, other.timer)
    }
}

impl Eq for TimerRef<'_> {}

impl std::fmt::Debug for TimerRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRef")
            .field("position", &self.position)
            .field("timer", self.timer)
            .finish()
    }
}

#[derive(Debug)]
pub struct TimerChain {
    depth: u32,
    block_capacity: usize,
    blocks: Arena<TimerBlock>,
    len: AtomicUsize,
}

impl TimerChain {
    #[must_use]
    pub fn new(depth: u32, block_capacity: usize) -> Self {
        Self {
            depth,
            block_capacity: block_capacity.max(1),
            blocks: Arena::new(),
            len: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of published records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Append a record. Must only be called by the chain's single writer.
    ///
    /// # Errors
    /// - [`StoreError::Allocation`] / [`StoreError::CapacityExhausted`] when a
    ///   new block cannot be opened
    /// - [`StoreError::WriterConflict`] when another writer raced this one
    pub fn push(&self, timer: TimerInfo) -> Result<ChainPosition, StoreError> {
        if let Some(block) = self.blocks.last() {
            let appended = block.append(timer).map_err(|e| self.push_failed(e))?;
            if let Appended::At(index) = appended {
                self.len.fetch_add(1, Ordering::Release);
                let block = self.blocks.len() - 1;
                return Ok(ChainPosition { block, index });
            }
        }

        // The record goes in before the block is published, so readers never
        // observe an empty block.
        let fresh = TimerBlock::with_capacity(self.block_capacity)?;
        fresh.append(timer).map_err(|e| self.push_failed(e))?;
        let block = self.blocks.push(fresh).map_err(|e| self.push_failed(e))?;
        self.len.fetch_add(1, Ordering::Release);

        trace!("Depth {} opened block {block}", self.depth);
        Ok(ChainPosition { block, index: 0 })
    }

    fn push_failed(&self, err: PushError) -> StoreError {
        match err {
            PushError::Occupied => {
                warn!("Second writer detected on depth {} chain", self.depth);
                StoreError::WriterConflict { depth: self.depth }
            }
            PushError::Store(err) => err,
        }
    }

    /// Blocks published when the call was made, in chain order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &TimerBlock> + '_ {
        self.blocks.iter()
    }

    #[must_use]
    pub fn get(&self, position: ChainPosition) -> Option<TimerRef<'_>> {
        self.get_at(position.block, position.index)
    }

    fn get_at(&self, block: usize, index: usize) -> Option<TimerRef<'_>> {
        let timer = self.blocks.get(block)?.get(index)?;
        Some(TimerRef::at(timer, block, index))
    }

    fn block_refs(block: usize, records: &TimerBlock) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        records
            .iter()
            .enumerate()
            .map(move |(index, timer)| TimerRef::at(timer, block, index))
    }

    /// All records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block, records)| Self::block_refs(block, records))
    }

    /// True if `timer` was handed out by this chain.
    #[must_use]
    pub fn contains(&self, timer: &TimerRef<'_>) -> bool {
        matches!(self.get(timer.position), Some(stored) if stored == *timer)
    }

    /// Record immediately preceding `timer` in chain order.
    #[must_use]
    pub fn element_before(&self, timer: &TimerRef<'_>) -> Option<TimerRef<'_>> {
        if !self.contains(timer) {
            return None;
        }
        let ChainPosition { block, index } = timer.position;
        if index > 0 {
            return self.get_at(block, index - 1);
        }
        let previous = block.checked_sub(1)?;
        let last = self.blocks.get(previous)?.size().checked_sub(1)?;
        self.get_at(previous, last)
    }

    /// Record immediately following `timer` in chain order.
    #[must_use]
    pub fn element_after(&self, timer: &TimerRef<'_>) -> Option<TimerRef<'_>> {
        if !self.contains(timer) {
            return None;
        }
        let ChainPosition { block, index } = timer.position;
        self.get_at(block, index + 1)
            .or_else(|| self.get_at(block + 1, 0))
    }

    /// First record whose start is strictly after `time`.
    ///
    /// Linear in the number of blocks plus one block's records: blocks whose
    /// last record starts at or before `time` are skipped without scanning.
    #[must_use]
    pub fn first_after(&self, time: Tick) -> Option<TimerRef<'_>> {
        for (block_index, block) in self.blocks.iter().enumerate() {
            let last = block.get(block.size().checked_sub(1)?)?;
            if last.start <= time {
                continue;
            }
            for (index, timer) in block.iter().enumerate() {
                if timer.start > time {
                    return Some(TimerRef::at(timer, block_index, index));
                }
            }
        }
        None
    }

    /// Last record whose start is at or before `time`.
    #[must_use]
    pub fn last_at_or_before(&self, time: Tick) -> Option<TimerRef<'_>> {
        let mut candidate = None;
        for (block_index, block) in self.blocks.iter().enumerate() {
            let Some(last_index) = block.size().checked_sub(1) else {
                break;
            };
            let last = block.get(last_index)?;
            if last.start <= time {
                candidate = Some(TimerRef::at(last, block_index, last_index));
                continue;
            }
            for (index, timer) in block.iter().enumerate() {
                if timer.start > time {
                    break;
                }
                candidate = Some(TimerRef::at(timer, block_index, index));
            }
            break;
        }
        candidate
    }

    /// Records overlapping `[min, max]`, rejecting whole blocks by their bounds.
    pub fn timers_in_range(&self, min: Tick, max: Tick) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .take_while(move |(_, block)| block.min_start().is_some_and(|start| start <= max))
            .filter(move |(_, block)| block.intersects(min, max))
            .flat_map(|(block, records)| Self::block_refs(block, records))
            .filter(move |timer| timer.overlaps(min, max))
    }
}

//! Depth store: per-track mapping from nesting depth to [`TimerChain`].
//!
//! ## Concurrency
//!
//! - Chains live in an append-only [`Arena`]; the depth table only maps a
//!   depth to an arena slot. Handing out `&TimerChain` therefore never
//!   requires holding a lock.
//! - Depths below [`DIRECT_DEPTHS`] map through a fixed array of `OnceLock`
//!   slots. Pushes, lookups and snapshots for them take no lock.
//! - Deeper depths live in a `parking_lot::RwLock` map, read-locked only for
//!   the lookup itself.
//! - The write side of that lock serialises chain creation for every depth
//!   and is held only for the arena push and the slot publication.
//! - Aggregates are relaxed atomics: readers may observe slightly stale
//!   values while a capture is running.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::OnceLock;

use log::debug;
use parking_lot::RwLock;
use timegraph_common::{Tick, TimerInfo};

use super::arena::{Arena, PushError};
use super::chain::{ChainPosition, TimerChain, TimerRef};
use crate::config::StoreConfig;
use crate::domain::StoreError;

/// Depths resolved through the lock-free slot array.
pub const DIRECT_DEPTHS: usize = 64;

/// Running aggregates over every record ingested by one store.
#[derive(Debug)]
struct TrackStats {
    count: AtomicU64,
    min_time: AtomicU64,
    max_time: AtomicU64,
    /// Deepest depth seen plus one (0 while empty)
    depth_levels: AtomicU64,
    /// Depth levels spanned by call-nesting records (core activity excluded)
    height: AtomicU32,
}

impl TrackStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            min_time: AtomicU64::new(Tick::MAX),
            max_time: AtomicU64::new(Tick::MIN),
            depth_levels: AtomicU64::new(0),
            height: AtomicU32::new(0),
        }
    }

    fn record(&self, timer: &TimerInfo) {
        let levels = timer.depth.saturating_add(1);
        let deepest = u64::from(timer.depth) + 1;
        self.min_time.fetch_min(timer.start, Ordering::Relaxed);
        self.max_time.fetch_max(timer.end, Ordering::Relaxed);
        self.depth_levels.fetch_max(deepest, Ordering::Relaxed);
        if !timer.is_core_activity() {
            self.height.fetch_max(levels, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Release);
    }
}

fn direct_index(depth: u32) -> Option<usize> {
    usize::try_from(depth)
        .ok()
        .filter(|&index| index < DIRECT_DEPTHS)
}

#[derive(Debug)]
pub struct DepthStore {
    block_capacity: usize,
    /// Arena slot of the chain for each depth below `DIRECT_DEPTHS`
    direct: [OnceLock<usize>; DIRECT_DEPTHS],
    /// Arena slots of deeper chains; its write lock guards chain creation
    deep: RwLock<BTreeMap<u32, usize>>,
    has_deep: AtomicBool,
    chains: Arena<TimerChain>,
    stats: TrackStats,
}

impl DepthStore {
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            block_capacity: config.block_capacity,
            direct: std::array::from_fn(|_| OnceLock::new()),
            deep: RwLock::new(BTreeMap::new()),
            has_deep: AtomicBool::new(false),
            chains: Arena::new(),
            stats: TrackStats::new(),
        }
    }

    /// Ingest one record: find or create the chain for its depth, append,
    /// then update the aggregates. Malformed records (`end < start`) are
    /// stored as-is.
    ///
    /// # Errors
    /// Propagates [`StoreError`] from chain creation or the append.
    pub fn record_timer(&self, timer: TimerInfo) -> Result<ChainPosition, StoreError> {
        if timer.end < timer.start {
            debug!(
                "Accepting timer with end {} before start {}",
                timer.end, timer.start
            );
        }

        let chain = self.chain_for_insert(timer.depth)?;
        let position = chain.push(timer)?;
        self.stats.record(&timer);
        Ok(position)
    }

    fn chain_for_insert(&self, depth: u32) -> Result<&TimerChain, StoreError> {
        if let Some(chain) = self.chain_at_depth(depth) {
            return Ok(chain);
        }

        let mut deep = self.deep.write();
        let existing = match direct_index(depth) {
            Some(index) => self.direct[index].get().copied(),
            None => deep.get(&depth).copied(),
        };
        let slot = match existing {
            Some(slot) => slot,
            None => self.create_chain(depth, &mut deep)?,
        };
        self.chains
            .get(slot)
            .ok_or(StoreError::WriterConflict { depth })
    }

    /// Caller holds the write lock of `deep`.
    fn create_chain(
        &self,
        depth: u32,
        deep: &mut BTreeMap<u32, usize>,
    ) -> Result<usize, StoreError> {
        let chain = TimerChain::new(depth, self.block_capacity);
        let slot = match self.chains.push(chain) {
            Ok(slot) => slot,
            Err(PushError::Occupied) => return Err(StoreError::WriterConflict { depth }),
            Err(PushError::Store(err)) => return Err(err),
        };

        if let Some(index) = direct_index(depth) {
            if self.direct[index].set(slot).is_err() {
                return Err(StoreError::WriterConflict { depth });
            }
        } else {
            deep.insert(depth, slot);
            self.has_deep.store(true, Ordering::Release);
        }
        debug!("Created timer chain for depth {depth}");
        Ok(slot)
    }

    #[must_use]
    pub fn chain_at_depth(&self, depth: u32) -> Option<&TimerChain> {
        let slot = match direct_index(depth) {
            Some(index) => *self.direct[index].get()?,
            None => *self.deep.read().get(&depth)?,
        };
        self.chains.get(slot)
    }

    /// Chains present right now, ordered by depth. Iterate the result
    /// freely; no lock is held once it is returned.
    #[must_use]
    pub fn chains_snapshot(&self) -> Vec<&TimerChain> {
        let mut slots: Vec<usize> = self
            .direct
            .iter()
            .filter_map(OnceLock::get)
            .copied()
            .collect();
        if self.has_deep.load(Ordering::Acquire) {
            slots.extend(self.deep.read().values().copied());
        }
        slots
            .into_iter()
            .filter_map(|slot| self.chains.get(slot))
            .collect()
    }

    #[must_use]
    pub fn depths(&self) -> Vec<u32> {
        self.chains_snapshot()
            .into_iter()
            .map(TimerChain::depth)
            .collect()
    }

    /// Every record overlapping `[min, max]`, depth by depth.
    pub fn timers_in_range(&self, min: Tick, max: Tick) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        self.chains_snapshot()
            .into_iter()
            .flat_map(move |chain| chain.timers_in_range(min, max))
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.stats.count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[must_use]
    pub fn min_time(&self) -> Option<Tick> {
        if self.is_empty() {
            return None;
        }
        Some(self.stats.min_time.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn max_time(&self) -> Option<Tick> {
        if self.is_empty() {
            return None;
        }
        Some(self.stats.max_time.load(Ordering::Relaxed))
    }

    /// Deepest depth observed; never decreases during a capture.
    #[must_use]
    pub fn max_depth(&self) -> Option<u32> {
        let levels = self.stats.depth_levels.load(Ordering::Relaxed);
        u32::try_from(levels.checked_sub(1)?).ok()
    }

    /// Number of nesting levels spanned by call records, for layout sizing.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.stats.height.load(Ordering::Relaxed)
    }

    /// Drop every chain; used when a new capture starts.
    pub fn clear(&mut self) {
        for slot in &mut self.direct {
            slot.take();
        }
        self.deep.get_mut().clear();
        *self.has_deep.get_mut() = false;
        self.chains = Arena::new();
        self.stats = TrackStats::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use timegraph_common::TimerType;

    fn store() -> DepthStore {
        DepthStore::new(&StoreConfig { block_capacity: 4 })
    }

    fn timer(start: Tick, end: Tick, depth: u32) -> TimerInfo {
        TimerInfo {
            start,
            end,
            depth,
            ..TimerInfo::default()
        }
    }

    #[test]
    fn test_chains_created_lazily_per_depth() {
        let store = store();
        assert!(store.chain_at_depth(0).is_none());

        store.record_timer(timer(0, 10, 2)).unwrap();
        store.record_timer(timer(1, 2, 0)).unwrap();

        assert_eq!(store.depths(), vec![0, 2]);
        assert!(store.chain_at_depth(1).is_none());
        let snapshot: Vec<u32> = store.chains_snapshot().iter().map(|c| c.depth()).collect();
        assert_eq!(snapshot, vec![0, 2]);
    }

    #[test]
    fn test_deep_depths_use_the_table() {
        let store = store();
        let deep = DIRECT_DEPTHS as u32 + 5;
        store.record_timer(timer(0, 10, deep)).unwrap();
        store.record_timer(timer(1, 2, 3)).unwrap();
        store.record_timer(timer(3, 4, deep)).unwrap();
        store.record_timer(timer(5, 6, u32::MAX)).unwrap();

        assert_eq!(store.depths(), vec![3, deep, u32::MAX]);
        assert_eq!(store.chain_at_depth(deep).map(TimerChain::len), Some(2));
        assert_eq!(store.max_depth(), Some(u32::MAX));
    }

    #[test]
    fn test_existing_shallow_depths_bypass_depth_table_lock() {
        let store = store();
        store.record_timer(timer(0, 10, 0)).unwrap();
        store.record_timer(timer(1, 2, 1)).unwrap();

        // parking_lot locks are not reentrant: any table access below would
        // deadlock while the write side is held.
        let _guard = store.deep.write();
        store.record_timer(timer(20, 30, 0)).unwrap();
        store.record_timer(timer(21, 22, 1)).unwrap();
        assert_eq!(store.chain_at_depth(0).map(TimerChain::len), Some(2));
        assert_eq!(store.chains_snapshot().len(), 2);
    }

    #[test]
    fn test_aggregates() {
        let store = store();
        assert_eq!(store.min_time(), None);
        assert_eq!(store.max_depth(), None);

        store.record_timer(timer(10, 20, 0)).unwrap();
        store.record_timer(timer(12, 15, 3)).unwrap();
        store.record_timer(timer(5, 8, 1)).unwrap();

        assert_eq!(store.count(), 3);
        assert_eq!(store.min_time(), Some(5));
        assert_eq!(store.max_time(), Some(20));
        assert_eq!(store.max_depth(), Some(3));
        assert_eq!(store.height(), 4);
    }

    #[test]
    fn test_core_activity_does_not_raise_height() {
        let store = store();
        store.record_timer(timer(0, 10, 0)).unwrap();
        let context_switch = TimerInfo {
            timer_type: TimerType::CoreActivity,
            ..timer(0, 5, 6)
        };
        store.record_timer(context_switch).unwrap();
        assert_eq!(store.height(), 1);
        assert_eq!(store.max_depth(), Some(6));
    }

    #[test]
    fn test_malformed_record_is_stored() {
        let store = store();
        store.record_timer(timer(30, 20, 0)).unwrap();
        let chain = store.chain_at_depth(0).unwrap();
        let stored = chain.iter().next().map(|t| (t.start, t.end));
        assert_eq!(stored, Some((30, 20)));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = store();
        store.record_timer(timer(0, 1, 0)).unwrap();
        store.record_timer(timer(0, 1, 1)).unwrap();
        store.record_timer(timer(0, 1, 100)).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.chains_snapshot().is_empty());
        assert!(store.chain_at_depth(100).is_none());
        assert_eq!(store.height(), 0);
        store.record_timer(timer(3, 4, 1)).unwrap();
        assert_eq!(store.depths(), vec![1]);
    }

    #[test]
    fn test_timers_in_range_spans_depths() {
        let store = store();
        store.record_timer(timer(0, 100, 0)).unwrap();
        store.record_timer(timer(10, 20, 1)).unwrap();
        store.record_timer(timer(50, 60, 1)).unwrap();
        let hits: Vec<(u32, Tick)> = store
            .timers_in_range(15, 40)
            .map(|t| (t.depth, t.start))
            .collect();
        assert_eq!(hits, vec![(0, 0), (1, 10)]);
    }

    proptest! {
        #[test]
        fn proptest_chain_holds_depth_subsequence(
            records in prop::collection::vec((0u64..1_000, 0u32..6), 0..200),
        ) {
            let store = store();
            for (i, &(start, depth)) in records.iter().enumerate() {
                let mut t = timer(start, start + 1, depth);
                t.function_address = i as u64;
                store.record_timer(t).unwrap();
            }

            for depth in 0..6 {
                let expected: Vec<u64> = records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| record.1 == depth)
                    .map(|(i, _)| i as u64)
                    .collect();
                let actual: Vec<u64> = store
                    .chain_at_depth(depth)
                    .map(|chain| chain.iter().map(|t| t.function_address).collect())
                    .unwrap_or_default();
                prop_assert_eq!(actual, expected);
            }

            // Every record lives in exactly one chain, exactly once.
            for i in 0..records.len() as u64 {
                let hits: usize = store
                    .chains_snapshot()
                    .iter()
                    .map(|chain| chain.iter().filter(|t| t.function_address == i).count())
                    .sum();
                prop_assert_eq!(hits, 1);
            }
        }
    }
}

//! One thread's or one GPU timeline's timer store plus navigation queries.
//!
//! All queries are total: a miss is `None`, never an error. The only
//! errors are the two cross-depth requests that have no meaning
//! ([`NavigationError`]) and resource exhaustion while ingesting
//! ([`StoreError`]).

use timegraph_common::{Tick, TimerInfo};

use super::kind::TrackKind;
use crate::config::StoreConfig;
use crate::domain::{NavigationError, StoreError, ThreadId, TimelineHash};
use crate::store::{ChainPosition, DepthStore, TimerChain, TimerRef};

#[derive(Debug)]
pub struct Track {
    kind: TrackKind,
    store: DepthStore,
}

impl Track {
    #[must_use]
    pub fn new(kind: TrackKind, config: &StoreConfig) -> Self {
        Self {
            kind,
            store: DepthStore::new(config),
        }
    }

    #[must_use]
    pub fn thread(thread_id: ThreadId, config: &StoreConfig) -> Self {
        Self::new(TrackKind::Thread { thread_id }, config)
    }

    #[must_use]
    pub fn gpu(
        timeline_hash: TimelineHash,
        timeline: impl Into<String>,
        config: &StoreConfig,
    ) -> Self {
        let kind = TrackKind::Gpu {
            timeline_hash,
            timeline: timeline.into(),
        };
        Self::new(kind, config)
    }

    #[must_use]
    pub fn kind(&self) -> &TrackKind {
        &self.kind
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.kind.label()
    }

    /// Ingest one record. Single writer per track.
    ///
    /// # Errors
    /// Propagates [`StoreError`] (allocation failure, writer conflict).
    pub fn record_timer(&self, timer: TimerInfo) -> Result<ChainPosition, StoreError> {
        self.store.record_timer(timer)
    }

    #[must_use]
    pub fn chains_snapshot(&self) -> Vec<&TimerChain> {
        self.store.chains_snapshot()
    }

    #[must_use]
    pub fn chain_at_depth(&self, depth: u32) -> Option<&TimerChain> {
        self.store.chain_at_depth(depth)
    }

    pub fn timers_in_range(&self, min: Tick, max: Tick) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        self.store.timers_in_range(min, max)
    }

    // ------------------------------------------------------------------
    // Aggregates (eventually consistent while capturing)
    // ------------------------------------------------------------------

    #[must_use]
    pub fn count(&self) -> u64 {
        self.store.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn min_time(&self) -> Option<Tick> {
        self.store.min_time()
    }

    #[must_use]
    pub fn max_time(&self) -> Option<Tick> {
        self.store.max_time()
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<u32> {
        self.store.max_depth()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.store.height()
    }

    #[must_use]
    pub fn visible_rows(&self, collapsed: bool) -> u32 {
        self.kind
            .visible_rows(self.height(), self.count(), collapsed)
    }

    #[must_use]
    pub fn is_collapsible(&self) -> bool {
        self.kind.is_collapsible(self.height())
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// First record at `depth` starting strictly after `time` (linear scan).
    #[must_use]
    pub fn first_after(&self, time: Tick, depth: u32) -> Option<TimerRef<'_>> {
        self.chain_at_depth(depth)?.first_after(time)
    }

    /// Last record at `depth` starting at or before `time` (linear scan).
    #[must_use]
    pub fn first_before(&self, time: Tick, depth: u32) -> Option<TimerRef<'_>> {
        self.chain_at_depth(depth)?.last_at_or_before(time)
    }

    /// Previous record at the same depth; `None` for records of other tracks.
    #[must_use]
    pub fn left(&self, timer: &TimerRef<'_>) -> Option<TimerRef<'_>> {
        if !self.kind.owns(timer) {
            return None;
        }
        self.chain_at_depth(timer.depth)?.element_before(timer)
    }

    /// Next record at the same depth; `None` for records of other tracks.
    #[must_use]
    pub fn right(&self, timer: &TimerRef<'_>) -> Option<TimerRef<'_>> {
        if !self.kind.owns(timer) {
            return None;
        }
        self.chain_at_depth(timer.depth)?.element_after(timer)
    }

    /// Enclosing record one depth shallower, active at `timer.start`.
    ///
    /// # Errors
    /// [`NavigationError::NoEnclosingDepth`] for depth-0 records.
    pub fn up(&self, timer: &TimerInfo) -> Result<Option<TimerRef<'_>>, NavigationError> {
        let Some(depth) = timer.depth.checked_sub(1) else {
            return Err(NavigationError::NoEnclosingDepth);
        };
        Ok(self.first_before(timer.start, depth))
    }

    /// First record one depth deeper starting after `timer.start`.
    ///
    /// # Errors
    /// [`NavigationError::DepthOverflow`] for records at `u32::MAX`.
    pub fn down(&self, timer: &TimerInfo) -> Result<Option<TimerRef<'_>>, NavigationError> {
        let Some(depth) = timer.depth.checked_add(1) else {
            return Err(NavigationError::DepthOverflow(timer.depth));
        };
        Ok(self.first_after(timer.start, depth))
    }

    /// Drop all records; the track keeps its identity.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

//! Capture-wide track registry
//!
//! Owns every track of one capture session and routes incoming records:
//!
//! ```text
//! TimerInfo ──► process_timer()
//!                 ├─ GpuActivity ──► GPU track   (by timeline_hash)
//!                 └─ everything else ► thread track (by thread_id)
//! ```
//!
//! Tracks are created lazily on the first record for an identity. The
//! registry maps are the only locks here and are held just long enough to
//! look up or insert an `Arc<Track>`.
//!
//! Also hosts the capture-wide function searches used by "jump to
//! first/last/min/max call" actions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use timegraph_common::{Tick, TimerInfo, TimerType};

use crate::config::StoreConfig;
use crate::domain::{FunctionAddress, StoreError, ThreadId, TimelineHash};
use crate::store::{ChainPosition, TimerChain, TimerRef};
use crate::track::Track;

/// Owned locator for a stored record, usable after the search returns.
#[derive(Debug, Clone)]
pub struct TimerLocation {
    pub track: Arc<Track>,
    pub position: ChainPosition,
    /// Copy of the stored record
    pub timer: TimerInfo,
}

impl TimerLocation {
    fn new(track: &Arc<Track>, timer: TimerRef<'_>) -> Self {
        Self {
            track: Arc::clone(track),
            position: timer.position(),
            timer: *timer.timer(),
        }
    }

    /// Borrow the stored record itself.
    #[must_use]
    pub fn resolve(&self) -> Option<TimerRef<'_>> {
        self.track.chain_at_depth(self.timer.depth)?.get(self.position)
    }
}

#[derive(Debug, Default)]
pub struct CaptureStore {
    config: StoreConfig,
    threads: RwLock<BTreeMap<ThreadId, Arc<Track>>>,
    gpu_timelines: RwLock<BTreeMap<TimelineHash, Arc<Track>>>,
    timeline_names: RwLock<HashMap<TimelineHash, String>>,
}

impl CaptureStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Name used for the GPU track of `timeline_hash` once it is created.
    pub fn register_gpu_timeline(&self, timeline_hash: TimelineHash, timeline: impl Into<String>) {
        self.timeline_names
            .write()
            .insert(timeline_hash, timeline.into());
    }

    /// Route one record to its track, creating the track if needed.
    ///
    /// Records of one track must all arrive through one thread.
    ///
    /// # Errors
    /// Propagates [`StoreError`] from the track's store.
    pub fn process_timer(&self, timer: TimerInfo) -> Result<ChainPosition, StoreError> {
        let track = match timer.timer_type {
            TimerType::GpuActivity => self.gpu_track_or_create(TimelineHash(timer.timeline_hash)),
            _ => self.thread_track_or_create(ThreadId(timer.thread_id)),
        };
        track.record_timer(timer)
    }

    #[must_use]
    pub fn thread_track_or_create(&self, thread_id: ThreadId) -> Arc<Track> {
        if let Some(track) = self.thread_track(thread_id) {
            return track;
        }
        let mut threads = self.threads.write();
        let track = threads.entry(thread_id).or_insert_with(|| {
            debug!("Created thread track for {thread_id}");
            Arc::new(Track::thread(thread_id, &self.config))
        });
        Arc::clone(track)
    }

    #[must_use]
    pub fn gpu_track_or_create(&self, timeline_hash: TimelineHash) -> Arc<Track> {
        if let Some(track) = self.gpu_track(timeline_hash) {
            return track;
        }
        let timeline = self
            .timeline_names
            .read()
            .get(&timeline_hash)
            .cloned()
            .unwrap_or_else(|| format!("{:#x}", timeline_hash.0));

        let mut gpu_timelines = self.gpu_timelines.write();
        let track = gpu_timelines.entry(timeline_hash).or_insert_with(|| {
            debug!("Created GPU track for {timeline_hash} ({timeline})");
            Arc::new(Track::gpu(timeline_hash, timeline, &self.config))
        });
        Arc::clone(track)
    }

    #[must_use]
    pub fn thread_track(&self, thread_id: ThreadId) -> Option<Arc<Track>> {
        self.threads.read().get(&thread_id).cloned()
    }

    #[must_use]
    pub fn gpu_track(&self, timeline_hash: TimelineHash) -> Option<Arc<Track>> {
        self.gpu_timelines.read().get(&timeline_hash).cloned()
    }

    /// Thread tracks ordered by thread id.
    #[must_use]
    pub fn thread_tracks(&self) -> Vec<Arc<Track>> {
        self.threads.read().values().cloned().collect()
    }

    /// GPU tracks ordered by timeline hash.
    #[must_use]
    pub fn gpu_tracks(&self) -> Vec<Arc<Track>> {
        self.gpu_timelines.read().values().cloned().collect()
    }

    fn all_tracks(&self) -> Vec<Arc<Track>> {
        let mut tracks = self.thread_tracks();
        tracks.extend(self.gpu_tracks());
        tracks
    }

    // ------------------------------------------------------------------
    // Capture-wide aggregates
    // ------------------------------------------------------------------

    #[must_use]
    pub fn count(&self) -> u64 {
        self.all_tracks().iter().map(|track| track.count()).sum()
    }

    #[must_use]
    pub fn min_time(&self) -> Option<Tick> {
        self.all_tracks()
            .iter()
            .filter_map(|track| track.min_time())
            .min()
    }

    #[must_use]
    pub fn max_time(&self) -> Option<Tick> {
        self.all_tracks()
            .iter()
            .filter_map(|track| track.max_time())
            .max()
    }

    /// Visit every chain of every thread track.
    pub fn for_each_thread_chain(&self, mut visit: impl FnMut(&Arc<Track>, &TimerChain)) {
        for track in self.thread_tracks() {
            for chain in track.chains_snapshot() {
                visit(&track, chain);
            }
        }
    }

    // ------------------------------------------------------------------
    // Function call search
    // ------------------------------------------------------------------

    fn function_calls(
        chain: &TimerChain,
        address: FunctionAddress,
    ) -> impl Iterator<Item = TimerRef<'_>> + '_ {
        chain
            .iter()
            .filter(move |timer| timer.function_address == address.0)
    }

    /// Earliest call of `address` starting strictly after `after`.
    #[must_use]
    pub fn find_next_function_call(
        &self,
        address: FunctionAddress,
        after: Tick,
    ) -> Option<TimerLocation> {
        let mut best: Option<TimerLocation> = None;
        self.for_each_thread_chain(|track, chain| {
            let mut calls = Self::function_calls(chain, address);
            let Some(timer) = calls.find(|timer| timer.start > after) else {
                return;
            };
            if best.as_ref().is_none_or(|b| timer.start < b.timer.start) {
                best = Some(TimerLocation::new(track, timer));
            }
        });
        best
    }

    /// Latest call of `address` starting strictly before `before`.
    #[must_use]
    pub fn find_previous_function_call(
        &self,
        address: FunctionAddress,
        before: Tick,
    ) -> Option<TimerLocation> {
        let mut best: Option<TimerLocation> = None;
        self.for_each_thread_chain(|track, chain| {
            let calls = Self::function_calls(chain, address);
            let Some(timer) = calls.filter(|timer| timer.start < before).last() else {
                return;
            };
            if best.as_ref().is_none_or(|b| timer.start > b.timer.start) {
                best = Some(TimerLocation::new(track, timer));
            }
        });
        best
    }

    /// Shortest and longest call of `address` across all thread tracks.
    #[must_use]
    pub fn function_min_max(
        &self,
        address: FunctionAddress,
    ) -> Option<(TimerLocation, TimerLocation)> {
        let mut min: Option<TimerLocation> = None;
        let mut max: Option<TimerLocation> = None;
        self.for_each_thread_chain(|track, chain| {
            for timer in Self::function_calls(chain, address) {
                let duration = timer.duration();
                if min.as_ref().is_none_or(|m| duration < m.timer.duration()) {
                    min = Some(TimerLocation::new(track, timer));
                }
                if max.as_ref().is_none_or(|m| duration > m.timer.duration()) {
                    max = Some(TimerLocation::new(track, timer));
                }
            }
        });
        min.zip(max)
    }

    /// Forget every track; used when a new capture starts.
    pub fn clear(&mut self) {
        self.threads.get_mut().clear();
        self.gpu_timelines.get_mut().clear();
    }
}

//! # Synthetic Capture Driver
//!
//! Exercises the store the way a live capture does:
//!
//! ```text
//! producer thread (per track) ──bounded channel──► ingest thread (per track)
//!                                                        │ process_timer()
//!                                                        ▼
//!                                                  CaptureStore
//!                                                        ▲
//! reader threads ── snapshots, first_after/before ───────┘
//! ```
//!
//! Producers emit well-nested call stacks in exit order (deepest record
//! first), like function instrumentation does. Readers validate every record
//! they see while ingestion is running and run one final pass after the
//! writers are done, when every record must be visible.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use crossbeam_channel::bounded;
use log::{debug, info};
use serde::Serialize;
use timegraph_common::{Tick, TimerInfo};

use crate::capture::CaptureStore;
use crate::domain::StoreError;
use crate::store::TimerChain;

/// Producer → ingest hand-off depth per track.
const CHANNEL_CAPACITY: usize = 4096;

/// Tick distance between the starts (and ends) of nested levels.
const LEVEL_STEP: Tick = 10;

/// Synthetic functions live at `FUNCTION_BASE + depth`.
pub const FUNCTION_BASE: u64 = 0x1000;

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub tracks: usize,
    pub records_per_track: usize,
    pub max_depth: u32,
    pub readers: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadSummary {
    pub tracks: usize,
    pub records: u64,
    pub blocks: usize,
    pub max_depth: Option<u32>,
    pub min_time: Option<Tick>,
    pub max_time: Option<Tick>,
    pub elapsed_ms: f64,
    pub records_per_sec: f64,
    pub reader_passes: u64,
    pub reader_queries: u64,
    /// Records seen out of order, duplicated, torn, or in the wrong chain
    pub violations: u64,
}

#[derive(Debug, Default)]
struct ReaderStats {
    passes: u64,
    queries: u64,
    violations: u64,
}

/// Raises the readers' stop flag when dropped, including while unwinding.
struct StopReaders<'a>(&'a AtomicBool);

impl Drop for StopReaders<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Well-nested timers for one thread, `levels` deep, in exit order.
pub fn synthetic_timers(
    thread_id: i32,
    records: usize,
    levels: u32,
) -> impl Iterator<Item = TimerInfo> {
    let levels = levels.max(1);
    let frame_ticks = Tick::from(levels) * 2 * LEVEL_STEP + 3 * LEVEL_STEP;

    (0..records).map(move |i| {
        let frame = (i / levels as usize) as Tick;
        let depth = levels - 1 - (i % levels as usize) as u32;
        let base = frame * frame_ticks;
        let inset = Tick::from(depth) * LEVEL_STEP;
        TimerInfo {
            start: base + inset,
            end: base + frame_ticks - 1 - inset,
            thread_id,
            depth,
            function_address: FUNCTION_BASE + u64::from(depth),
            ..TimerInfo::default()
        }
    })
}

/// Run producers, ingest threads and readers to completion.
///
/// # Errors
/// Returns the first [`StoreError`] raised by an ingest thread.
pub fn run(capture: &CaptureStore, options: LoadOptions) -> Result<LoadSummary, StoreError> {
    let done = AtomicBool::new(false);
    let (records_per_track, levels) = (options.records_per_track, options.max_depth);
    let started = Instant::now();

    let (ingested, readers) = thread::scope(|scope| {
        let readers: Vec<_> = (0..options.readers)
            .map(|_| scope.spawn(|| read_until_done(capture, &done)))
            .collect();

        let ingest: Vec<_> = (0..options.tracks)
            .map(|track| {
                #[allow(clippy::cast_possible_wrap)]
                let thread_id = track as i32 + 1;
                let (tx, rx) = bounded(CHANNEL_CAPACITY);

                scope.spawn(move || {
                    for timer in synthetic_timers(thread_id, records_per_track, levels) {
                        if tx.send(timer).is_err() {
                            break;
                        }
                    }
                });

                scope.spawn(move || -> Result<u64, StoreError> {
                    let mut count = 0;
                    for timer in rx {
                        capture.process_timer(timer)?;
                        count += 1;
                    }
                    debug!("Thread {thread_id} ingested {count} records");
                    Ok(count)
                })
            })
            .collect();

        let ingested = join_ingest(ingest, &done);

        let readers: Vec<ReaderStats> = readers
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect();
        (ingested, readers)
    });

    let records = ingested?;
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
    info!("Ingested {records} records in {elapsed_ms:.1}ms");

    let max_depth = capture
        .thread_tracks()
        .iter()
        .filter_map(|track| track.max_depth())
        .max();
    let mut summary = LoadSummary {
        tracks: options.tracks,
        records,
        max_depth,
        min_time: capture.min_time(),
        max_time: capture.max_time(),
        elapsed_ms,
        records_per_sec: records as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        ..LoadSummary::default()
    };
    capture.for_each_thread_chain(|_, chain| summary.blocks += chain.block_count());
    for reader in readers {
        summary.reader_passes += reader.passes;
        summary.reader_queries += reader.queries;
        summary.violations += reader.violations;
    }
    Ok(summary)
}

/// Join every ingest thread and total their record counts, then stop the
/// readers. A panicking ingest thread is re-raised here; the readers are
/// stopped first so the enclosing scope can still join them.
fn join_ingest(
    handles: Vec<ScopedJoinHandle<'_, Result<u64, StoreError>>>,
    done: &AtomicBool,
) -> Result<u64, StoreError> {
    let _stop = StopReaders(done);
    let mut ingested = Ok(0u64);
    for handle in handles {
        let result = match handle.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        };
        ingested = match (ingested, result) {
            (Ok(total), Ok(count)) => Ok(total + count),
            (Err(err), _) | (Ok(_), Err(err)) => Err(err),
        };
    }
    ingested
}

fn read_until_done(capture: &CaptureStore, done: &AtomicBool) -> ReaderStats {
    let mut stats = ReaderStats::default();
    loop {
        // Sampled before the pass: a pass that starts after the writers are
        // done must see every record.
        let finished = done.load(Ordering::Acquire);

        for track in capture.thread_tracks() {
            for chain in track.chains_snapshot() {
                stats.violations += check_chain(chain);
            }
            if let (Some(min), Some(max)) = (track.min_time(), track.max_time()) {
                let midpoint = min + (max - min) / 2;
                if let Some(timer) = track.first_after(midpoint, 0) {
                    stats.violations += u64::from(timer.start <= midpoint);
                }
                if let Some(timer) = track.first_before(midpoint, 0) {
                    stats.violations += u64::from(timer.start > midpoint);
                }
                stats.queries += 2;
            }
        }
        stats.passes += 1;

        if finished {
            return stats;
        }
    }
}

/// Count records that break the chain contract. Synthetic starts are
/// strictly increasing per depth, so a repeat start means a duplicate.
fn check_chain(chain: &TimerChain) -> u64 {
    let mut violations = 0;
    let mut previous: Option<Tick> = None;
    for timer in chain.iter() {
        let torn = timer.end < timer.start
            || timer.function_address != FUNCTION_BASE + u64::from(timer.depth);
        let misplaced = timer.depth != chain.depth();
        let unordered = previous.is_some_and(|start| timer.start <= start);
        violations += u64::from(torn || misplaced || unordered);
        previous = Some(timer.start);
    }
    violations
}

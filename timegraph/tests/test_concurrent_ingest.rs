use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use timegraph::config::StoreConfig;
use timegraph::domain::ThreadId;
use timegraph::load::{synthetic_timers, FUNCTION_BASE};
use timegraph::store::TimerChain;
use timegraph::track::Track;
use timegraph_common::{Tick, TimerInfo};

const RECORDS: usize = 100_000;
const DEPTHS: u32 = 8;
const READERS: usize = 4;

fn assert_consistent(chain: &TimerChain) -> usize {
    let depth = chain.depth();
    let mut previous: Option<Tick> = None;
    let mut seen = 0;
    for timer in chain.iter() {
        let function = FUNCTION_BASE + u64::from(depth);
        assert_eq!(timer.depth, depth, "record in wrong chain: {timer:?}");
        assert_eq!(timer.thread_id, 1, "torn record: {timer:?}");
        assert_eq!(timer.function_address, function, "torn record: {timer:?}");
        assert!(timer.end > timer.start, "torn record: {timer:?}");
        if let Some(start) = previous {
            let position = timer.position();
            assert!(timer.start > start, "out of order at {position:?}");
        }
        previous = Some(timer.start);
        seen += 1;
    }
    seen
}

#[test]
fn test_single_writer_many_readers() {
    let track = Track::thread(ThreadId(1), &StoreConfig::with_block_capacity(256));
    let published = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| loop {
                let finished = done.load(Ordering::Acquire);
                let barrier = published.load(Ordering::Acquire);

                let seen: usize = track
                    .chains_snapshot()
                    .into_iter()
                    .map(assert_consistent)
                    .sum();
                assert!(seen >= barrier, "only {seen} of {barrier} visible");

                if let Some(max) = track.max_time() {
                    let midpoint = max / 2;
                    for depth in 0..DEPTHS {
                        if let Some(after) = track.first_after(midpoint, depth) {
                            assert!(after.start > midpoint);
                        }
                        if let Some(before) = track.first_before(midpoint, depth) {
                            assert!(before.start <= midpoint);
                        }
                    }
                }
                if finished {
                    break;
                }
            });
        }

        scope.spawn(|| {
            for (pushed, timer) in synthetic_timers(1, RECORDS, DEPTHS).enumerate() {
                track.record_timer(timer).expect("ingest failed");
                if pushed % 1_000 == 999 {
                    published.store(pushed + 1, Ordering::Release);
                }
            }
            published.store(RECORDS, Ordering::Release);
            done.store(true, Ordering::Release);
        });
    });

    assert_eq!(track.count(), RECORDS as u64);
    assert_eq!(track.max_depth(), Some(DEPTHS - 1));
    let per_depth: BTreeMap<u32, usize> = track
        .chains_snapshot()
        .into_iter()
        .map(|chain| (chain.depth(), assert_consistent(chain)))
        .collect();
    let per_chain = RECORDS / DEPTHS as usize;
    assert_eq!(per_depth.len(), DEPTHS as usize);
    assert!(per_depth.values().all(|&count| count == per_chain));
}

#[test]
fn test_second_writer_is_reported() {
    // Two threads writing to one track is a contract violation; it must never
    // corrupt or duplicate data, at worst some records are refused.
    let track = Track::thread(ThreadId(1), &StoreConfig::with_block_capacity(4));
    let accepted = AtomicUsize::new(0);

    thread::scope(|scope| {
        for writer in 0..2u64 {
            let track = &track;
            let accepted = &accepted;
            scope.spawn(move || {
                for i in 0..5_000u64 {
                    let timer = TimerInfo {
                        start: i,
                        end: i + 1,
                        thread_id: 1,
                        user_data_key: writer,
                        ..TimerInfo::default()
                    };
                    if track.record_timer(timer).is_ok() {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    let stored = track
        .chain_at_depth(0)
        .map_or(0, |chain| chain.iter().count());
    assert_eq!(stored, accepted.load(Ordering::Relaxed));
}

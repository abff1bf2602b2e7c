use timegraph::config::StoreConfig;
use timegraph::domain::{NavigationError, ThreadId};
use timegraph::track::Track;
use timegraph_common::{Tick, TimerInfo};

fn timer(start: Tick, end: Tick, depth: u32) -> TimerInfo {
    TimerInfo {
        start,
        end,
        depth,
        thread_id: 1,
        ..TimerInfo::default()
    }
}

fn span(timer: &TimerInfo) -> (Tick, Tick, u32) {
    (timer.start, timer.end, timer.depth)
}

fn nested_track() -> Track {
    let track = Track::thread(ThreadId(1), &StoreConfig::default());
    for record in [timer(10, 20, 0), timer(12, 15, 1), timer(25, 30, 0)] {
        track.record_timer(record).expect("ingest failed");
    }
    track
}

#[test]
fn test_end_to_end_navigation() {
    let track = nested_track();

    let second_root = track.first_after(11, 0).expect("no record after 11");
    assert_eq!(span(&second_root), (25, 30, 0));

    let depth_one = track.chain_at_depth(1).expect("depth 1 is empty");
    let child = depth_one.iter().next().expect("depth 1 is empty");
    let parent = track
        .up(&child)
        .expect("depth 1 has a parent depth")
        .expect("no enclosing record");
    assert_eq!(span(&parent), (10, 20, 0));

    let down = track
        .down(&parent)
        .expect("valid depth")
        .expect("no nested record");
    assert_eq!(down, child);

    assert_eq!(track.right(&parent), Some(second_root));
    assert_eq!(track.left(&second_root), Some(parent));
}

#[test]
fn test_queries_are_idempotent() {
    let track = nested_track();
    let first = track.first_after(11, 0).expect("missing");
    let again = track.first_after(11, 0).expect("missing");
    assert!(std::ptr::eq(first.timer(), again.timer()));
}

#[test]
fn test_misses_are_none() {
    let track = nested_track();
    assert!(track.first_after(30, 0).is_none());
    assert!(track.first_after(0, 5).is_none());
    assert!(track.first_before(9, 0).is_none());

    let empty = Track::thread(ThreadId(2), &StoreConfig::default());
    assert!(empty.first_after(0, 0).is_none());
    assert!(empty.chains_snapshot().is_empty());
    assert_eq!(empty.min_time(), None);
    assert_eq!(empty.max_depth(), None);
}

#[test]
fn test_up_on_outermost_record_is_rejected() {
    let track = nested_track();
    let root = track.first_before(10, 0).expect("missing");
    assert_eq!(track.up(&root), Err(NavigationError::NoEnclosingDepth));
}

#[test]
fn test_malformed_interval_is_stored_as_is() {
    let track = Track::thread(ThreadId(1), &StoreConfig::default());
    track.record_timer(timer(50, 40, 0)).expect("ingest failed");
    let stored = track.first_before(50, 0).expect("missing");
    assert_eq!((stored.start, stored.end), (50, 40));
    assert_eq!(stored.duration(), 0);
}

#[test]
fn test_range_scan_across_small_blocks() {
    let track = Track::thread(ThreadId(1), &StoreConfig::with_block_capacity(2));
    for i in 0..10 {
        let record = timer(i * 10, i * 10 + 5, 0);
        track.record_timer(record).expect("ingest failed");
    }
    let starts: Vec<Tick> = track.timers_in_range(23, 47).map(|t| t.start).collect();
    assert_eq!(starts, vec![20, 30, 40]);
    let chain = track.chain_at_depth(0).expect("depth 0 is empty");
    assert_eq!(chain.block_count(), 5);
}

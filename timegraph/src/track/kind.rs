//! Track variants and the rules that differ between them.
//!
//! Thread and GPU tracks share one storage implementation; what differs
//! (identity, label, collapsed layout) is a pure function of [`TrackKind`].

use std::fmt;

use timegraph_common::TimerInfo;

use crate::domain::{ThreadId, TimelineHash};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Instrumented timers and context switches of one thread
    Thread { thread_id: ThreadId },

    /// Queue and execution slices of one GPU timeline
    Gpu {
        timeline_hash: TimelineHash,
        timeline: String,
    },
}

impl TrackKind {
    /// True if `timer` carries this track's identity.
    #[must_use]
    pub fn owns(&self, timer: &TimerInfo) -> bool {
        match self {
            TrackKind::Thread { thread_id } => timer.thread_id == thread_id.0,
            TrackKind::Gpu { timeline_hash, .. } => timer.timeline_hash == timeline_hash.0,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            TrackKind::Thread { thread_id } => format!("Thread [{}]", thread_id.0),
            TrackKind::Gpu { timeline, .. } => gpu_timeline_label(timeline),
        }
    }

    /// GPU tracks open collapsed, thread tracks expanded.
    #[must_use]
    pub fn collapsed_by_default(&self) -> bool {
        matches!(self, TrackKind::Gpu { .. })
    }

    #[must_use]
    pub fn is_collapsible(&self, height: u32) -> bool {
        match self {
            TrackKind::Thread { .. } => height > 0,
            TrackKind::Gpu { .. } => height > 1,
        }
    }

    /// Rows a track occupies.
    ///
    /// Collapsed: a thread track keeps one row only if it holds any timer,
    /// a GPU track always keeps one row (hardware execution slices).
    #[must_use]
    pub fn visible_rows(&self, height: u32, timer_count: u64, collapsed: bool) -> u32 {
        if !collapsed {
            return height;
        }
        match self {
            TrackKind::Thread { .. } => u32::from(timer_count > 0),
            TrackKind::Gpu { .. } => 1,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Map kernel GPU timeline names ("gfx", "sdma0", "comp_1.0.0") to a
/// descriptive label. Unknown timelines are shown as-is.
#[must_use]
pub fn gpu_timeline_label(timeline: &str) -> String {
    if timeline.starts_with("gfx") {
        format!("Graphics queue ({timeline})")
    } else if timeline.starts_with("sdma") {
        format!("Transfer queue ({timeline})")
    } else if timeline.starts_with("comp") {
        format!("Compute queue ({timeline})")
    } else {
        timeline.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(hash: u64) -> TrackKind {
        TrackKind::Gpu {
            timeline_hash: TimelineHash(hash),
            timeline: "gfx".to_string(),
        }
    }

    #[test]
    fn test_gpu_timeline_labels() {
        assert_eq!(gpu_timeline_label("gfx"), "Graphics queue (gfx)");
        assert_eq!(gpu_timeline_label("sdma0"), "Transfer queue (sdma0)");
        assert_eq!(
            gpu_timeline_label("comp_1.3.0"),
            "Compute queue (comp_1.3.0)"
        );
        assert_eq!(gpu_timeline_label("vcn_dec"), "vcn_dec");
    }

    #[test]
    fn test_thread_label() {
        let thread = TrackKind::Thread {
            thread_id: ThreadId(77),
        };
        assert_eq!(thread.label(), "Thread [77]");
    }

    #[test]
    fn test_ownership() {
        let thread = TrackKind::Thread {
            thread_id: ThreadId(5),
        };
        let mine = TimerInfo {
            thread_id: 5,
            ..TimerInfo::default()
        };
        let other = TimerInfo {
            thread_id: 6,
            ..TimerInfo::default()
        };
        assert!(thread.owns(&mine));
        assert!(!thread.owns(&other));

        let on_timeline = TimerInfo {
            timeline_hash: 9,
            thread_id: 6,
            ..TimerInfo::default()
        };
        assert!(gpu(9).owns(&on_timeline));
        assert!(!gpu(10).owns(&on_timeline));
    }

    #[test]
    fn test_collapsed_rows() {
        let thread = TrackKind::Thread {
            thread_id: ThreadId(1),
        };
        assert_eq!(thread.visible_rows(4, 10, false), 4);
        assert_eq!(thread.visible_rows(4, 10, true), 1);
        assert_eq!(thread.visible_rows(0, 0, true), 0);

        assert_eq!(gpu(1).visible_rows(3, 0, true), 1);
        assert_eq!(gpu(1).visible_rows(3, 0, false), 3);
    }

    #[test]
    fn test_collapse_defaults() {
        let thread = TrackKind::Thread {
            thread_id: ThreadId(1),
        };
        assert!(gpu(1).collapsed_by_default());
        assert!(!thread.collapsed_by_default());
        assert!(!gpu(1).is_collapsible(1));
        assert!(gpu(1).is_collapsible(2));
    }
}

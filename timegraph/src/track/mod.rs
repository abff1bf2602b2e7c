//! Tracks: the query surface handed to the rendering/interaction layer
//!
//! - `kind`: thread vs. GPU timeline discriminator and its layout rules
//! - `timer_track`: the track itself (ingest, aggregates, navigation)

pub mod kind;
pub mod timer_track;

pub use kind::{gpu_timeline_label, TrackKind};
pub use timer_track::Track;

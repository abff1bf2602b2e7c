//! Timer storage core
//!
//! Leaves first:
//! - `arena`: append-only, address-stable segmented storage
//! - `block`: fixed-capacity record block with cached time bounds
//! - `chain`: unbounded block sequence for one `(track, depth)` pair
//! - `depth`: per-track depth → chain table plus running aggregates

pub mod arena;
pub mod block;
pub mod chain;
pub mod depth;

pub use arena::Arena;
pub use block::TimerBlock;
pub use chain::{ChainPosition, TimerChain, TimerRef};
pub use depth::DepthStore;

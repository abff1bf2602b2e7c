//! # timegraph - Concurrent Timer Store for Capture Timelines
//!
//! Stores the timing records ("timers") of a profiling capture so that one
//! ingest thread per track can append while any number of UI or analysis
//! threads query the same data without taking a lock.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Capture source (instrumentation)               │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ TimerInfo (one ingest thread per track)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  CaptureStore ── routes by thread id / GPU timeline             │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │    Track     │──▶│  DepthStore  │──▶│  TimerChain  │        │
//! │  │ (kind rules) │   │ (depth → ch) │   │ (per depth)  │        │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘        │
//! │                                               ▼                 │
//! │                                        ┌──────────────┐        │
//! │                                        │  TimerBlock  │        │
//! │                                        │ (fixed size) │        │
//! │                                        └──────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//!                         ▲
//!                         │ snapshots, navigation, range scans
//!               readers (render, search, analysis)
//! ```
//!
//! ## Module Structure
//!
//! - [`store`]: append-only storage with address-stable records
//!   - `arena`: segmented append-only vector, lock-free reads
//!   - `block`: fixed-capacity record block with a time hull
//!   - `chain`: per-depth sequence of blocks, neighbour lookup
//!   - `depth`: depth → chain map plus track statistics
//!
//! - [`track`]: thread and GPU tracks, navigation (left/right/up/down)
//!
//! - [`capture`]: track registry, record routing, function call search
//!
//! - [`load`]: synthetic producer/reader driver used by the binary
//!
//! - [`config`], [`cli`], [`domain`]: configuration, arguments, types and errors
//!
//! ## Concurrency Contract
//!
//! - Exactly one writer per track; a second concurrent writer is reported as
//!   [`domain::StoreError::WriterConflict`] instead of corrupting data.
//! - Readers never block the writer and never observe a partial record.
//! - A record, once visible, stays at the same address until the track is
//!   cleared, which requires exclusive access.

pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod load;
pub mod store;
pub mod track;

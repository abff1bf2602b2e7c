//! # Shared Timer Record (Capture Backend ↔ Store)
//!
//! Defines the record type handed from the capture backends to the timer
//! store. The type uses `#[repr(C)]` so a backend can fill it straight from
//! its own event buffers without an intermediate representation.
//!
//! ## Record Categories
//!
//! - [`TimerType::None`] - ordinary instrumentation timer (function entry/exit)
//! - [`TimerType::CoreActivity`] - context-switch / core-activity interval
//! - [`TimerType::Introspection`] - manual introspection marker
//! - [`TimerType::GpuActivity`] - GPU queue or execution slice
//!
//! ## Key Types
//!
//! - [`TimerInfo`] - one captured timed interval
//! - [`Tick`] - monotonic timestamp unit used by `start` / `end`

#![no_std]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Monotonic hardware/software time unit.
pub type Tick = u64;

// ============================================================================
// Record Category
// ============================================================================

/// Category of a captured interval.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimerType {
    /// Dynamically instrumented function timer
    #[default]
    None = 0,

    /// Context switch interval; carries the CPU core in `processor`
    CoreActivity = 1,

    /// Manual instrumentation marker; `user_data_key` names a string
    Introspection = 2,

    /// GPU software queue, hardware queue or hardware execution slice
    GpuActivity = 3,
}

// ============================================================================
// Timer Record
// ============================================================================

/// One timed interval as produced by a capture backend.
///
/// **Invariant** (producer contract, not validated by the store): `end >= start`.
///
/// Records at depth `d + 1` are temporally contained in the most recent
/// still-open record at depth `d` of the same thread.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimerInfo {
    // ========================================================================
    // Interval
    // ========================================================================
    /// Interval start in ticks
    pub start: Tick,

    /// Interval end in ticks
    pub end: Tick,

    // ========================================================================
    // Correlation keys (opaque to the store)
    // ========================================================================
    /// Callstack identifier into the backend's callstack table
    pub callstack_id: u64,

    /// Absolute address of the instrumented function
    pub function_address: u64,

    /// Key into the string table (introspection names, GPU stage names)
    pub user_data_key: u64,

    /// Hash of the GPU timeline name (GPU activity only)
    pub timeline_hash: u64,

    // ========================================================================
    // Origin identity
    // ========================================================================
    /// Process that emitted the interval
    pub process_id: i32,

    /// Thread that emitted (or, for GPU activity, submitted) the interval
    pub thread_id: i32,

    /// CPU core, meaningful for context-switch records only
    pub processor: i32,

    /// Nesting level, 0 is outermost
    pub depth: u32,

    /// Record category
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub timer_type: TimerType,
}

impl TimerInfo {
    /// Interval length in ticks; malformed records (`end < start`) report 0.
    #[must_use]
    pub const fn duration(&self) -> Tick {
        self.end.saturating_sub(self.start)
    }

    /// True if the record overlaps the closed interval `[min, max]`.
    #[must_use]
    pub const fn overlaps(&self, min: Tick, max: Tick) -> bool {
        self.start <= max && self.end >= min
    }

    /// True for records that describe scheduling rather than call nesting.
    #[must_use]
    pub const fn is_core_activity(&self) -> bool {
        matches!(self.timer_type, TimerType::CoreActivity)
    }
}

//! Structured error types for timegraph
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the ingest path. All of them are fatal for the capture.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to allocate timer storage: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("Timer storage index space exhausted")]
    CapacityExhausted,

    #[error("Concurrent writer detected on depth {depth}; record dropped")]
    WriterConflict { depth: u32 },
}

/// Invalid cross-depth navigation requests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Depth 0 has no enclosing depth")]
    NoEnclosingDepth,

    #[error("Depth {0} has no nested depth")]
    DepthOverflow(u32),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Block capacity must be at least 1")]
    ZeroBlockCapacity,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

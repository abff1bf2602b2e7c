//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "timegraph",
    about = "Drive the timer store with a synthetic capture and concurrent readers",
    after_help = "\
EXAMPLES:
    timegraph                                   4 tracks, 100000 records each
    timegraph --tracks 1 --readers 8            One writer, eight readers
    timegraph --block-capacity 64 --json        Small blocks, JSON summary"
)]
pub struct Args {
    /// Number of thread tracks, each fed by its own producer
    #[arg(long, default_value = "4")]
    pub tracks: usize,

    /// Records produced per track
    #[arg(long, default_value = "100000")]
    pub records: usize,

    /// Nesting levels of the synthetic call stacks
    #[arg(long, default_value = "8")]
    pub max_depth: u32,

    /// Concurrent reader threads querying while the capture runs
    #[arg(long, default_value = "4")]
    pub readers: usize,

    /// Records per timer block (overrides --config)
    #[arg(long)]
    pub block_capacity: Option<usize>,

    /// JSON store configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

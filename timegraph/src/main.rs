//! # timegraph - Main Entry Point
//!
//! Runs a synthetic capture against the store: producers feed one ingest
//! thread per track while reader threads query concurrently, then prints a
//! summary (text or `--json`).

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use timegraph::capture::CaptureStore;
use timegraph::cli::Args;
use timegraph::config::StoreConfig;
use timegraph::domain::ConfigError;
use timegraph::load::{self, LoadOptions, LoadSummary};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.chain().any(|cause| cause.is::<ConfigError>()) {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Config file first, then `--block-capacity` on top.
fn load_config(args: &Args) -> Result<StoreConfig> {
    let mut config = StoreConfig::default();
    if let Some(path) = &args.config {
        config = StoreConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
    }
    if let Some(block_capacity) = args.block_capacity {
        config.block_capacity = block_capacity;
    }
    Ok(config.validate()?)
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let options = LoadOptions {
        tracks: args.tracks,
        records_per_track: args.records,
        max_depth: args.max_depth,
        readers: args.readers,
    };
    info!(
        "Starting synthetic capture: {} tracks x {} records, depth {}, {} readers",
        options.tracks, options.records_per_track, options.max_depth, options.readers
    );
    info!("Block capacity: {}", config.block_capacity);

    let capture = CaptureStore::new(config);
    let summary = load::run(&capture, options)
        .context("Synthetic capture failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !args.quiet || summary.violations > 0 {
        print_summary(&summary);
    }

    let violations = summary.violations;
    if violations > 0 {
        anyhow::bail!("Readers observed {violations} inconsistent records");
    }
    Ok(())
}

fn print_summary(summary: &LoadSummary) {
    println!("Tracks:          {}", summary.tracks);
    println!("Records:         {}", summary.records);
    println!("Blocks:          {}", summary.blocks);
    if let Some(max_depth) = summary.max_depth {
        println!("Max depth:       {max_depth}");
    }
    if let (Some(min), Some(max)) = (summary.min_time, summary.max_time) {
        println!("Time range:      {min}..={max}");
    }
    println!("Elapsed:         {:.1}ms", summary.elapsed_ms);
    println!("Ingest rate:     {:.0} records/s", summary.records_per_sec);
    println!("Reader passes:   {}", summary.reader_passes);
    println!("Reader queries:  {}", summary.reader_queries);
    println!("Violations:      {}", summary.violations);
}

//! Command-line interface for the load driver

pub mod args;

pub use args::Args;

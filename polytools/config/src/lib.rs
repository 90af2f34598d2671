//! Shared constants and helpers for the polytools crates
//!
//! Everything here is tool-agnostic: progress bars, argument
//! validation and plain line writers. Tail-specific calibration
//! lives in each tool's own `cli.rs`.

pub mod fns;
pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const MIN_CHUNK_SIZE: usize = 1;
pub const CHUNK_SIZE: usize = 4000;

// file names
pub const TAILS: &str = "tails.tsv";
pub const TRACES: &str = "traces";

// placeholders
pub const NA: &str = "NA";

//! Core module for estimating poly(A)/poly(T) tail lengths
//! from raw nanopore signal
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module contains the main functions for locating tails
//! in each read's current trace and processing reads in parallel.
//!
//! In short, a sample read is probed to detect the experiment profile
//! of the run. Every read is then extracted, its orientation called by
//! adapter alignment (DNA only), and the tail segmented as a flat run
//! in the signal. Boundaries are refined to exact samples and converted
//! to nucleotides with the local translocation rate. Reads are processed
//! in chunks over a fixed worker pool; a failing read yields an NA row
//! and never stops its siblings.

pub mod cli;
pub mod core;
pub mod error;
pub mod params;
pub mod record;
pub mod source;
pub mod trace;
pub mod utils;

use log::{info, warn};

use std::path::{Path, PathBuf};

use crate::{
    core::batch::run,
    params::TailConfig,
    record::{Experiment, TailRecord},
    source::JsonSource,
    trace::{NoopSink, TraceSink, TsvTraceSink},
};

/// Runs the whole pipeline from command-line style arguments.
///
/// # Arguments
///
/// * `args` - arguments as they would be passed to the binary
///
/// # Returns
///
/// * path of the written tail table
///
/// # Example
///
/// ```rust, ignore
/// let table = lib_poly_tail(vec!["-i".into(), "reads/".into()])?;
/// println!("{}", table.display());
/// ```
pub fn lib_poly_tail(args: Vec<String>) -> anyhow::Result<PathBuf> {
    let args = cli::Args::from(args);
    let config = args.config()?;

    estimate_tails(&config)
}

/// Estimates every tail under `config.input` and writes the table
pub fn estimate_tails(config: &TailConfig) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(&config.outdir)?;

    let sink = trace_sink(config);
    let summary = run(config, &JsonSource::new(), sink.as_ref())?;

    let table = write_tails(&summary.records, summary.profile.experiment, &config.outdir)?;
    info!("INFO: Tail table written to {}", table.display());

    Ok(table)
}

/// Writes one row per record under `outdir`, in the schema of `experiment`
pub fn write_tails(
    records: &[TailRecord],
    experiment: Experiment,
    outdir: &Path,
) -> std::io::Result<PathBuf> {
    let rows: Vec<String> = records.iter().map(|r| r.to_row(experiment)).collect();
    let table = outdir.join(config::TAILS);

    config::write_collection(TailRecord::header(experiment), &rows, &table)?;

    Ok(table)
}

fn trace_sink(config: &TailConfig) -> Box<dyn TraceSink> {
    let dir = match (config.emit_traces, &config.trace_dir) {
        (true, Some(dir)) => dir,
        _ => return Box::new(NoopSink),
    };

    match TsvTraceSink::new(dir) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            warn!(
                "WARN: cannot write traces to {}: {}; traces disabled",
                dir.display(),
                e
            );
            Box::new(NoopSink)
        }
    }
}

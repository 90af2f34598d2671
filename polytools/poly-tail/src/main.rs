//! Core module for estimating poly(A)/poly(T) tail lengths
//! from raw nanopore signal
//! Alejandro Gonzales-Irribarren, 2025
//!
//! Reads every container under the input directory, estimates one tail
//! per read and writes a single table to the output directory.

use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use poly_tail::{cli::Args, estimate_tails};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap_or_else(|e| eprintln!("ERROR: no logger: {}", e));

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let config = args.config().unwrap_or_else(|e| {
        error!("ERROR: {}", e);
        std::process::exit(1);
    });

    info!(
        "INFO: Estimating tails in {} with {} threads...",
        config.input.display(),
        config.workers
    );

    estimate_tails(&config).unwrap_or_else(|e| {
        error!("ERROR: {:#}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}

use clap::{ArgAction, Parser};
use config::{ArgCheck, CHUNK_SIZE};
use std::path::PathBuf;

use crate::{
    error::RunError,
    params::{AdapterProtocol, Calibration, TailConfig},
};

// Segmentation parameters
pub const WINDOW: usize = 25;
pub const MIN_RUN: usize = 10; // INFO: consecutive tail-like windows
pub const GAP_TOLERANCE: usize = 5;
pub const MAX_SLOPE: f64 = 4.0;
pub const POLYA_LEVEL: (f64, f64) = (400.0, 600.0);
pub const POLYT_LEVEL: (f64, f64) = (420.0, 650.0);

// Refinement parameters
pub const AMPLITUDE_THRESHOLD: f64 = 40.0;
pub const MIN_SUSTAINED: usize = 5;
pub const FLANK: usize = 100;
pub const CALIBRATION_WINDOW: usize = 2000;
pub const MIN_CALIBRATION_BASES: usize = 10;

// Alignment parameters
pub const MATCH_SCORE: i32 = 1;
pub const MISMATCH_SCORE: i32 = -1;
pub const GAP_OPEN: i32 = 0;
pub const GAP_EXTEND: i32 = -1;
pub const MIN_ALIGN_SCORE: i32 = 12;
pub const TIE_TOLERANCE: i32 = 2;
pub const ADAPTER_SEARCH_SPAN: usize = 150; // INFO: bases at each read end

// Search regions [samples]
pub const RNA_SEARCH_SLACK: usize = 3000;
pub const DNA_SEARCH_SPAN: usize = 3000;
pub const TAIL_SEQUENCE_BASES: usize = 50;

// Adapters
pub const CDNA_POLYT_ADAPTER: &str = "TTTCTGTTGGTGCTGATATTGCTTT";
pub const CDNA_POLYA_ADAPTER: &str = "GAAGATAGAGCGACAGGCAAGT";
pub const PCR_POLYT_ADAPTER: &str = "ATCGCCTACCGTGACAAGAAAGTTGTCGGTGTCTTTGTG";
pub const PCR_POLYA_ADAPTER: &str = "CACAAAGACACCGACAACTTTCTTGTCACGGTAGGCGAT";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "DIR",
        help = "Directory with read containers, searched recursively"
    )]
    pub input: PathBuf,

    #[arg(
        long = "outdir",
        short = 'o',
        required = false,
        value_name = "PATH",
        num_args = 1,
        help = "Path to output directory",
        default_value = "."
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,

    #[arg(
        short = 'c',
        long = "chunk-size",
        help = "Maximum number of reads processed per chunk",
        value_name = "CHUNK_SIZE",
        default_value_t = CHUNK_SIZE
    )]
    pub chunk_size: usize,

    #[arg(
        short = 'p',
        long = "protocol",
        help = "Library protocol, selects the adapter sequences for DNA reads",
        value_name = "PROTOCOL",
        value_enum,
        default_value_t = AdapterProtocol::Cdna
    )]
    pub protocol: AdapterProtocol,

    #[arg(
        long = "params",
        required = false,
        value_name = "PATH",
        help = "JSON file overriding calibration parameters"
    )]
    pub params: Option<PathBuf>,

    #[arg(
        long = "plot",
        required = false,
        value_name = "FLAG",
        help = "Emit per-read diagnostic signal traces for plotting",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub plot: bool,

    #[arg(
        long = "plot-dir",
        required = false,
        value_name = "PATH",
        help = "Directory for diagnostic traces [default: <outdir>/traces]",
        requires("plot")
    )]
    pub plot_dir: Option<PathBuf>,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }

    /// Builds the immutable run configuration
    pub fn config(&self) -> Result<TailConfig, RunError> {
        let calibration = match &self.params {
            Some(path) => Calibration::from_json(path)?,
            None => Calibration::default(),
        };

        let trace_dir = match (self.plot, &self.plot_dir) {
            (true, Some(dir)) => Some(dir.clone()),
            (true, None) => Some(self.outdir.join(config::TRACES)),
            (false, _) => None,
        };

        Ok(TailConfig {
            input: self.input.clone(),
            outdir: self.outdir.clone(),
            workers: self.threads,
            chunk_size: self.chunk_size,
            protocol: self.protocol,
            emit_traces: self.plot,
            trace_dir,
            calibration,
        })
    }
}

impl ArgCheck for Args {
    fn get_input(&self) -> &PathBuf {
        &self.input
    }

    fn get_params(&self) -> Option<&PathBuf> {
        self.params.as_ref()
    }

    fn get_threads(&self) -> usize {
        self.threads
    }

    fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_config() {
        let args = Args::from(vec![
            "--input".into(),
            "reads".into(),
            "-t".into(),
            "3".into(),
            "--protocol".into(),
            "pcr-dna".into(),
            "--plot".into(),
        ]);

        let config = args.config().unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.chunk_size, CHUNK_SIZE);
        assert_eq!(config.protocol, AdapterProtocol::PcrDna);
        assert!(config.emit_traces);
        assert_eq!(config.trace_dir, Some(PathBuf::from(".").join("traces")));
        assert_eq!(config.calibration, Calibration::default());
    }

    #[test]
    fn test_plot_disabled_has_no_trace_dir() {
        let args = Args::from(vec!["-i".into(), "reads".into()]);
        let config = args.config().unwrap();

        assert!(!config.emit_traces);
        assert!(config.trace_dir.is_none());
        assert_eq!(config.protocol, AdapterProtocol::Cdna);
    }
}

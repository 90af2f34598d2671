use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::cli::*;
use crate::error::RunError;

/// Library protocol; selects the adapter sequences used for orientation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterProtocol {
    #[default]
    Cdna,
    PcrDna,
}

/// Adapter sequences as they appear in the basecalled read: the poly(T)
/// adapter precedes the poly(T) stretch at the read head, the poly(A)
/// adapter follows the poly(A) stretch at the read end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSet {
    pub polya: &'static str,
    pub polyt: &'static str,
}

impl AdapterProtocol {
    pub fn adapters(&self) -> AdapterSet {
        match self {
            AdapterProtocol::Cdna => AdapterSet {
                polya: CDNA_POLYA_ADAPTER,
                polyt: CDNA_POLYT_ADAPTER,
            },
            AdapterProtocol::PcrDna => AdapterSet {
                polya: PCR_POLYA_ADAPTER,
                polyt: PCR_POLYT_ADAPTER,
            },
        }
    }
}

/// Thresholds for the flat-run scan over the raw signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    pub window: usize,
    pub min_run: usize,
    pub gap_tolerance: usize,
    pub level_low: f64,
    pub level_high: f64,
    pub max_slope: f64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            window: WINDOW,
            min_run: MIN_RUN,
            gap_tolerance: GAP_TOLERANCE,
            level_low: POLYA_LEVEL.0,
            level_high: POLYA_LEVEL.1,
            max_slope: MAX_SLOPE,
        }
    }
}

impl SegmentParams {
    pub fn polyt() -> Self {
        Self {
            level_low: POLYT_LEVEL.0,
            level_high: POLYT_LEVEL.1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    pub amplitude_threshold: f64,
    pub min_sustained: usize,
    pub flank: usize,
    pub calibration_window: usize,
    pub min_calibration_bases: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            amplitude_threshold: AMPLITUDE_THRESHOLD,
            min_sustained: MIN_SUSTAINED,
            flank: FLANK,
            calibration_window: CALIBRATION_WINDOW,
            min_calibration_bases: MIN_CALIBRATION_BASES,
        }
    }
}

/// Local alignment scoring. Gap penalties follow rust-bio's sign
/// convention: a gap of length k scores `gap_open + k * gap_extend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignParams {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub min_score: i32,
    pub tie_tolerance: i32,
    pub search_span: usize,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            match_score: MATCH_SCORE,
            mismatch_score: MISMATCH_SCORE,
            gap_open: GAP_OPEN,
            gap_extend: GAP_EXTEND,
            min_score: MIN_ALIGN_SCORE,
            tie_tolerance: TIE_TOLERANCE,
            search_span: ADAPTER_SEARCH_SPAN,
        }
    }
}

/// Every tunable constant of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub polya: SegmentParams,
    pub polyt: SegmentParams,
    pub refine: RefineParams,
    pub align: AlignParams,
    pub rna_search_slack: usize,
    pub dna_search_span: usize,
    pub tail_sequence_bases: usize,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            polya: SegmentParams::default(),
            polyt: SegmentParams::polyt(),
            refine: RefineParams::default(),
            align: AlignParams::default(),
            rna_search_slack: RNA_SEARCH_SLACK,
            dna_search_span: DNA_SEARCH_SPAN,
            tail_sequence_bases: TAIL_SEQUENCE_BASES,
        }
    }
}

impl Calibration {
    /// Reads a (possibly partial) JSON object over the defaults
    pub fn from_json(path: &Path) -> Result<Self, RunError> {
        let reader = BufReader::new(File::open(path)?);
        let calibration = serde_json::from_reader(reader)?;

        Ok(calibration)
    }
}

/// Run configuration, built once and passed by reference everywhere
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub input: PathBuf,
    pub outdir: PathBuf,
    pub workers: usize,
    pub chunk_size: usize,
    pub protocol: AdapterProtocol,
    pub emit_traces: bool,
    pub trace_dir: Option<PathBuf>,
    pub calibration: Calibration,
}

impl TailConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            outdir: PathBuf::from("."),
            workers: num_cpus::get(),
            chunk_size: config::CHUNK_SIZE,
            protocol: AdapterProtocol::default(),
            emit_traces: false,
            trace_dir: None,
            calibration: Calibration::default(),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`crate::source::SquiggleSource`] implementation
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode container: {0}")]
    Json(#[from] serde_json::Error),
    #[error("read {read_id} not found in {}", .path.display())]
    MissingRead { path: PathBuf, read_id: String },
    #[error("dataset {0} is missing")]
    MissingDataset(String),
}

/// Fatal errors detected while probing the sample read.
///
/// The probed profile is applied to every read of the run, so
/// anything raised here aborts before any parallel work starts.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("read {0} is not a 1D read; only single-strand reads are supported")]
    NotSingleStrand(String),
    #[error("could not determine experiment type for read {0}")]
    UnknownExperiment(String),
    #[error("no reads found under {}", .0.display())]
    NoReads(PathBuf),
    #[error("could not probe sample read: {0}")]
    Source(#[from] SourceError),
}

/// Per-read extraction failures (unreadable or corrupt reads)
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("raw signal is empty")]
    EmptySignal,
    #[error("basecalled sequence is empty")]
    EmptySequence,
    #[error("corrupt move table: {0}")]
    CorruptMoveTable(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum AlignmentFailure {
    #[error("no adapter aligned above the minimum score (best: {best})")]
    NoAdapterAboveMinimum { best: i32 },
    #[error("sequence of length {0} is too short to align adapters")]
    SequenceTooShort(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum SegmentationFailure {
    #[error("no sustained flat region found")]
    NotFound,
    #[error("search region of {len} samples is shorter than the window ({window})")]
    RegionTooShort { len: usize, window: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum RefineFailure {
    #[error("no basecalled samples available to calibrate samples per nucleotide")]
    NoCalibration,
}

/// Umbrella error used by the per-read orchestrator
#[derive(Debug, Error)]
pub enum TailError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Alignment(#[from] AlignmentFailure),
    #[error(transparent)]
    Segmentation(#[from] SegmentationFailure),
    #[error(transparent)]
    Refine(#[from] RefineFailure),
}

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("could not build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse calibration parameters: {0}")]
    Params(#[from] serde_json::Error),
}

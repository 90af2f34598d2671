use std::fmt;
use std::path::PathBuf;

use config::NA;

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basecaller {
    Albacore,
    Guppy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Standard,
    FlipFlop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Experiment {
    Rna,
    Dna,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strandedness {
    OneD,
    MultiStrand,
}

/// Format and experiment properties probed once from a sample read
/// and applied to every read of the run.
///
/// A misdetected profile is not corrected mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentProfile {
    pub basecaller: Basecaller,
    pub model: ModelVariant,
    pub layout: Layout,
    pub experiment: Experiment,
    pub strandedness: Strandedness,
}

/// Raw current samples of a single read
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    samples: Vec<i16>,
}

impl RawSignal {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Base-to-sample mapping derived from the basecaller's move/stride output.
///
/// Base `b` starts at the sample of the step where the running sum
/// of moves first exceeds `b`. Standard models may advance two bases
/// per step, flip-flop models at most one.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTable {
    first_sample: usize,
    stride: usize,
    steps: usize,
    base_starts: Vec<usize>,
}

impl MoveTable {
    pub fn new(
        first_sample: usize,
        stride: usize,
        moves: &[u8],
        model: ModelVariant,
    ) -> Result<Self, ExtractError> {
        if stride == 0 {
            return Err(ExtractError::CorruptMoveTable("stride is zero".into()));
        }

        let max_move = match model {
            ModelVariant::Standard => 2,
            ModelVariant::FlipFlop => 1,
        };

        let mut base_starts = Vec::with_capacity(moves.len());
        for (step, &mv) in moves.iter().enumerate() {
            if mv > max_move {
                return Err(ExtractError::CorruptMoveTable(format!(
                    "move of {} at step {} exceeds {} for {:?} model",
                    mv, step, max_move, model
                )));
            }

            let sample = first_sample + step * stride;
            for _ in 0..mv {
                base_starts.push(sample);
            }
        }

        Ok(Self {
            first_sample,
            stride,
            steps: moves.len(),
            base_starts,
        })
    }

    pub fn first_sample(&self) -> usize {
        self.first_sample
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sample right after the last basecalled step
    pub fn end_sample(&self) -> usize {
        self.first_sample + self.steps * self.stride
    }

    pub fn base_count(&self) -> usize {
        self.base_starts.len()
    }

    pub fn base_to_sample(&self, base: usize) -> Option<usize> {
        self.base_starts.get(base).copied()
    }

    /// Index of the base whose sample range contains `sample`
    pub fn sample_to_base(&self, sample: usize) -> Option<usize> {
        if sample >= self.end_sample() {
            return None;
        }

        match self.base_starts.partition_point(|&s| s <= sample) {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Number of bases starting within `[lo, hi)`
    pub fn bases_within(&self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return 0;
        }

        let left = self.base_starts.partition_point(|&s| s < lo);
        let right = self.base_starts.partition_point(|&s| s < hi);
        right - left
    }

    pub fn global_samples_per_nt(&self) -> Option<f64> {
        if self.base_starts.is_empty() {
            return None;
        }

        Some((self.end_sample() - self.first_sample) as f64 / self.base_count() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasecallRecord {
    pub read_id: String,
    pub sequence: String,
    pub source_file: PathBuf,
    pub is_1d: bool,
}

/// Window-resolution tail edges in sample space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrudeBoundary {
    pub start_sample: usize,
    pub end_sample: usize,
}

/// Sample-exact tail edges after refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreciseBoundary {
    pub start_sample: usize,
    pub end_sample: usize,
    pub is_valid: bool,
    pub is_precise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadType {
    PolyA,
    PolyT,
    Unknown,
}

impl fmt::Display for ReadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadType::PolyA => write!(f, "polyA"),
            ReadType::PolyT => write!(f, "polyT"),
            ReadType::Unknown => write!(f, "{}", NA),
        }
    }
}

/// Final per-read result. `None` fields are reported as NA.
#[derive(Debug, Clone, PartialEq)]
pub struct TailRecord {
    pub read_id: String,
    pub read_type: ReadType,
    pub tail_is_valid: Option<bool>,
    pub tail_start: Option<usize>,
    pub tail_end: Option<usize>,
    pub samples_per_nt: Option<f64>,
    pub tail_length: Option<usize>,
    pub tail_sequence: Option<String>,
    pub file_path: PathBuf,
    pub has_precise_boundary: Option<bool>,
}

impl TailRecord {
    /// Record for a read that could not be analyzed at all
    pub fn na(read_id: &str, file_path: PathBuf) -> Self {
        Self {
            read_id: read_id.to_owned(),
            read_type: ReadType::Unknown,
            tail_is_valid: None,
            tail_start: None,
            tail_end: None,
            samples_per_nt: None,
            tail_length: None,
            tail_sequence: None,
            file_path,
            has_precise_boundary: None,
        }
    }

    /// Record for an analyzed read where no tail was found
    pub fn invalid(read_id: &str, file_path: PathBuf, samples_per_nt: Option<f64>) -> Self {
        Self {
            tail_is_valid: Some(false),
            samples_per_nt,
            has_precise_boundary: Some(false),
            ..Self::na(read_id, file_path)
        }
    }

    pub fn valid(
        read_id: &str,
        file_path: PathBuf,
        read_type: ReadType,
        boundary: &PreciseBoundary,
        samples_per_nt: f64,
    ) -> Self {
        Self {
            read_id: read_id.to_owned(),
            read_type,
            tail_is_valid: Some(true),
            tail_start: Some(boundary.start_sample),
            tail_end: Some(boundary.end_sample),
            samples_per_nt: Some(samples_per_nt),
            tail_length: Some(tail_length(
                boundary.start_sample,
                boundary.end_sample,
                samples_per_nt,
            )),
            tail_sequence: None,
            file_path,
            has_precise_boundary: Some(boundary.is_precise),
        }
    }

    pub fn with_sequence(mut self, sequence: Option<String>) -> Self {
        self.tail_sequence = sequence;
        self
    }

    pub fn header(experiment: Experiment) -> &'static str {
        match experiment {
            Experiment::Dna => "read_id\tread_type\ttail_is_valid\ttail_start\ttail_end\tsamples_per_nt\ttail_length\tfile_path\thas_precise_boundary",
            Experiment::Rna => "read_id\ttail_is_valid\ttail_start\ttail_end\tsamples_per_nt\ttail_length\ttail_sequence\tfile_path",
        }
    }

    pub fn to_row(&self, experiment: Experiment) -> String {
        match experiment {
            Experiment::Dna => format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                self.read_id,
                self.read_type,
                na_or(self.tail_is_valid),
                na_or(self.tail_start),
                na_or(self.tail_end),
                na_or(self.samples_per_nt),
                na_or(self.tail_length),
                self.file_path.display(),
                na_or(self.has_precise_boundary),
            ),
            Experiment::Rna => format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                self.read_id,
                na_or(self.tail_is_valid),
                na_or(self.tail_start),
                na_or(self.tail_end),
                na_or(self.samples_per_nt),
                na_or(self.tail_length),
                na_or(self.tail_sequence.as_ref()),
                self.file_path.display(),
            ),
        }
    }
}

/// Tail length in nucleotides for a sample span
pub fn tail_length(start_sample: usize, end_sample: usize, samples_per_nt: f64) -> usize {
    let span = end_sample.saturating_sub(start_sample) as f64;
    (span / samples_per_nt).round() as usize
}

fn na_or<T: fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NA.to_string(),
    }
}

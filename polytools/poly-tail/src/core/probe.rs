use crate::{
    error::FormatError,
    record::{Basecaller, Experiment, ExperimentProfile, Layout, ModelVariant, Strandedness},
    source::{ReadHandle, ReadMetadata, SquiggleSource, FILE_TYPE, MULTI_READ},
};

// dataset markers
const MULTI_STRAND_GROUPS: [&str; 2] = ["Basecall_2D", "Basecall_1D2"];
const MOVE_DATASET: &str = "Move";
const EVENTS_DATASET: &str = "Events";

// attribute keys
const BASECALLER_KEYS: [&str; 2] = ["basecaller", "name"];
const MODEL_KEY: &str = "model_type";
const EXPERIMENT_KEY: &str = "experiment_type";
const KIT_KEY: &str = "sequencing_kit";

/// Probes the profile of a run from one sample read.
///
/// # Arguments
///
/// * `source` - container reader
/// * `handle` - the sample read
///
/// # Errors
///
/// Returns `FormatError::NotSingleStrand` for 2D/1D² reads, which
/// aborts the run before any read is dispatched.
///
/// # Example
///
/// ```rust, ignore
/// let profile = probe_format(&source, &handle)?;
/// assert_eq!(profile.strandedness, Strandedness::OneD);
/// ```
pub fn probe_format(
    source: &dyn SquiggleSource,
    handle: &ReadHandle,
) -> Result<ExperimentProfile, FormatError> {
    let metadata = source.metadata(handle)?;
    let read_id = handle.display_id();

    let strandedness = strandedness(&metadata);
    if strandedness != Strandedness::OneD {
        return Err(FormatError::NotSingleStrand(read_id));
    }

    let layout = match metadata.attribute(FILE_TYPE) {
        Some(MULTI_READ) => Layout::Multi,
        _ if source.read_ids(&handle.file)?.len() > 1 => Layout::Multi,
        _ => Layout::Single,
    };

    let experiment = experiment(&metadata).ok_or(FormatError::UnknownExperiment(read_id))?;

    Ok(ExperimentProfile {
        basecaller: basecaller(&metadata),
        model: model(&metadata),
        layout,
        experiment,
        strandedness,
    })
}

pub fn strandedness(metadata: &ReadMetadata) -> Strandedness {
    if MULTI_STRAND_GROUPS.iter().any(|g| metadata.has_dataset(g)) {
        Strandedness::MultiStrand
    } else {
        Strandedness::OneD
    }
}

fn basecaller(metadata: &ReadMetadata) -> Basecaller {
    let name = BASECALLER_KEYS
        .iter()
        .find_map(|k| metadata.attribute(k))
        .unwrap_or_default()
        .to_ascii_lowercase();

    if name.contains("guppy") {
        Basecaller::Guppy
    } else if name.contains("albacore") {
        Basecaller::Albacore
    } else {
        Basecaller::Unknown
    }
}

fn model(metadata: &ReadMetadata) -> ModelVariant {
    if let Some(model) = metadata.attribute(MODEL_KEY) {
        if model.to_ascii_lowercase().contains("flipflop") {
            return ModelVariant::FlipFlop;
        }
    }

    // INFO: flip-flop basecallers write a move table but no event table
    let has_moves = metadata.datasets.iter().any(|d| d.ends_with(MOVE_DATASET));
    let has_events = metadata.datasets.iter().any(|d| d.ends_with(EVENTS_DATASET));

    match (has_moves, has_events) {
        (true, false) => ModelVariant::FlipFlop,
        _ => ModelVariant::Standard,
    }
}

fn experiment(metadata: &ReadMetadata) -> Option<Experiment> {
    if let Some(kind) = metadata.attribute(EXPERIMENT_KEY) {
        match kind.to_ascii_lowercase().as_str() {
            "rna" => return Some(Experiment::Rna),
            "dna" | "genomic_dna" | "cdna" => return Some(Experiment::Dna),
            _ => (),
        }
    }

    let kit = metadata.attribute(KIT_KEY)?.to_ascii_lowercase();
    if kit.contains("rna") {
        Some(Experiment::Rna)
    } else if kit.contains("dna") || kit.contains("pcs") || kit.contains("lsk") {
        Some(Experiment::Dna)
    } else {
        None
    }
}

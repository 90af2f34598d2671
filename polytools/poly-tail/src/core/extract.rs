use crate::{
    core::probe::strandedness,
    error::ExtractError,
    record::{BasecallRecord, ExperimentProfile, MoveTable, RawSignal, Strandedness},
    source::{ReadHandle, SquiggleSource},
};

/// Read-scoped data; dropped as soon as the read is processed
#[derive(Debug)]
pub struct ExtractedRead {
    pub signal: RawSignal,
    pub moves: MoveTable,
    pub basecall: BasecallRecord,
}

/// Loads and validates a read's signal, move table and basecall.
///
/// Absent or inconsistent datasets are reported as `ExtractError`,
/// never as a panic.
pub fn extract_read(
    source: &dyn SquiggleSource,
    handle: &ReadHandle,
    profile: &ExperimentProfile,
) -> Result<ExtractedRead, ExtractError> {
    let raw = source.fetch(handle)?;

    if raw.signal.is_empty() {
        return Err(ExtractError::EmptySignal);
    }
    if raw.sequence.is_empty() {
        return Err(ExtractError::EmptySequence);
    }

    let moves = MoveTable::new(raw.first_sample, raw.stride, &raw.moves, profile.model)?;

    if moves.base_count() != raw.sequence.len() {
        return Err(ExtractError::CorruptMoveTable(format!(
            "{} bases in move table but {} in sequence",
            moves.base_count(),
            raw.sequence.len()
        )));
    }
    if moves.end_sample() > raw.signal.len() {
        return Err(ExtractError::CorruptMoveTable(format!(
            "move table ends at sample {} past signal length {}",
            moves.end_sample(),
            raw.signal.len()
        )));
    }

    let basecall = BasecallRecord {
        is_1d: strandedness(&raw.metadata) == Strandedness::OneD,
        read_id: raw.read_id,
        sequence: raw.sequence,
        source_file: handle.file.clone(),
    };

    Ok(ExtractedRead {
        signal: RawSignal::new(raw.signal),
        moves,
        basecall,
    })
}

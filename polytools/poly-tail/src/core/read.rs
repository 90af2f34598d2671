use log::{debug, warn};

use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{
    core::adapter::{align_adapters, Orientation},
    core::extract::{extract_read, ExtractedRead},
    core::refine::{refine_boundary, samples_per_nt, CalibrationSide},
    core::segment::find_tail,
    error::{SegmentationFailure, TailError},
    params::{SegmentParams, TailConfig},
    record::{CrudeBoundary, Experiment, ExperimentProfile, PreciseBoundary, ReadType, TailRecord},
    source::{ReadHandle, SquiggleSource},
    trace::{SignalTrace, TraceSink},
};

/// Everything a worker needs to process one read; shared read-only
/// across the pool.
#[derive(Clone, Copy)]
pub struct ReadContext<'a> {
    pub source: &'a dyn SquiggleSource,
    pub profile: &'a ExperimentProfile,
    pub config: &'a TailConfig,
    pub sink: &'a dyn TraceSink,
}

/// Boundaries of one tail candidate
#[derive(Debug, Clone, Copy)]
struct Candidate {
    crude: CrudeBoundary,
    precise: PreciseBoundary,
    samples_per_nt: f64,
}

#[derive(Debug)]
struct Outcome {
    record: TailRecord,
    candidate: Option<Candidate>,
}

/// Runs extract, align, segment and refine for a single read.
///
/// Never fails: extraction errors and internal faults alike become an
/// NA record carrying only the read id and file path, so every handle
/// yields exactly one record.
///
/// # Arguments
///
/// * `ctx` - shared run context
/// * `handle` - the read to process
///
/// # Example
///
/// ```rust, ignore
/// let record = process_read(&ctx, &handle);
/// assert_eq!(record.read_id, handle.display_id());
/// ```
pub fn process_read(ctx: &ReadContext<'_>, handle: &ReadHandle) -> TailRecord {
    match catch_unwind(AssertUnwindSafe(|| analyze_read(ctx, handle))) {
        Ok(Ok(record)) => record,
        Ok(Err(err)) => {
            debug!("WARN: read {} yields NA: {}", handle.display_id(), err);
            TailRecord::na(&handle.display_id(), handle.file.clone())
        }
        Err(_) => {
            warn!(
                "ERROR: internal fault while processing read {}; reporting NA",
                handle.display_id()
            );
            TailRecord::na(&handle.display_id(), handle.file.clone())
        }
    }
}

fn analyze_read(ctx: &ReadContext<'_>, handle: &ReadHandle) -> Result<TailRecord, TailError> {
    let read = extract_read(ctx.source, handle, ctx.profile)?;

    let outcome = match ctx.profile.experiment {
        Experiment::Rna => rna_tail(ctx.config, &read)?,
        Experiment::Dna => dna_tail(ctx.config, &read)?,
    };

    if ctx.config.emit_traces {
        emit_trace(ctx.sink, &read, outcome.candidate);
    }

    Ok(outcome.record)
}

/// RNA is read 3' to 5': the poly(A) tail sits ahead of the basecalled
/// region, so only the proximal part of the signal is searched.
fn rna_tail(config: &TailConfig, read: &ExtractedRead) -> Result<Outcome, TailError> {
    let calibration = &config.calibration;
    let samples = read.signal.samples();
    let region = 0..(read.moves.first_sample() + calibration.rna_search_slack).min(samples.len());

    let candidate = match probe_tail(
        read,
        region,
        &calibration.polya,
        CalibrationSide::After,
        config,
    ) {
        Ok(candidate) if candidate.precise.is_valid => candidate,
        Ok(_) | Err(TailError::Segmentation(_)) => return Ok(invalid(read, None)),
        Err(err) => return Err(err),
    };

    let record = TailRecord::valid(
        &read.basecall.read_id,
        read.basecall.source_file.clone(),
        ReadType::PolyA,
        &candidate.precise,
        candidate.samples_per_nt,
    )
    .with_sequence(tail_sequence(
        read,
        candidate.precise.end_sample,
        calibration.tail_sequence_bases,
    ));

    Ok(Outcome {
        record,
        candidate: Some(candidate),
    })
}

/// DNA reads may carry either strand. The adapter call decides which
/// end is probed first; an unresolved call probes both, each from its
/// default anchor. Neither end searches past the midpoint between the
/// two anchors.
fn dna_tail(config: &TailConfig, read: &ExtractedRead) -> Result<Outcome, TailError> {
    let calibration = &config.calibration;
    let samples = read.signal.samples();
    let span = calibration.dna_search_span;

    let call = match align_adapters(
        &read.basecall,
        &config.protocol.adapters(),
        &calibration.align,
    ) {
        Ok(call) => Some(call),
        Err(err) => {
            debug!(
                "WARN: read {}: {}; probing default anchors",
                read.basecall.read_id, err
            );
            None
        }
    };

    let order = match call.map(|c| c.orientation) {
        Some(Orientation::PolyT) => [ReadType::PolyT, ReadType::PolyA],
        _ => [ReadType::PolyA, ReadType::PolyT],
    };

    // INFO: each end searches only its own half between the two anchors
    let polyt_anchor = call
        .and_then(|c| c.polyt_anchor(&read.moves))
        .unwrap_or(read.moves.first_sample());
    let polya_anchor = call
        .and_then(|c| c.polya_anchor(&read.moves))
        .unwrap_or(read.moves.end_sample())
        .min(samples.len());
    let split = polyt_anchor + polya_anchor.saturating_sub(polyt_anchor) / 2;

    let mut last = None;
    for read_type in order {
        let (region, params, side) = match read_type {
            ReadType::PolyT => (
                polyt_anchor..(polyt_anchor + span).min(split),
                &calibration.polyt,
                CalibrationSide::After,
            ),
            _ => (
                polya_anchor.saturating_sub(span).max(split)..polya_anchor,
                &calibration.polya,
                CalibrationSide::Before,
            ),
        };

        match probe_tail(read, region, params, side, config) {
            Ok(candidate) if candidate.precise.is_valid => {
                let record = TailRecord::valid(
                    &read.basecall.read_id,
                    read.basecall.source_file.clone(),
                    read_type,
                    &candidate.precise,
                    candidate.samples_per_nt,
                );
                return Ok(Outcome {
                    record,
                    candidate: Some(candidate),
                });
            }
            Ok(candidate) => last = Some(candidate),
            Err(TailError::Segmentation(SegmentationFailure::NotFound))
            | Err(TailError::Segmentation(SegmentationFailure::RegionTooShort { .. })) => (),
            Err(err) => return Err(err),
        }
    }

    Ok(invalid(read, last))
}

fn probe_tail(
    read: &ExtractedRead,
    region: Range<usize>,
    params: &SegmentParams,
    side: CalibrationSide,
    config: &TailConfig,
) -> Result<Candidate, TailError> {
    let samples = read.signal.samples();
    let refine = &config.calibration.refine;

    let crude = find_tail(samples, region, params)?;
    let precise = refine_boundary(samples, &crude, refine, params.window);
    if !precise.is_precise {
        debug!(
            "WARN: read {}: no sustained crossing near {}..{}, keeping crude edges",
            read.basecall.read_id, crude.start_sample, crude.end_sample
        );
    }

    let samples_per_nt = samples_per_nt(&read.moves, &precise, side, refine)?;

    Ok(Candidate {
        crude,
        precise,
        samples_per_nt,
    })
}

fn invalid(read: &ExtractedRead, candidate: Option<Candidate>) -> Outcome {
    let record = TailRecord::invalid(
        &read.basecall.read_id,
        read.basecall.source_file.clone(),
        read.moves.global_samples_per_nt(),
    );

    Outcome { record, candidate }
}

/// Up to `n` basecalled bases right after the tail end, in signal order
fn tail_sequence(read: &ExtractedRead, end_sample: usize, n: usize) -> Option<String> {
    let first = if end_sample < read.moves.first_sample() {
        0
    } else {
        read.moves.sample_to_base(end_sample)?
    };

    let sequence = &read.basecall.sequence;
    let last = (first + n).min(sequence.len());
    sequence.get(first..last).map(str::to_owned)
}

fn emit_trace(sink: &dyn TraceSink, read: &ExtractedRead, candidate: Option<Candidate>) {
    let trace = SignalTrace {
        read_id: &read.basecall.read_id,
        samples: read.signal.samples(),
        crude: candidate.map(|c| c.crude),
        precise: candidate.map(|c| c.precise),
    };

    match catch_unwind(AssertUnwindSafe(|| sink.accept(&trace))) {
        Ok(Ok(())) => (),
        Ok(Err(err)) => warn!(
            "WARN: could not write trace for read {}: {}",
            read.basecall.read_id, err
        ),
        Err(_) => warn!(
            "WARN: trace sink faulted on read {}",
            read.basecall.read_id
        ),
    }
}

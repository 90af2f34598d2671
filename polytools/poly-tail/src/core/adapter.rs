use bio::alignment::pairwise::Aligner;

use crate::{
    error::AlignmentFailure,
    params::{AdapterSet, AlignParams},
    record::{BasecallRecord, MoveTable},
};

/// Best local alignment of an adapter, in read (base) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterHit {
    pub score: i32,
    pub read_start: usize,
    pub read_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    PolyA,
    PolyT,
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterCall {
    pub orientation: Orientation,
    pub polya: Option<AdapterHit>,
    pub polyt: Option<AdapterHit>,
}

impl AdapterCall {
    /// Sample where a poly(A) tail must end: the adapter's first base
    pub fn polya_anchor(&self, moves: &MoveTable) -> Option<usize> {
        self.polya.and_then(|hit| base_sample(moves, hit.read_start))
    }

    /// Sample where a poly(T) tail may start: right after the adapter
    pub fn polyt_anchor(&self, moves: &MoveTable) -> Option<usize> {
        self.polyt.and_then(|hit| base_sample(moves, hit.read_end))
    }
}

#[inline(always)]
fn base_sample(moves: &MoveTable, base: usize) -> Option<usize> {
    match moves.base_to_sample(base) {
        Some(sample) => Some(sample),
        None if base == moves.base_count() => Some(moves.end_sample()),
        None => None,
    }
}

/// Aligns both adapters against the read ends and classifies the
/// read's orientation.
///
/// The poly(T) adapter is searched in the first `search_span` bases,
/// the poly(A) adapter in the last `search_span` bases. Scores within
/// `tie_tolerance` of each other leave the orientation ambiguous.
///
/// # Example
///
/// ```rust, ignore
/// let call = align_adapters(&basecall, &AdapterProtocol::Cdna.adapters(), &AlignParams::default())?;
/// assert_eq!(call.orientation, Orientation::PolyT);
/// ```
pub fn align_adapters(
    basecall: &BasecallRecord,
    adapters: &AdapterSet,
    params: &AlignParams,
) -> Result<AdapterCall, AlignmentFailure> {
    let sequence = basecall.sequence.to_ascii_uppercase();
    let seq = sequence.as_bytes();

    let shortest = adapters.polya.len().min(adapters.polyt.len());
    if seq.len() < shortest {
        return Err(AlignmentFailure::SequenceTooShort(seq.len()));
    }

    let span = params.search_span.max(shortest).min(seq.len());
    let tail_offset = seq.len() - span;

    let (match_score, mismatch_score) = (params.match_score, params.mismatch_score);
    let score = |a: u8, b: u8| {
        if a == b {
            match_score
        } else {
            mismatch_score
        }
    };

    // INFO: rust-bio expects non-positive gap scores
    let mut aligner = Aligner::with_capacity(
        adapters.polyt.len().max(adapters.polya.len()),
        span,
        params.gap_open.min(0),
        params.gap_extend.min(0),
        &score,
    );

    let polyt = aligner.local(adapters.polyt.as_bytes(), &seq[..span]);
    let polya = aligner.local(adapters.polya.as_bytes(), &seq[tail_offset..]);

    let hit = |score: i32, ystart: usize, yend: usize, offset: usize| {
        (score >= params.min_score).then_some(AdapterHit {
            score,
            read_start: offset + ystart,
            read_end: offset + yend,
        })
    };

    let polyt_hit = hit(polyt.score, polyt.ystart, polyt.yend, 0);
    let polya_hit = hit(polya.score, polya.ystart, polya.yend, tail_offset);

    let orientation = match (polya_hit, polyt_hit) {
        (None, None) => {
            return Err(AlignmentFailure::NoAdapterAboveMinimum {
                best: polya.score.max(polyt.score),
            })
        }
        (Some(_), None) => Orientation::PolyA,
        (None, Some(_)) => Orientation::PolyT,
        (Some(a), Some(t)) if (a.score - t.score).abs() <= params.tie_tolerance => {
            Orientation::Ambiguous
        }
        (Some(a), Some(t)) if a.score > t.score => Orientation::PolyA,
        (Some(_), Some(_)) => Orientation::PolyT,
    };

    Ok(AdapterCall {
        orientation,
        polya: polya_hit,
        polyt: polyt_hit,
    })
}

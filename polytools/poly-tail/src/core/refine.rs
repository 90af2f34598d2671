use crate::{
    error::RefineFailure,
    params::RefineParams,
    record::{CrudeBoundary, MoveTable, PreciseBoundary},
    utils::median,
};

/// Which neighbour of the tail is used to measure the local
/// translocation rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSide {
    /// Transcript follows the tail in signal order (poly(A) RNA, poly(T) DNA)
    After,
    /// Transcript precedes the tail in signal order (poly(A) DNA)
    Before,
}

/// Tightens crude window-resolution edges to exact samples.
///
/// The tail level is the median of the crude span. Each edge is searched
/// from `window` samples inside the crude span outward for up to `flank`
/// samples; the tail ends where at least `min_sustained` consecutive
/// samples deviate from the level by more than `amplitude_threshold`.
/// Isolated spikes never qualify. An edge without a sustained
/// departure keeps its crude value and the boundary is marked imprecise.
///
/// # Arguments
///
/// * `signal` - raw samples of the read
/// * `crude` - output of the flat-run scan
/// * `params` - refinement thresholds
/// * `window` - window size used by the scan
///
/// # Example
///
/// ```rust, ignore
/// let precise = refine_boundary(signal.samples(), &crude, &params.refine, params.polya.window);
/// assert!(precise.start_sample < precise.end_sample);
/// ```
pub fn refine_boundary(
    signal: &[i16],
    crude: &CrudeBoundary,
    params: &RefineParams,
    window: usize,
) -> PreciseBoundary {
    let len = signal.len();
    let start = crude.start_sample.min(len);
    let end = crude.end_sample.min(len);

    let level = match median(&signal[start..end.max(start)]) {
        Some(level) => level,
        None => return imprecise(crude, len),
    };

    let crosses = |i: usize| (signal[i] as f64 - level).abs() > params.amplitude_threshold;
    let sustained = params.min_sustained.max(1);
    let mid = start + end.saturating_sub(start) / 2;

    let precise_start = {
        let from = (start + window).min(mid);
        let to = start.saturating_sub(params.flank);
        (to..=from)
            .rev()
            .filter(|&i| i + 1 >= sustained)
            .find(|&i| (i + 1 - sustained..=i).all(crosses))
            .map(|i| i + 1)
    };

    let precise_end = {
        let from = end.saturating_sub(window).max(mid);
        let to = (end + params.flank).min(len);
        (from..to)
            .filter(|&i| i + sustained <= len)
            .find(|&i| (i..i + sustained).all(crosses))
    };

    let start_sample = precise_start.unwrap_or(crude.start_sample);
    let end_sample = precise_end.unwrap_or(crude.end_sample);
    if start_sample >= end_sample {
        return imprecise(crude, len);
    }

    PreciseBoundary {
        start_sample,
        end_sample,
        is_valid: end_sample <= len,
        is_precise: precise_start.is_some() && precise_end.is_some(),
    }
}

fn imprecise(crude: &CrudeBoundary, len: usize) -> PreciseBoundary {
    PreciseBoundary {
        start_sample: crude.start_sample,
        end_sample: crude.end_sample,
        is_valid: crude.start_sample < crude.end_sample && crude.end_sample <= len,
        is_precise: false,
    }
}

/// Samples per nucleotide measured on the transcript next to the tail.
///
/// Counts the bases starting within `calibration_window` samples on
/// `side` of the boundary. Falls back to the read-wide rate when fewer
/// than `min_calibration_bases` bases are found there.
///
/// # Example
///
/// ```rust, ignore
/// let spn = samples_per_nt(&moves, &precise, CalibrationSide::After, &params.refine)?;
/// assert!(spn > 0.0);
/// ```
pub fn samples_per_nt(
    moves: &MoveTable,
    boundary: &PreciseBoundary,
    side: CalibrationSide,
    params: &RefineParams,
) -> Result<f64, RefineFailure> {
    let (lo, hi) = match side {
        CalibrationSide::After => (
            boundary.end_sample,
            boundary.end_sample + params.calibration_window,
        ),
        CalibrationSide::Before => (
            boundary
                .start_sample
                .saturating_sub(params.calibration_window),
            boundary.start_sample,
        ),
    };
    let lo = lo.max(moves.first_sample());
    let hi = hi.min(moves.end_sample());

    let bases = moves.bases_within(lo, hi);
    if bases > 0 && bases >= params.min_calibration_bases {
        return Ok((hi - lo) as f64 / bases as f64);
    }

    log::debug!(
        "WARN: only {} bases within [{}, {}), using read-wide rate",
        bases,
        lo,
        hi
    );
    moves
        .global_samples_per_nt()
        .ok_or(RefineFailure::NoCalibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ModelVariant;

    fn params() -> RefineParams {
        RefineParams {
            amplitude_threshold: 40.0,
            min_sustained: 5,
            flank: 100,
            calibration_window: 200,
            min_calibration_bases: 5,
        }
    }

    fn stepped_signal() -> Vec<i16> {
        let mut signal = vec![850i16; 600];
        signal[200..400].iter_mut().for_each(|s| *s = 500);
        signal
    }

    #[test]
    fn test_refines_to_sustained_departures() {
        let signal = stepped_signal();
        let crude = CrudeBoundary {
            start_sample: 190,
            end_sample: 410,
        };

        let precise = refine_boundary(&signal, &crude, &params(), 10);

        assert_eq!(precise.start_sample, 200);
        assert_eq!(precise.end_sample, 400);
        assert!(precise.is_precise);
        assert!(precise.is_valid);
    }

    #[test]
    fn test_isolated_spike_is_ignored() {
        let mut signal = stepped_signal();
        signal[205] = 900;
        let crude = CrudeBoundary {
            start_sample: 210,
            end_sample: 395,
        };

        let precise = refine_boundary(&signal, &crude, &params(), 10);

        assert_eq!(precise.start_sample, 200);
        assert_eq!(precise.end_sample, 400);
    }

    #[test]
    fn test_keeps_crude_edges_without_departure() {
        let signal = vec![500i16; 600];
        let crude = CrudeBoundary {
            start_sample: 200,
            end_sample: 400,
        };

        let precise = refine_boundary(&signal, &crude, &params(), 10);

        assert_eq!((precise.start_sample, precise.end_sample), (200, 400));
        assert!(!precise.is_precise);
        assert!(precise.is_valid);
    }

    // INFO: 50 steps moving every step, then 50 steps moving every other step
    fn moves() -> MoveTable {
        let steps: Vec<u8> = (0..100)
            .map(|i| if i < 50 || i % 2 == 0 { 1 } else { 0 })
            .collect();
        MoveTable::new(10, 10, &steps, ModelVariant::FlipFlop).unwrap()
    }

    fn boundary(start_sample: usize, end_sample: usize) -> PreciseBoundary {
        PreciseBoundary {
            start_sample,
            end_sample,
            is_valid: true,
            is_precise: true,
        }
    }

    #[test]
    fn test_local_rate_on_each_side() {
        let moves = moves();

        let after = samples_per_nt(&moves, &boundary(100, 600), CalibrationSide::After, &params());
        let before = samples_per_nt(&moves, &boundary(300, 400), CalibrationSide::Before, &params());

        assert_eq!(after, Ok(20.0));
        assert_eq!(before, Ok(10.0));
    }

    #[test]
    fn test_falls_back_to_read_wide_rate() {
        let moves = moves();

        let spn = samples_per_nt(&moves, &boundary(100, 1000), CalibrationSide::After, &params());

        assert_eq!(spn, Ok(1000.0 / 75.0));
    }

    #[test]
    fn test_no_calibration_without_bases() {
        let moves = MoveTable::new(10, 10, &[0u8; 20], ModelVariant::FlipFlop).unwrap();

        let spn = samples_per_nt(&moves, &boundary(10, 50), CalibrationSide::After, &params());

        assert_eq!(spn, Err(RefineFailure::NoCalibration));
    }
}

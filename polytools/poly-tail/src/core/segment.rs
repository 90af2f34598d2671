use std::ops::Range;

use crate::{
    error::SegmentationFailure,
    params::SegmentParams,
    record::CrudeBoundary,
    utils::{prefix_sums, window_stats},
};

/// Consecutive tail-like windows, possibly with short interruptions
#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    last: usize,
    len: usize,
}

/// Scans `signal[region]` for the first sustained flat run at the tail level.
///
/// A window is tail-like when its moving average lies within
/// `[level_low, level_high]` and its slope magnitude is at most
/// `max_slope`. Up to `gap_tolerance` non tail-like windows are
/// absorbed without breaking a run; a run qualifies once it holds
/// `min_run` tail-like windows. Single pass, O(region length).
///
/// # Arguments
///
/// * `signal` - raw samples of the read
/// * `region` - search region in sample coordinates
/// * `params` - window and threshold calibration
///
/// # Returns
///
/// * `CrudeBoundary` in absolute sample coordinates, or
///   `SegmentationFailure::NotFound` if no run qualifies
///
/// # Example
///
/// ```rust, ignore
/// let crude = find_tail(signal.samples(), 0..3000, &SegmentParams::default())?;
/// assert!(crude.start_sample < crude.end_sample);
/// ```
pub fn find_tail(
    signal: &[i16],
    region: Range<usize>,
    params: &SegmentParams,
) -> Result<CrudeBoundary, SegmentationFailure> {
    let end = region.end.min(signal.len());
    let region = region.start.min(end)..end;
    let window = params.window.max(2);

    let slice = &signal[region.clone()];
    if slice.len() < window {
        return Err(SegmentationFailure::RegionTooShort {
            len: slice.len(),
            window,
        });
    }

    let prefix = prefix_sums(slice);
    let to_boundary = |run: Run| CrudeBoundary {
        start_sample: region.start + run.start,
        end_sample: region.start + run.last + window,
    };

    let mut run: Option<Run> = None;
    for i in 0..=slice.len() - window {
        let (mean, slope) = window_stats(&prefix, i, window);
        let is_tail_like =
            mean >= params.level_low && mean <= params.level_high && slope <= params.max_slope;

        match (&mut run, is_tail_like) {
            (Some(current), true) => {
                current.last = i;
                current.len += 1;
            }
            (None, true) => {
                run = Some(Run {
                    start: i,
                    last: i,
                    len: 1,
                });
            }
            (Some(current), false) if i - current.last > params.gap_tolerance => {
                if current.len >= params.min_run {
                    return Ok(to_boundary(*current));
                }
                run = None;
            }
            _ => (),
        }
    }

    match run {
        Some(current) if current.len >= params.min_run => Ok(to_boundary(current)),
        _ => Err(SegmentationFailure::NotFound),
    }
}

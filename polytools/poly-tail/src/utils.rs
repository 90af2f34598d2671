/// Running sums with a leading zero: `prefix[i]` is the sum of `samples[..i]`
pub fn prefix_sums(samples: &[i16]) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    let mut acc = 0.0;

    prefix.push(acc);
    for &s in samples {
        acc += s as f64;
        prefix.push(acc);
    }

    prefix
}

/// Mean of `samples[start..end]` from prefix sums
#[inline(always)]
pub fn range_mean(prefix: &[f64], start: usize, end: usize) -> f64 {
    (prefix[end] - prefix[start]) / (end - start) as f64
}

/// Moving average and slope magnitude of the window `[start, start + window)`.
///
/// The slope is the level change between the two window halves,
/// normalized per sample.
#[inline(always)]
pub fn window_stats(prefix: &[f64], start: usize, window: usize) -> (f64, f64) {
    let half = window / 2;
    let mean = range_mean(prefix, start, start + window);
    let slope = (range_mean(prefix, start + half, start + window)
        - range_mean(prefix, start, start + half))
    .abs()
        / half as f64;

    (mean, slope)
}

pub fn median(samples: &[i16]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    match sorted.len() % 2 {
        0 => Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0),
        _ => Some(sorted[mid] as f64),
    }
}

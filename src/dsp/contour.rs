/// Runs shorter than this stay NaN in the derived contour.
pub const MIN_INTERPOLATED_RUN: usize = 3;

/// Longest NaN stretch bridged from each side of a gap.
pub const INTERPOLATION_LIMIT: usize = 2;

/// Find consecutive runs of voiced frames.
/// Returns a list of (start_index, end_index) pairs (inclusive).
pub fn voiced_runs(voiced: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;

    for (i, &is_voiced) in voiced.iter().enumerate() {
        match (is_voiced, start) {
            // Voiced frame, not currently in a run → start one
            (true, None) => start = Some(i),
            // Voiced frame, already in a run → continue
            (true, Some(_)) => {}
            // Unvoiced frame, was in a run → end it
            (false, Some(s)) => {
                runs.push((s, i - 1));
                start = None;
            }
            (false, None) => {}
        }
    }

    // Don't forget a run that extends to the end of the contour
    if let Some(s) = start {
        runs.push((s, voiced.len() - 1));
    }

    runs
}

/// Build the derived F0 contour from a raw one.
///
/// Every frame starts as NaN. For each voiced run of at least
/// [`MIN_INTERPOLATED_RUN`] frames the raw values are copied in and any NaN
/// holes are filled by linear interpolation, at most
/// [`INTERPOLATION_LIMIT`] frames inward from each side of a hole. Holes
/// touching the run edges take the nearest known value. Shorter runs are
/// too unreliable to show and remain NaN.
pub fn interpolate_voiced_runs(f0: &[f32], voiced: &[bool]) -> Vec<f32> {
    let n = f0.len().min(voiced.len());
    let mut derived = vec![f32::NAN; f0.len()];

    for (start, end) in voiced_runs(&voiced[..n]) {
        if end - start + 1 < MIN_INTERPOLATED_RUN {
            continue;
        }
        let run = &mut derived[start..=end];
        run.copy_from_slice(&f0[start..=end]);
        fill_gaps(run, INTERPOLATION_LIMIT);
    }

    derived
}

/// Linear gap filling with a per-side limit, in place.
fn fill_gaps(values: &mut [f32], limit: usize) {
    let known: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    if known.is_empty() {
        return;
    }

    let mut i = 0;
    while i < values.len() {
        if values[i].is_finite() {
            i += 1;
            continue;
        }
        let gap_start = i;
        while i < values.len() && !values[i].is_finite() {
            i += 1;
        }
        let gap_end = i; // exclusive

        let left = gap_start.checked_sub(1).map(|l| (l, values[l]));
        let right = (gap_end < values.len()).then(|| (gap_end, values[gap_end]));

        for k in gap_start..gap_end {
            let near_left = left.is_some() && k - gap_start < limit;
            let near_right = right.is_some() && gap_end - k <= limit;
            if !near_left && !near_right {
                continue;
            }
            values[k] = match (left, right) {
                (Some((l, lv)), Some((r, rv))) => {
                    let t = (k - l) as f32 / (r - l) as f32;
                    lv + t * (rv - lv)
                }
                (Some((_, lv)), None) => lv,
                (None, Some((_, rv))) => rv,
                (None, None) => continue,
            };
        }
    }
}

/// Percentile of a sorted slice with linear interpolation between ranks.
/// `p` is in [0.0, 1.0], e.g. 0.05 for 5th percentile.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

use std::f32::consts::PI;

/// Apply a Hanning window to a slice of samples, returning a new Vec.
///
/// The Hanning (also called Hann) window smoothly tapers a frame of audio
/// to zero at both edges. This prevents spectral leakage, the artifacts you'd
/// get from abruptly chopping a signal in the middle of a cycle.
///
/// Formula: w(n) = 0.5 * (1 - cos(2π * n / (N - 1)))
pub fn hanning(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n <= 1 {
        return samples.to_vec();
    }

    let scale = 2.0 * PI / (n - 1) as f32;

    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 * (1.0 - (scale * i as f32).cos());
            s * w
        })
        .collect()
}

/// Periodic Hann window coefficients of length `n`, for STFT analysis.
///
/// The periodic form divides by N instead of N - 1, so overlapping windows
/// at a hop of N/4 sum to a constant.
pub fn hann_periodic(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 2.0 * PI / n as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (scale * i as f32).cos()))
        .collect()
}

/// Symmetric Hamming window coefficients of length `n`, used before LPC.
pub fn hamming(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 2.0 * std::f64::consts::PI / (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (scale * i as f64).cos())
        .collect()
}

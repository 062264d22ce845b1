use std::ops::Range;

use super::framing;

/// RMS of a sample buffer (linear, not dB).
pub fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// RMS energy of the centred frames in `frames`, read from the whole signal.
///
/// Frames sit at the same positions the pitch tracker and the STFT use, so
/// frame `i` belongs at `i * hop_length / sample_rate` seconds.
pub fn rms_frames(
    samples: &[f32],
    frame_length: usize,
    hop_length: usize,
    frames: Range<usize>,
) -> Vec<f32> {
    if frame_length == 0 {
        return Vec::new();
    }
    let mut frame = vec![0.0f32; frame_length];

    frames
        .map(|i| {
            framing::centered_frame_into(samples, i, hop_length, &mut frame);
            frame_rms(&frame)
        })
        .collect()
}

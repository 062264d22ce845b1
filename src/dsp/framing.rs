//! Centred framing shared by the STFT, the pitch tracker and RMS.
//!
//! Frame `i` is centred on sample `i * hop_length`, so its time stamp is
//! simply `i * hop_length / sample_rate`. Samples that fall before the start
//! or past the end of the signal are read as zeros. Using the same framing
//! everywhere is what keeps spectrogram columns, F0 points and intensity
//! values on one time axis.

use std::ops::Range;

/// Number of centred frames for a signal of `len` samples.
///
/// `1 + len / hop_length`; an empty signal has no frames.
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    if len == 0 || hop_length == 0 {
        return 0;
    }
    1 + len / hop_length
}

/// Copy the centred frame `index` into `out` (length = frame length),
/// zero-filling outside the signal.
pub fn centered_frame_into(samples: &[f32], index: usize, hop_length: usize, out: &mut [f32]) {
    let frame_length = out.len();
    let center = (index * hop_length) as isize;
    let start = center - (frame_length / 2) as isize;

    for (k, slot) in out.iter_mut().enumerate() {
        let idx = start + k as isize;
        *slot = if idx >= 0 && (idx as usize) < samples.len() {
            samples[idx as usize]
        } else {
            0.0
        };
    }
}

/// Samples read by the frames in `frames`, clipped to the signal.
pub fn frames_span(
    len: usize,
    frames: &Range<usize>,
    hop_length: usize,
    frame_length: usize,
) -> Range<usize> {
    if frames.is_empty() {
        return 0..0;
    }
    let half = frame_length / 2;
    let start = (frames.start * hop_length).saturating_sub(half);
    let end = ((frames.end - 1) * hop_length + frame_length - half).min(len);
    start.min(end)..end
}

/// Smallest power of two that holds `seconds` worth of samples.
pub fn window_fft_size(sample_rate: u32, seconds: f64) -> usize {
    let n = (sample_rate as f64 * seconds).ceil().max(1.0) as usize;
    n.next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_centred_convention() {
        assert_eq!(frame_count(0, 256), 0);
        assert_eq!(frame_count(1, 256), 1);
        assert_eq!(frame_count(1024, 256), 5);
        assert_eq!(frame_count(1023, 256), 4);
    }

    #[test]
    fn first_frame_is_zero_padded() {
        let samples: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        let mut frame = vec![9.0; 4];
        centered_frame_into(&samples, 0, 2, &mut frame);
        assert_eq!(frame, vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn interior_and_trailing_frames() {
        let samples: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        let mut frame = vec![0.0; 4];
        centered_frame_into(&samples, 2, 2, &mut frame);
        assert_eq!(frame, vec![3.0, 4.0, 5.0, 6.0]);

        centered_frame_into(&samples, 4, 2, &mut frame);
        assert_eq!(frame, vec![7.0, 8.0, 0.0, 0.0]);
    }

    #[test]
    fn span_covers_every_frame_read() {
        assert_eq!(frames_span(1000, &(0..3), 100, 64), 0..232);
        assert_eq!(frames_span(1000, &(5..8), 100, 64), 468..732);
        assert_eq!(frames_span(1000, &(9..11), 100, 64), 868..1000);
        assert_eq!(frames_span(1000, &(4..4), 100, 64), 0..0);
    }

    #[test]
    fn fft_sizes_for_common_windows() {
        // 35 ms at 44.1 kHz = 1543.5 samples -> 2048
        assert_eq!(window_fft_size(44100, 0.035), 2048);
        // 5 ms at 44.1 kHz = 220.5 samples -> 256
        assert_eq!(window_fft_size(44100, 0.005), 256);
        // 40 ms at 16 kHz = 640 samples -> 1024
        assert_eq!(window_fft_size(16000, 0.040), 1024);
    }
}

//! Frame-wise formant estimation from LPC roots.

use super::tracks::FormantPoint;
use crate::audio::SampleBuffer;
use crate::dsp::emphasis::apply_pre_emphasis;
use crate::dsp::intensity::frame_rms;
use crate::dsp::lpc::{self, LpcFailure};
use crate::dsp::windowing;
use crate::error::{AnalysisError, Result};

/// Search bands for F1..F4 in Hz, inclusive, searched in this order.
pub const FORMANT_BANDS: [(f64, f64); 4] = [
    (250.0, 800.0),
    (800.0, 2200.0),
    (2200.0, 3000.0),
    (3000.0, 4000.0),
];

pub const FRAME_SECS: f64 = 0.025;

/// Frames quieter than this fraction of the loudest frame are not analysed.
pub const ENERGY_GATE: f32 = 0.05;

/// Peak amplitude below which a frame counts as digital silence.
pub const SILENCE_PEAK: f32 = 1e-5;

/// Why a frame produced no formant point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSkip {
    /// Below the energy gate or effectively zero.
    Silent,
    NonFinite,
    /// The LPC fit or root finding failed.
    UnstableLpc,
    /// Roots were found but none fell into a formant band.
    NoFormants,
}

impl From<LpcFailure> for FrameSkip {
    fn from(failure: LpcFailure) -> Self {
        match failure {
            LpcFailure::ZeroEnergy => FrameSkip::Silent,
            LpcFailure::Unstable | LpcFailure::NonFinite => FrameSkip::UnstableLpc,
        }
    }
}

/// Frame length in samples (25 ms).
pub fn frame_length(sample_rate: u32) -> usize {
    (sample_rate as f64 * FRAME_SECS).round() as usize
}

/// LPC order: two plus the sample rate in kHz.
pub fn lpc_order(sample_rate: u32) -> usize {
    2 + (sample_rate as f64 / 1000.0).round() as usize
}

/// Assign ascending candidate frequencies to the formant bands.
///
/// Each band takes the lowest remaining candidate inside it, and that
/// candidate is removed before the next band is searched. A band with no
/// candidate is left out, so the result may hold fewer than four values.
pub fn assign_formant_bands(candidates: &[f64]) -> Vec<f64> {
    let mut pool = candidates.to_vec();
    let mut formants = Vec::with_capacity(FORMANT_BANDS.len());

    for &(lo, hi) in &FORMANT_BANDS {
        if let Some(pos) = pool.iter().position(|&f| f >= lo && f <= hi) {
            formants.push(pool.remove(pos));
        }
    }
    formants
}

/// Formant frequencies of one analysis frame (already pre-emphasized).
pub fn frame_formants(
    frame: &[f32],
    sample_rate: u32,
    order: usize,
) -> std::result::Result<Vec<f64>, FrameSkip> {
    if frame.iter().any(|s| !s.is_finite()) {
        return Err(FrameSkip::NonFinite);
    }
    let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak < SILENCE_PEAK {
        return Err(FrameSkip::Silent);
    }

    let window = windowing::hamming(frame.len());
    let windowed: Vec<f64> = frame
        .iter()
        .zip(&window)
        .map(|(&s, &w)| s as f64 * w)
        .collect();

    let coefficients = lpc::lpc_coefficients(&windowed, order)?;
    let roots = lpc::polynomial_roots(&coefficients)?;
    let candidates = lpc::root_frequencies(&roots, sample_rate);

    let formants = assign_formant_bands(&candidates);
    if formants.is_empty() {
        return Err(FrameSkip::NoFormants);
    }
    Ok(formants)
}

/// Formant points for a segment of a larger signal.
///
/// Frames are `frame_length` long and start every `hop_length` samples;
/// only frames that fit entirely inside the segment are used. Energy is
/// measured on the raw segment and LPC runs on the (optionally)
/// pre-emphasized one. Each point sits at the frame centre, offset by
/// `start_offset` so positions refer to the full buffer.
///
/// Degenerate frames are skipped, never fatal.
pub fn extract(
    segment: &[f32],
    sample_rate: u32,
    hop_length: usize,
    start_offset: usize,
    pre_emphasis: bool,
) -> Result<Vec<FormantPoint>> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidParameter("sample rate must be > 0".into()));
    }
    if hop_length == 0 {
        return Err(AnalysisError::InvalidParameter("hop length must be > 0".into()));
    }

    let frame_len = frame_length(sample_rate);
    let order = lpc_order(sample_rate);
    if frame_len == 0 || segment.len() < frame_len {
        return Ok(Vec::new());
    }

    let emphasized = apply_pre_emphasis(segment, pre_emphasis);
    let starts: Vec<usize> = (0..=segment.len() - frame_len).step_by(hop_length).collect();

    let energies: Vec<f32> = starts
        .iter()
        .map(|&s| frame_rms(&segment[s..s + frame_len]))
        .collect();
    let max_energy = energies
        .iter()
        .copied()
        .filter(|e| e.is_finite())
        .fold(0.0f32, f32::max);
    let threshold = ENERGY_GATE * max_energy;

    let mut points = Vec::new();
    let mut skipped = 0usize;

    for (&start, &energy) in starts.iter().zip(&energies) {
        let result = if energy < threshold {
            Err(FrameSkip::Silent)
        } else {
            frame_formants(&emphasized[start..start + frame_len], sample_rate, order)
        };

        match result {
            Ok(frequencies) => points.push(FormantPoint {
                sample_position: start_offset + start + frame_len / 2,
                frequencies,
            }),
            Err(reason) => {
                log::trace!("formant frame at sample {} skipped: {reason:?}", start_offset + start);
                skipped += 1;
            }
        }
    }

    log::debug!(
        "formants: {} points from {} frames ({skipped} skipped), order {order}",
        points.len(),
        starts.len()
    );
    Ok(points)
}

/// Formant points for `start..end` of the buffer (the visible view).
pub fn extract_range(
    buffer: &SampleBuffer,
    start: usize,
    end: usize,
    hop_length: usize,
    pre_emphasis: bool,
) -> Result<Vec<FormantPoint>> {
    let segment = buffer.range(start, end)?;
    extract(segment, buffer.sample_rate(), hop_length, start, pre_emphasis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SR: u32 = 16000;

    /// Simple LCG for reproducible noise without pulling in rand.
    fn lcg_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) - 1.0
            })
            .collect()
    }

    /// Resonances at `formants` excited by a 120 Hz pulse train plus a little
    /// noise, built from a cascade of second-order resonators.
    fn synthetic_vowel(formants: &[f64], secs: f64) -> Vec<f32> {
        let n = (SR as f64 * secs) as usize;
        let period = (SR as f64 / 120.0) as usize;
        let noise = lcg_noise(n, 7);
        let mut signal: Vec<f64> = (0..n)
            .map(|i| if i % period == 0 { 1.0 } else { 0.0 } + 0.001 * noise[i])
            .collect();

        for &f in formants {
            let bandwidth = 80.0;
            let r = (-PI * bandwidth / SR as f64).exp();
            let theta = 2.0 * PI * f / SR as f64;
            let (a1, a2) = (2.0 * r * theta.cos(), -r * r);
            let (mut y1, mut y2) = (0.0, 0.0);
            for s in signal.iter_mut() {
                let y = *s + a1 * y1 + a2 * y2;
                y2 = y1;
                y1 = y;
                *s = y;
            }
        }

        let peak = signal.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        signal.iter().map(|s| (0.5 * s / peak) as f32).collect()
    }

    #[test]
    fn frame_geometry() {
        assert_eq!(frame_length(16000), 400);
        assert_eq!(frame_length(44100), 1103);
        assert_eq!(lpc_order(16000), 18);
        assert_eq!(lpc_order(44100), 46);
    }

    #[test]
    fn bands_take_lowest_candidate() {
        let f = assign_formant_bands(&[100.0, 300.0, 500.0, 1200.0, 2500.0, 3500.0]);
        assert_eq!(f, vec![300.0, 1200.0, 2500.0, 3500.0]);
    }

    #[test]
    fn shared_candidate_is_assigned_once() {
        // 800 Hz sits in both F1 (250-800) and F2 (800-2200)
        let f = assign_formant_bands(&[800.0, 2600.0]);
        assert_eq!(f, vec![800.0, 2600.0]);
        assert_eq!(f.iter().filter(|&&x| x == 800.0).count(), 1);
    }

    #[test]
    fn shared_candidate_starves_next_band() {
        // Only boundary candidates: F1 takes 800, F2 finds nothing else
        let f = assign_formant_bands(&[800.0]);
        assert_eq!(f, vec![800.0]);
    }

    #[test]
    fn missing_bands_are_left_out() {
        assert_eq!(assign_formant_bands(&[100.0, 1000.0, 5000.0]), vec![1000.0]);
        assert!(assign_formant_bands(&[]).is_empty());
    }

    #[test]
    fn silent_frame_is_skipped() {
        assert_eq!(frame_formants(&[0.0; 400], SR, 18), Err(FrameSkip::Silent));
    }

    #[test]
    fn non_finite_frame_is_skipped() {
        let mut frame = vec![0.1f32; 400];
        frame[3] = f32::INFINITY;
        assert_eq!(frame_formants(&frame, SR, 18), Err(FrameSkip::NonFinite));
    }

    #[test]
    fn recovers_vowel_formants() {
        let samples = synthetic_vowel(&[500.0, 1500.0, 2500.0, 3500.0], 0.3);
        let points = extract(&samples, SR, 160, 0, false).unwrap();
        assert!(!points.is_empty());

        let near = |p: &FormantPoint, target: f64, tol: f64| {
            p.frequencies.iter().any(|f| (f - target).abs() < tol)
        };
        let f1_hits = points.iter().filter(|p| near(p, 500.0, 80.0)).count();
        let f2_hits = points.iter().filter(|p| near(p, 1500.0, 150.0)).count();
        assert!(f1_hits * 2 > points.len(), "F1 found in {f1_hits}/{}", points.len());
        assert!(f2_hits * 2 > points.len(), "F2 found in {f2_hits}/{}", points.len());
    }

    #[test]
    fn points_are_frame_centres_with_offset() {
        let samples = synthetic_vowel(&[500.0, 1500.0], 0.1);
        let points = extract(&samples, SR, 160, 8000, false).unwrap();
        for p in &points {
            let start = p.sample_position - 8000 - 200;
            assert_eq!(start % 160, 0, "position {}", p.sample_position);
        }
        assert!(points.windows(2).all(|w| w[1].sample_position > w[0].sample_position));
    }

    #[test]
    fn every_frequency_lies_in_a_band() {
        let samples = synthetic_vowel(&[700.0, 1200.0, 2600.0], 0.2);
        for emphasis in [false, true] {
            for p in extract(&samples, SR, 80, 0, emphasis).unwrap() {
                assert!(p.frequencies.len() <= 4);
                for f in &p.frequencies {
                    assert!(FORMANT_BANDS.iter().any(|&(lo, hi)| *f >= lo && *f <= hi));
                }
            }
        }
    }

    #[test]
    fn quiet_frames_are_gated() {
        // Loud vowel followed by a faint copy at 1% amplitude
        let mut samples = synthetic_vowel(&[500.0, 1500.0], 0.2);
        let faint: Vec<f32> = samples.iter().map(|s| s * 0.01).collect();
        let loud_len = samples.len();
        samples.extend(faint);

        let points = extract(&samples, SR, 160, 0, false).unwrap();
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.sample_position < loud_len + 200));
    }

    #[test]
    fn silence_and_short_segments_yield_nothing() {
        assert!(extract(&[0.0; 8000], SR, 160, 0, false).unwrap().is_empty());
        assert!(extract(&[0.1; 100], SR, 160, 0, false).unwrap().is_empty());
        assert!(extract(&[], SR, 160, 0, true).unwrap().is_empty());
    }

    #[test]
    fn range_is_checked_against_buffer() {
        let buf = SampleBuffer::new(vec![0.0; 1000], SR).unwrap();
        assert!(matches!(
            extract_range(&buf, 500, 2000, 160, false),
            Err(AnalysisError::InvalidRange { .. })
        ));
        assert!(extract_range(&buf, 0, 1000, 160, false).unwrap().is_empty());
    }

    #[test]
    fn zero_hop_is_rejected() {
        assert!(extract(&[0.1; 1000], SR, 0, 0, false).is_err());
    }
}

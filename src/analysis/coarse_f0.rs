//! Coarse F0 range estimation.
//!
//! A quick low-rate pitch pass over the whole recording finds where the
//! speaker's voice actually sits, so the per-chunk pass searches a tight
//! range instead of the full user range (fewer octave errors at the edges).

use crate::audio::SampleBuffer;
use crate::dsp::contour::percentile;
use crate::dsp::pitch::{track_pitch, TrackerConfig};
use crate::dsp::resample::resample;
use crate::error::{AnalysisError, Result};

/// The coarse pass runs at telephone bandwidth; it only needs the pitch.
pub const COARSE_SAMPLE_RATE: u32 = 8000;
pub const COARSE_FRAME_LENGTH: usize = 1024;
pub const COARSE_HOP_LENGTH: usize = 512;
pub const COARSE_FMIN_HZ: f32 = 30.0;
pub const COARSE_FMAX_HZ: f32 = 1200.0;

/// Fewer voiced estimates than this and the user range is kept.
pub const MIN_VOICED_ESTIMATES: usize = 11;

pub const LOW_PERCENTILE: f64 = 0.05;
pub const HIGH_PERCENTILE: f64 = 0.95;

/// Margin added on both sides, as a fraction of the percentile spread.
pub const PADDING_FRACTION: f64 = 0.15;

/// Estimate the speaker's F0 range, never wider than the user's bounds.
///
/// Returns `(user_min_hz, user_max_hz)` unchanged when the coarse pass
/// finds too little voicing or fails in any way; this never errors.
pub fn estimate_range(buffer: &SampleBuffer, user_min_hz: f32, user_max_hz: f32) -> (f32, f32) {
    match coarse_range(buffer, user_min_hz, user_max_hz) {
        Ok(range) => {
            log::debug!(
                "coarse F0 range {:.1}..{:.1} Hz (user {:.1}..{:.1} Hz)",
                range.0,
                range.1,
                user_min_hz,
                user_max_hz
            );
            range
        }
        Err(err) => {
            log::debug!("coarse F0 estimate unavailable, keeping user range: {err}");
            (user_min_hz, user_max_hz)
        }
    }
}

fn coarse_range(buffer: &SampleBuffer, user_min_hz: f32, user_max_hz: f32) -> Result<(f32, f32)> {
    let low_rate = resample(buffer.samples(), buffer.sample_rate(), COARSE_SAMPLE_RATE)?;

    let config = TrackerConfig::new(
        COARSE_FMIN_HZ,
        COARSE_FMAX_HZ,
        COARSE_FRAME_LENGTH,
        COARSE_HOP_LENGTH,
    );
    let track = track_pitch(&low_rate, COARSE_SAMPLE_RATE, &config)?;

    let mut voiced: Vec<f64> = track.finite_values().into_iter().map(f64::from).collect();
    if voiced.len() < MIN_VOICED_ESTIMATES {
        return Err(AnalysisError::InsufficientVoicing(voiced.len()));
    }
    voiced.sort_by(|a, b| a.total_cmp(b));

    let (p_low, p_high) = match (
        percentile(&voiced, LOW_PERCENTILE),
        percentile(&voiced, HIGH_PERCENTILE),
    ) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(AnalysisError::InsufficientVoicing(0)),
    };

    Ok(clip_to_user_bounds(p_low, p_high, user_min_hz, user_max_hz))
}

/// Pad the percentile range by 15% of its spread and clip it to the user
/// bounds. If the clipped range collapses (the voice lies entirely outside
/// the user bounds), the user bounds are returned.
pub fn clip_to_user_bounds(p_low: f64, p_high: f64, user_min_hz: f32, user_max_hz: f32) -> (f32, f32) {
    let padding = PADDING_FRACTION * (p_high - p_low);
    let min_hz = (user_min_hz as f64).max(p_low - padding) as f32;
    let max_hz = (user_max_hz as f64).min(p_high + padding) as f32;

    if min_hz < max_hz {
        (min_hz, max_hz)
    } else {
        (user_min_hz, user_max_hz)
    }
}

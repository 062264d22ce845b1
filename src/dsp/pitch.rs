use std::ops::Range;

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::{framing, windowing};
use crate::error::{AnalysisError, Result};

/// Configuration for one frame-level pitch tracking pass.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Lowest accepted F0 in Hz.
    pub fmin_hz: f32,

    /// Highest accepted F0 in Hz.
    pub fmax_hz: f32,

    /// Analysis window in samples. Must hold at least two periods of
    /// `fmin_hz` for the autocorrelation to see a full cycle.
    pub frame_length: usize,

    /// Stride between frame centres in samples.
    pub hop_length: usize,

    /// McLeod power threshold; filters out low-energy frames (noise).
    pub power_threshold: f64,

    /// McLeod clarity threshold: how "confident" the detector must be.
    /// Range 0.0-1.0. 0.2 keeps breathy and creaky phonation.
    pub clarity_threshold: f64,

    /// Estimates up to this many semitones outside `[fmin_hz, fmax_hz]`
    /// are snapped onto the nearest bound instead of being dropped. A
    /// steady voice yields a coarse range only millihertz wide, narrower
    /// than the detector's own resolution.
    pub snap_semitones: f32,
}

impl TrackerConfig {
    pub fn new(fmin_hz: f32, fmax_hz: f32, frame_length: usize, hop_length: usize) -> Self {
        Self {
            fmin_hz,
            fmax_hz,
            frame_length,
            hop_length,
            power_threshold: 0.2,
            clarity_threshold: 0.2,
            snap_semitones: 1.0,
        }
    }

    /// Map a raw detector estimate onto the search range. `None` when it
    /// lies further outside than the snap tolerance.
    pub fn fit_to_range(&self, f: f32) -> Option<f32> {
        if !f.is_finite() {
            return None;
        }
        let tolerance = 2f32.powf(self.snap_semitones.max(0.0) / 12.0);
        if f < self.fmin_hz / tolerance || f > self.fmax_hz * tolerance {
            return None;
        }
        Some(f.clamp(self.fmin_hz, self.fmax_hz))
    }
}

/// Frame-level output of the tracker.
///
/// `voiced[i]` is true when the detector found a periodic pattern in frame
/// `i`. `f0_hz[i]` holds the estimate when it also falls inside the search
/// range (give or take the snap tolerance), NaN otherwise. A voiced frame can still carry NaN (an octave
/// jump outside the range), which voiced-run interpolation later bridges.
#[derive(Debug, Clone, Default)]
pub struct PitchTrack {
    pub f0_hz: Vec<f32>,
    pub voiced: Vec<bool>,
}

impl PitchTrack {
    pub fn len(&self) -> usize {
        self.f0_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.f0_hz.is_empty()
    }

    /// Finite F0 estimates only.
    pub fn finite_values(&self) -> Vec<f32> {
        self.f0_hz.iter().copied().filter(|f| f.is_finite()).collect()
    }
}

/// Track F0 over `samples` with centred frames.
///
/// Each frame is Hanning-windowed and handed to the McLeod Pitch Method,
/// which finds the period of repetition from a normalized autocorrelation
/// (the NSDF). It is robust to strong harmonics, which matters for voice.
///
/// Frame `i` is centred on sample `i * hop_length`, matching the spectrogram
/// and RMS framing.
pub fn track_pitch(samples: &[f32], sample_rate: u32, config: &TrackerConfig) -> Result<PitchTrack> {
    let n_frames = framing::frame_count(samples.len(), config.hop_length);
    track_pitch_frames(samples, sample_rate, config, 0..n_frames)
}

/// Track F0 for the frames in `frames` only, on the grid of the whole
/// signal: entry `k` of the result belongs to frame `frames.start + k`.
///
/// Frames read their real neighbours in `samples`, so a caller working
/// through a long signal piecewise gets the same values as one full pass.
pub fn track_pitch_frames(
    samples: &[f32],
    sample_rate: u32,
    config: &TrackerConfig,
    frames: Range<usize>,
) -> Result<PitchTrack> {
    validate(sample_rate, config)?;

    let mut track = PitchTrack {
        f0_hz: Vec::with_capacity(frames.len()),
        voiced: Vec::with_capacity(frames.len()),
    };
    if frames.is_empty() {
        return Ok(track);
    }

    let span = framing::frames_span(samples.len(), &frames, config.hop_length, config.frame_length);
    if let Some(pos) = samples[span.clone()].iter().position(|s| !s.is_finite()) {
        return Err(AnalysisError::NonFiniteSamples(span.start + pos));
    }

    // Half the detector size is the usual padding for the autocorrelation.
    let mut detector = McLeodDetector::<f64>::new(config.frame_length, config.frame_length / 2);
    let mut frame = vec![0.0f32; config.frame_length];

    for i in frames {
        framing::centered_frame_into(samples, i, config.hop_length, &mut frame);
        let windowed: Vec<f64> = windowing::hanning(&frame)
            .into_iter()
            .map(|s| s as f64)
            .collect();

        let pitch = detector.get_pitch(
            &windowed,
            sample_rate as usize,
            config.power_threshold,
            config.clarity_threshold,
        );

        match pitch {
            Some(p) => {
                track.voiced.push(true);
                track
                    .f0_hz
                    .push(config.fit_to_range(p.frequency as f32).unwrap_or(f32::NAN));
            }
            None => {
                track.voiced.push(false);
                track.f0_hz.push(f32::NAN);
            }
        }
    }

    Ok(track)
}

fn validate(sample_rate: u32, config: &TrackerConfig) -> Result<()> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidParameter("sample rate must be > 0".into()));
    }
    if config.frame_length < 4 {
        return Err(AnalysisError::InvalidParameter(format!(
            "pitch frame length {} is too short",
            config.frame_length
        )));
    }
    if config.hop_length == 0 {
        return Err(AnalysisError::InvalidParameter("hop length must be > 0".into()));
    }
    if !(config.fmin_hz > 0.0 && config.fmin_hz < config.fmax_hz) {
        return Err(AnalysisError::InvalidParameter(format!(
            "pitch range {}..{} Hz is empty",
            config.fmin_hz, config.fmax_hz
        )));
    }
    Ok(())
}

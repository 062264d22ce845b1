use serde::{Deserialize, Serialize};

use crate::dsp::framing;
use crate::error::{AnalysisError, Result};

/// Narrow-band analysis window (resolves harmonics). Also the base window
/// from which the render hop length is derived.
pub const NARROW_BAND_WINDOW_SECS: f64 = 0.035;

/// Wide-band analysis window (resolves glottal pulses).
pub const WIDE_BAND_WINDOW_SECS: f64 = 0.005;

/// Pitch and intensity analysis window.
pub const PITCH_WINDOW_SECS: f64 = 0.040;

pub const MIN_RENDER_DENSITY: u8 = 1;
pub const MAX_RENDER_DENSITY: u8 = 9;

/// Everything one analysis invocation needs to know, built fresh from the
/// configuration (and the session's hop-length snapshot) per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// First-order high-pass before analysis; boosts formant visibility
    /// for high-pitched voices.
    pub pre_emphasis: bool,

    /// User bounds on the F0 search, in Hz.
    pub f0_min_hz: f32,
    pub f0_max_hz: f32,

    /// When set, F0/intensity frames use exactly this hop so they land on
    /// the existing spectrogram's columns.
    pub forced_hop_length: Option<usize>,

    /// 1..=9; higher means more overlap and a finer time axis.
    pub render_density: u8,

    /// Selects the 5 ms (true) or 35 ms (false) spectrogram window.
    pub is_wide_band: bool,

    /// Progressive F0/intensity windowing.
    pub chunk_size_ms: u32,
    pub chunk_overlap_ms: u32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            pre_emphasis: false,
            f0_min_hz: 75.0,
            f0_max_hz: 600.0,
            forced_hop_length: None,
            render_density: 5,
            is_wide_band: false,
            chunk_size_ms: 3000,
            chunk_overlap_ms: 500,
        }
    }
}

impl AnalysisParams {
    /// Reject values no component can work with.
    ///
    /// An overlap at or above the chunk size is allowed on purpose: the
    /// chunk planner falls back to a one-hop step for it.
    pub fn validate(&self) -> Result<()> {
        if !(self.f0_min_hz.is_finite() && self.f0_max_hz.is_finite()) || self.f0_min_hz <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "F0 bounds must be positive and finite, got {}..{} Hz",
                self.f0_min_hz, self.f0_max_hz
            )));
        }
        if self.f0_min_hz >= self.f0_max_hz {
            return Err(AnalysisError::InvalidParameter(format!(
                "F0 minimum ({} Hz) must be below the maximum ({} Hz)",
                self.f0_min_hz, self.f0_max_hz
            )));
        }
        if !(MIN_RENDER_DENSITY..=MAX_RENDER_DENSITY).contains(&self.render_density) {
            return Err(AnalysisError::InvalidParameter(format!(
                "render density must be in {MIN_RENDER_DENSITY}..={MAX_RENDER_DENSITY}, got {}",
                self.render_density
            )));
        }
        if self.chunk_size_ms == 0 {
            return Err(AnalysisError::InvalidParameter(
                "chunk size must be > 0 ms".into(),
            ));
        }
        if self.forced_hop_length == Some(0) {
            return Err(AnalysisError::InvalidParameter(
                "forced hop length must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Hop length for F0/intensity: the forced value when a spectrogram
    /// exists, otherwise the density-derived render hop.
    pub fn resolve_hop_length(&self, sample_rate: u32) -> usize {
        match self.forced_hop_length {
            Some(hop) => hop,
            None => render_hop_length(sample_rate, self.render_density),
        }
    }
}

/// Hop length shared by the spectrogram and every overlay curve.
///
/// The 35 ms base window is rounded up to a power of two, then
/// overlap = 1 - 1/2^density, so hop = base / 2^density (at least 1).
/// Density 1 gives half-window hops; density 9 gives 1/512 of the window.
pub fn render_hop_length(sample_rate: u32, render_density: u8) -> usize {
    let density = render_density.clamp(MIN_RENDER_DENSITY, MAX_RENDER_DENSITY);
    let base_fft = framing::window_fft_size(sample_rate, NARROW_BAND_WINDOW_SECS);
    let overlap_ratio = 1.0 - 1.0 / 2f64.powi(density as i32);
    let hop = (base_fft as f64 * (1.0 - overlap_ratio)).round() as usize;
    hop.max(1)
}

/// FFT size of the spectrogram window for the chosen band mode.
pub fn spectrogram_fft_size(sample_rate: u32, is_wide_band: bool) -> usize {
    let secs = if is_wide_band {
        WIDE_BAND_WINDOW_SECS
    } else {
        NARROW_BAND_WINDOW_SECS
    };
    framing::window_fft_size(sample_rate, secs)
}

/// Frame length for pitch tracking and intensity (~40 ms, power of two).
pub fn pitch_frame_length(sample_rate: u32) -> usize {
    framing::window_fft_size(sample_rate, PITCH_WINDOW_SECS)
}

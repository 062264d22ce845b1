//! Short-time Fourier magnitude in dB.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use super::params;
use crate::audio::SampleBuffer;
use crate::dsp::emphasis::apply_pre_emphasis;
use crate::dsp::{framing, windowing};
use crate::error::{AnalysisError, Result};

/// Magnitudes below this are clamped before taking the log.
pub const AMPLITUDE_FLOOR: f32 = 1e-5;

/// Default dynamic range below the loudest bin.
pub const DEFAULT_TOP_DB: f32 = 80.0;

/// A rendered spectrogram: `n_bins` frequency rows by `n_frames` columns,
/// in dB relative to the loudest cell (0 dB).
#[derive(Debug, Clone, Serialize)]
pub struct SpectrogramImage {
    /// Row-major: bin `b`, frame `f` lives at `b * n_frames + f`.
    pub magnitude_db: Vec<f32>,
    pub n_bins: usize,
    pub n_frames: usize,
    /// Stride between columns in samples. Becomes the session's hop.
    pub hop_length: usize,
    pub n_fft: usize,
    pub sample_rate: u32,
}

impl SpectrogramImage {
    pub fn get(&self, bin: usize, frame: usize) -> Option<f32> {
        if bin >= self.n_bins || frame >= self.n_frames {
            return None;
        }
        self.magnitude_db.get(bin * self.n_frames + frame).copied()
    }

    /// Centre time of column `frame` in seconds.
    pub fn frame_time(&self, frame: usize) -> f64 {
        (frame * self.hop_length) as f64 / self.sample_rate as f64
    }

    /// Centre frequency of row `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.n_fft as f64
    }

    /// One frequency row, oldest frame first.
    pub fn row(&self, bin: usize) -> Option<&[f32]> {
        if bin >= self.n_bins {
            return None;
        }
        let start = bin * self.n_frames;
        self.magnitude_db.get(start..start + self.n_frames)
    }
}

/// Render the spectrogram of the whole buffer.
///
/// Frames are centred (frame `i` on sample `i * hop`), windowed with a
/// periodic Hann of `n_fft` samples, where `n_fft` is the next power of two
/// of 5 ms (wide band) or 35 ms (narrow band). The hop follows
/// `render_density` independently of the band mode.
pub fn render(
    buffer: &SampleBuffer,
    is_wide_band: bool,
    render_density: u8,
    pre_emphasis: bool,
    top_db: Option<f32>,
) -> Result<SpectrogramImage> {
    if !(params::MIN_RENDER_DENSITY..=params::MAX_RENDER_DENSITY).contains(&render_density) {
        return Err(AnalysisError::InvalidParameter(format!(
            "render density must be in {}..={}, got {render_density}",
            params::MIN_RENDER_DENSITY,
            params::MAX_RENDER_DENSITY
        )));
    }
    let hop_length = params::render_hop_length(buffer.sample_rate(), render_density);
    render_with_hop(buffer, is_wide_band, hop_length, pre_emphasis, top_db)
}

/// Render with a fixed hop, e.g. one an earlier F0/intensity pass has
/// already laid its frames on.
pub fn render_with_hop(
    buffer: &SampleBuffer,
    is_wide_band: bool,
    hop_length: usize,
    pre_emphasis: bool,
    top_db: Option<f32>,
) -> Result<SpectrogramImage> {
    if buffer.is_empty() {
        return Err(AnalysisError::EmptyBuffer);
    }
    if hop_length == 0 {
        return Err(AnalysisError::InvalidParameter("hop length must be > 0".into()));
    }
    let top_db = top_db.unwrap_or(DEFAULT_TOP_DB);
    if !(top_db.is_finite() && top_db > 0.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "top_db must be positive, got {top_db}"
        )));
    }

    let sample_rate = buffer.sample_rate();
    let n_fft = params::spectrogram_fft_size(sample_rate, is_wide_band);

    let samples = apply_pre_emphasis(buffer.samples(), pre_emphasis);
    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AnalysisError::NonFiniteSamples(pos));
    }

    let n_frames = framing::frame_count(samples.len(), hop_length);
    let n_bins = n_fft / 2 + 1;
    log::debug!(
        "spectrogram: n_fft {n_fft}, hop {hop_length}, {n_frames} frames x {n_bins} bins"
    );

    let window = windowing::hann_periodic(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut frame = vec![0.0f32; n_fft];
    let mut fft_buf = vec![Complex::new(0.0f32, 0.0); n_fft];
    let mut magnitude = vec![0.0f32; n_bins * n_frames];
    let mut peak = 0.0f32;

    for f in 0..n_frames {
        framing::centered_frame_into(&samples, f, hop_length, &mut frame);
        for ((slot, &s), &w) in fft_buf.iter_mut().zip(&frame).zip(&window) {
            *slot = Complex::new(s * w, 0.0);
        }
        fft.process(&mut fft_buf);

        for (b, c) in fft_buf.iter().take(n_bins).enumerate() {
            let m = c.norm();
            magnitude[b * n_frames + f] = m;
            peak = peak.max(m);
        }
    }

    let reference_db = 20.0 * peak.max(AMPLITUDE_FLOOR).log10();
    let floor_db = -top_db;
    let magnitude_db = magnitude
        .into_iter()
        .map(|m| (20.0 * m.max(AMPLITUDE_FLOOR).log10() - reference_db).max(floor_db))
        .collect();

    Ok(SpectrogramImage {
        magnitude_db,
        n_bins,
        n_frames,
        hop_length,
        n_fft,
        sample_rate,
    })
}

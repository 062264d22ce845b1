use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::spectrogram::SpectrogramImage;
use crate::analysis::tracks::{F0Track, FormantPoint, IntensityTrack};
use crate::analysis::AnalysisSession;

/// Spectrogram geometry; the dB matrix itself is left out of the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrogramInfo {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_bins: usize,
    pub n_frames: usize,
}

impl From<&SpectrogramImage> for SpectrogramInfo {
    fn from(image: &SpectrogramImage) -> Self {
        Self {
            n_fft: image.n_fft,
            hop_length: image.hop_length,
            n_bins: image.n_bins,
            n_frames: image.n_frames,
        }
    }
}

/// Headline numbers for the terminal summary and the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub frames: usize,
    pub voiced_fraction: f32,
    pub mean_f0_hz: Option<f32>,
    pub min_f0_hz: Option<f32>,
    pub max_f0_hz: Option<f32>,
    pub peak_intensity: Option<f32>,
    /// Time of the loudest frame on the session's hop grid.
    pub peak_intensity_secs: Option<f64>,
    pub formant_points: usize,
}

impl TrackSummary {
    pub fn from_session(session: &AnalysisSession) -> Self {
        let tracks = session.tracks();
        let range = tracks.f0_derived.range();
        let peak_intensity_secs = match (
            tracks.intensity.peak_frame(),
            session.hop_length(),
            session.buffer(),
        ) {
            (Some(frame), Some(hop), Some(buffer)) => Some(IntensityTrack::frame_time(
                frame,
                hop,
                buffer.sample_rate(),
            )),
            _ => None,
        };
        Self {
            frames: tracks.f0_derived.len(),
            voiced_fraction: tracks.f0_derived.voiced_fraction(),
            mean_f0_hz: tracks.f0_derived.mean(),
            min_f0_hz: range.map(|r| r.0),
            max_f0_hz: range.map(|r| r.1),
            peak_intensity: tracks.intensity.peak(),
            peak_intensity_secs,
            formant_points: session.formants().len(),
        }
    }
}

/// Everything one analysis produced, on the session's shared time axis.
/// Unvoiced F0 frames (NaN) serialize as `null`.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub source: Option<String>,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub hop_length: Option<usize>,
    pub spectrogram: Option<SpectrogramInfo>,
    pub summary: TrackSummary,
    pub f0_raw: &'a F0Track,
    pub f0_derived: &'a F0Track,
    pub intensity: &'a IntensityTrack,
    pub formants: &'a [FormantPoint],
}

impl<'a> AnalysisReport<'a> {
    /// `None` when the session has no audio loaded.
    pub fn from_session(session: &'a AnalysisSession, source: Option<&Path>) -> Option<Self> {
        let buffer = session.buffer()?;
        let tracks = session.tracks();
        Some(Self {
            source: source.map(|p| p.display().to_string()),
            sample_rate: buffer.sample_rate(),
            duration_secs: buffer.duration_secs(),
            hop_length: session.hop_length(),
            spectrogram: session.spectrogram().map(SpectrogramInfo::from),
            summary: TrackSummary::from_session(session),
            f0_raw: &tracks.f0_raw,
            f0_derived: &tracks.f0_derived,
            intensity: &tracks.intensity,
            formants: session.formants(),
        })
    }
}

/// Write the report as pretty-printed JSON.
pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::debug!("report written to {}", path.display());
    Ok(())
}

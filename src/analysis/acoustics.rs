//! Progressive F0 and intensity analysis over overlapping chunks.
//!
//! Each chunk is analysed in full (overlap included) but only the frames
//! that the next chunk will not recompute are emitted, so the caller can
//! append every result straight onto its tracks and draw as it goes. All
//! frames sit on the global grid (frame `i` at `i * hop`), so the appended
//! tracks line up with spectrogram columns at any chunk step.

use serde::Serialize;

use super::cancel::CancelToken;
use super::chunks::{Chunk, ChunkPlanner};
use super::coarse_f0;
use super::params::{self, AnalysisParams};
use crate::audio::SampleBuffer;
use crate::dsp::contour::interpolate_voiced_runs;
use crate::dsp::emphasis::apply_pre_emphasis;
use crate::dsp::intensity::rms_frames;
use crate::dsp::pitch::{track_pitch_frames, TrackerConfig};
use crate::error::{AnalysisError, Result};

/// The new frames of one chunk, already on the global time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkResult {
    pub index: usize,
    pub start_sample: usize,
    pub times: Vec<f64>,
    pub f0_raw: Vec<f32>,
    pub f0_derived: Vec<f32>,
    pub intensity: Vec<f32>,
}

/// Final event of an acoustics run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcousticsSummary {
    /// Hop length the frames were computed with; `None` when cancelled.
    pub hop_length: Option<usize>,
    pub chunks_emitted: usize,
    /// F0 search range actually used (after the coarse estimate).
    pub f0_range_hz: (f32, f32),
    pub cancelled: bool,
}

/// Run chunked F0/intensity analysis, handing each chunk to `on_chunk` in
/// increasing start order.
///
/// The cancel token is checked before every chunk. A failing chunk aborts
/// the run with its error; chunks already handed out stay handed out.
pub fn process<F>(
    buffer: &SampleBuffer,
    params: &AnalysisParams,
    cancel: &CancelToken,
    mut on_chunk: F,
) -> Result<AcousticsSummary>
where
    F: FnMut(ChunkResult),
{
    params.validate()?;
    if buffer.is_empty() {
        return Err(AnalysisError::EmptyBuffer);
    }

    let sample_rate = buffer.sample_rate();
    let hop_length = params.resolve_hop_length(sample_rate);
    let frame_length = params::pitch_frame_length(sample_rate);

    let (f0_min, f0_max) = coarse_f0::estimate_range(buffer, params.f0_min_hz, params.f0_max_hz);
    let tracker = TrackerConfig::new(f0_min, f0_max, frame_length, hop_length);

    let raw = buffer.samples();
    let emphasized = apply_pre_emphasis(raw, params.pre_emphasis);

    let planner = ChunkPlanner::new(
        buffer.len(),
        params.chunk_size_ms,
        params.chunk_overlap_ms,
        sample_rate,
        hop_length,
    );
    log::debug!(
        "acoustics: {} chunks of {} samples (step {}), hop {hop_length}, frame {frame_length}",
        planner.chunk_count(),
        planner.chunk_size(),
        planner.step()
    );

    let mut emitted = 0;
    for chunk in planner {
        if cancel.is_cancelled() {
            log::debug!("acoustics cancelled before chunk {}", chunk.index);
            return Ok(AcousticsSummary {
                hop_length: None,
                chunks_emitted: emitted,
                f0_range_hz: (f0_min, f0_max),
                cancelled: true,
            });
        }

        let result = analyze_chunk(raw, &emphasized, &chunk, sample_rate, &tracker)?;
        on_chunk(result);
        emitted += 1;
    }

    Ok(AcousticsSummary {
        hop_length: Some(hop_length),
        chunks_emitted: emitted,
        f0_range_hz: (f0_min, f0_max),
        cancelled: false,
    })
}

/// Analyse one chunk and keep its first `frames_to_emit` frames.
fn analyze_chunk(
    raw: &[f32],
    emphasized: &[f32],
    chunk: &Chunk,
    sample_rate: u32,
    tracker: &TrackerConfig,
) -> Result<ChunkResult> {
    let pitch = track_pitch_frames(emphasized, sample_rate, tracker, chunk.frames.clone())?;
    let mut f0_derived = interpolate_voiced_runs(&pitch.f0_hz, &pitch.voiced);
    let mut intensity = rms_frames(
        raw,
        tracker.frame_length,
        tracker.hop_length,
        chunk.frames.clone(),
    );
    let mut f0_raw = pitch.f0_hz;

    let n = chunk.frames_to_emit.min(f0_raw.len());
    f0_raw.truncate(n);
    f0_derived.truncate(n);
    intensity.truncate(n);

    let times = (chunk.frames.start..chunk.frames.start + n)
        .map(|i| (i * tracker.hop_length) as f64 / sample_rate as f64)
        .collect();

    Ok(ChunkResult {
        index: chunk.index,
        start_sample: chunk.start,
        times,
        f0_raw,
        f0_derived,
        intensity,
    })
}

//! Owns the loaded signal and every result derived from it.
//!
//! The session admits one background task at a time and folds the events
//! it sends back into its state. The spectrogram's hop length is the single
//! piece of shared mutable state: it is written only when a spectrogram
//! finishes and copied into each later task when that task is created.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use super::acoustics::ChunkResult;
use super::params::{self, AnalysisParams};
use super::spectrogram::SpectrogramImage;
use super::task::{
    spawn_task, AcousticsTask, AnalysisTask, CancelToken, FormantViewTask, LoadTask,
    SpectrogramTask, TaskEvent, TaskHandle, TaskKind,
};
use super::tracks::{F0Track, FormantPoint, IntensityTrack};
use crate::audio::{wav, SampleBuffer};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A {0:?} task is still running")]
    Busy(TaskKind),

    #[error("No audio loaded")]
    NoBuffer,
}

/// The three curves an acoustics run produces, on one time axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcousticTracks {
    pub f0_raw: F0Track,
    pub f0_derived: F0Track,
    pub intensity: IntensityTrack,
}

impl AcousticTracks {
    pub fn append_chunk(&mut self, chunk: &ChunkResult) {
        self.f0_raw.append(&chunk.times, &chunk.f0_raw);
        self.f0_derived.append(&chunk.times, &chunk.f0_derived);
        self.intensity.append(&chunk.intensity);
    }

    pub fn clear(&mut self) {
        self.f0_raw.clear();
        self.f0_derived.clear();
        self.intensity.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.f0_raw.is_empty()
    }
}

struct InFlight {
    kind: TaskKind,
    cancel: CancelToken,
}

#[derive(Default)]
pub struct AnalysisSession {
    buffer: Option<Arc<SampleBuffer>>,
    spectrogram: Option<SpectrogramImage>,
    hop_length: Option<usize>,
    tracks: AcousticTracks,
    live: AcousticTracks,
    formants: Vec<FormantPoint>,
    in_flight: Option<InFlight>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` on the current thread and make it the session's signal.
    pub fn load(&mut self, path: &Path) -> crate::error::Result<()> {
        let buffer = wav::load_buffer(path)?;
        self.set_buffer(buffer);
        Ok(())
    }

    /// Replace the signal. Every derived result belongs to the old signal
    /// and is dropped, including the authoritative hop length.
    pub fn set_buffer(&mut self, buffer: SampleBuffer) {
        log::debug!(
            "session buffer: {} samples at {} Hz",
            buffer.len(),
            buffer.sample_rate()
        );
        self.buffer = Some(Arc::new(buffer));
        self.spectrogram = None;
        self.hop_length = None;
        self.clear_derived();
    }

    /// `base` with the authoritative hop length filled in (or left unset
    /// when no spectrogram or acoustics run has fixed one yet).
    pub fn params_snapshot(&self, base: &AnalysisParams) -> AnalysisParams {
        AnalysisParams {
            forced_hop_length: self.hop_length,
            ..base.clone()
        }
    }

    pub fn load_task(&self, path: &Path) -> AnalysisTask {
        AnalysisTask::Load(LoadTask {
            path: path.to_path_buf(),
        })
    }

    pub fn spectrogram_task(
        &self,
        base: &AnalysisParams,
        top_db: Option<f32>,
    ) -> Result<AnalysisTask, SessionError> {
        Ok(AnalysisTask::Spectrogram(SpectrogramTask {
            buffer: self.require_buffer()?,
            is_wide_band: base.is_wide_band,
            render_density: base.render_density,
            // A hop fixed by acoustics alone is kept; a new spectrogram over
            // an existing one follows the density again.
            hop_length: self.hop_length.filter(|_| self.spectrogram.is_none()),
            pre_emphasis: base.pre_emphasis,
            top_db,
        }))
    }

    pub fn acoustics_task(&self, base: &AnalysisParams) -> Result<AnalysisTask, SessionError> {
        Ok(AnalysisTask::Acoustics(AcousticsTask {
            buffer: self.require_buffer()?,
            params: self.params_snapshot(base),
        }))
    }

    /// Formants for samples `start..end`, on the authoritative hop when
    /// there is one.
    pub fn formant_view_task(
        &self,
        base: &AnalysisParams,
        start: usize,
        end: usize,
        replace: bool,
    ) -> Result<AnalysisTask, SessionError> {
        let buffer = self.require_buffer()?;
        let hop_length = self.hop_length.unwrap_or_else(|| {
            params::render_hop_length(buffer.sample_rate(), base.render_density)
        });
        Ok(AnalysisTask::FormantView(FormantViewTask {
            buffer,
            start,
            end,
            hop_length,
            pre_emphasis: base.pre_emphasis,
            replace,
        }))
    }

    /// Start `task` in the background. Refused while another task runs.
    pub fn start(&mut self, task: AnalysisTask) -> Result<TaskHandle, SessionError> {
        if let Some(current) = &self.in_flight {
            return Err(SessionError::Busy(current.kind));
        }
        if task.kind() != TaskKind::Load && self.buffer.is_none() {
            return Err(SessionError::NoBuffer);
        }

        if task.kind() == TaskKind::Acoustics {
            self.live.clear();
        }

        let cancel = CancelToken::new();
        self.in_flight = Some(InFlight {
            kind: task.kind(),
            cancel: cancel.clone(),
        });
        log::debug!("starting {:?} task", task.kind());
        Ok(spawn_task(task, cancel))
    }

    /// Fold one event from the running task into the session.
    pub fn apply(&mut self, event: TaskEvent) {
        let kind = self.in_flight.as_ref().map(|f| f.kind);
        if event.is_terminal() {
            self.in_flight = None;
        }

        match event {
            TaskEvent::Loaded(buffer) => self.set_buffer(buffer),
            TaskEvent::ChunkFinished(chunk) => self.live.append_chunk(&chunk),
            TaskEvent::AcousticsFinished(summary) => {
                // A cancelled run keeps the chunks it already delivered.
                self.tracks = std::mem::take(&mut self.live);
                if self.hop_length.is_none() {
                    self.hop_length = summary.hop_length;
                }
            }
            TaskEvent::SpectrogramFinished(image) => {
                log::debug!("spectrogram hop {} is now authoritative", image.hop_length);
                self.hop_length = Some(image.hop_length);
                self.spectrogram = Some(image);
                self.clear_derived();
            }
            TaskEvent::FormantsFinished { points, replace } => {
                if replace {
                    self.formants = points;
                } else {
                    self.formants.extend(points);
                }
            }
            TaskEvent::Failed(message) => {
                log::warn!("{kind:?} task failed: {message}");
                if kind == Some(TaskKind::Acoustics) {
                    self.live.clear();
                }
            }
        }
    }

    /// Ask the running task to stop. Only acoustics runs check the flag,
    /// between chunks; other tasks run to completion.
    pub fn cancel(&self) {
        if let Some(current) = &self.in_flight {
            current.cancel.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn running(&self) -> Option<TaskKind> {
        self.in_flight.as_ref().map(|f| f.kind)
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_deref()
    }

    pub fn spectrogram(&self) -> Option<&SpectrogramImage> {
        self.spectrogram.as_ref()
    }

    pub fn hop_length(&self) -> Option<usize> {
        self.hop_length
    }

    /// Tracks of the last finished acoustics run.
    pub fn tracks(&self) -> &AcousticTracks {
        &self.tracks
    }

    /// Tracks of the run in progress, growing chunk by chunk.
    pub fn live_tracks(&self) -> &AcousticTracks {
        &self.live
    }

    pub fn formants(&self) -> &[FormantPoint] {
        &self.formants
    }

    /// Run `task` and apply every event it sends until it finishes.
    ///
    /// `on_event` sees each event before it is applied.
    pub fn run_to_completion<F>(
        &mut self,
        task: AnalysisTask,
        mut on_event: F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(&TaskEvent),
    {
        let handle = self.start(task)?;
        while let Some(event) = handle.next() {
            on_event(&event);
            self.apply(event);
        }
        Ok(())
    }

    fn require_buffer(&self) -> Result<Arc<SampleBuffer>, SessionError> {
        self.buffer.clone().ok_or(SessionError::NoBuffer)
    }

    fn clear_derived(&mut self) {
        self.tracks.clear();
        self.live.clear();
        self.formants.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::acoustics::AcousticsSummary;
    use std::f32::consts::PI;

    const SR: u32 = 16000;

    fn voice(secs: f32) -> SampleBuffer {
        let n = (SR as f32 * secs) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / SR as f32;
                0.4 * (2.0 * PI * 160.0 * t).sin() + 0.2 * (2.0 * PI * 320.0 * t).sin()
            })
            .collect();
        SampleBuffer::new(samples, SR).unwrap()
    }

    fn base() -> AnalysisParams {
        AnalysisParams {
            chunk_size_ms: 500,
            chunk_overlap_ms: 100,
            render_density: 4,
            ..AnalysisParams::default()
        }
    }

    fn chunk(index: usize, t0: f64) -> ChunkResult {
        ChunkResult {
            index,
            start_sample: (t0 * SR as f64) as usize,
            times: vec![t0, t0 + 0.01],
            f0_raw: vec![150.0, f32::NAN],
            f0_derived: vec![150.0, 151.0],
            intensity: vec![0.1, 0.2],
        }
    }

    fn summary(hop: Option<usize>, cancelled: bool) -> AcousticsSummary {
        AcousticsSummary {
            hop_length: hop,
            chunks_emitted: 0,
            f0_range_hz: (75.0, 600.0),
            cancelled,
        }
    }

    fn point(pos: usize) -> FormantPoint {
        FormantPoint {
            sample_position: pos,
            frequencies: vec![500.0, 1500.0],
        }
    }

    #[test]
    fn tasks_need_a_buffer() {
        let mut session = AnalysisSession::new();
        assert_eq!(session.acoustics_task(&base()).unwrap_err(), SessionError::NoBuffer);
        assert_eq!(
            session.spectrogram_task(&base(), None).unwrap_err(),
            SessionError::NoBuffer
        );

        // A task built for another session still needs this one's buffer
        let mut other = AnalysisSession::new();
        other.set_buffer(voice(0.2));
        let task = other.acoustics_task(&base()).unwrap();
        assert_eq!(session.start(task).err(), Some(SessionError::NoBuffer));
    }

    #[test]
    fn second_task_is_refused_while_busy() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(2.0));

        let handle = session.start(session.acoustics_task(&base()).unwrap()).unwrap();
        assert!(session.is_busy());

        let again = session.spectrogram_task(&base(), None).unwrap();
        assert_eq!(session.start(again).err(), Some(SessionError::Busy(TaskKind::Acoustics)));

        while let Some(event) = handle.next() {
            session.apply(event);
        }
        assert!(!session.is_busy());
        assert!(session.spectrogram_task(&base(), None).is_ok());
    }

    #[test]
    fn snapshot_carries_authoritative_hop() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        assert_eq!(session.params_snapshot(&base()).forced_hop_length, None);

        session.apply(TaskEvent::SpectrogramFinished(SpectrogramImage {
            magnitude_db: vec![0.0; 6],
            n_bins: 2,
            n_frames: 3,
            hop_length: 77,
            n_fft: 2,
            sample_rate: SR,
        }));
        let snapshot = session.params_snapshot(&base());
        assert_eq!(snapshot.forced_hop_length, Some(77));
        assert_eq!(snapshot.render_density, base().render_density);
    }

    #[test]
    fn chunks_stitch_then_commit() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));

        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::ChunkFinished(chunk(1, 0.02)));
        assert_eq!(session.live_tracks().f0_raw.len(), 4);
        assert!(session.tracks().is_empty());

        session.apply(TaskEvent::AcousticsFinished(summary(Some(64), false)));
        assert_eq!(session.tracks().f0_derived.values, vec![150.0, 151.0, 150.0, 151.0]);
        assert_eq!(session.tracks().intensity.len(), 4);
        assert!(session.live_tracks().is_empty());
        assert_eq!(session.hop_length(), Some(64));
    }

    #[test]
    fn acoustics_does_not_override_spectrogram_hop() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::SpectrogramFinished(SpectrogramImage {
            magnitude_db: vec![],
            n_bins: 0,
            n_frames: 0,
            hop_length: 32,
            n_fft: 1024,
            sample_rate: SR,
        }));
        session.apply(TaskEvent::AcousticsFinished(summary(Some(128), false)));
        assert_eq!(session.hop_length(), Some(32));
    }

    #[test]
    fn spectrogram_reuses_hop_fixed_by_acoustics() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::AcousticsFinished(summary(Some(100), false)));

        let task = session.spectrogram_task(&base(), None).unwrap();
        match &task {
            AnalysisTask::Spectrogram(spec) => assert_eq!(spec.hop_length, Some(100)),
            other => panic!("unexpected task {other:?}"),
        }
        session.run_to_completion(task, |_| {}).unwrap();
        assert_eq!(session.spectrogram().map(|s| s.hop_length), Some(100));
        assert_eq!(session.hop_length(), Some(100));

        // Re-rendering over an existing spectrogram follows the density
        match session.spectrogram_task(&base(), None).unwrap() {
            AnalysisTask::Spectrogram(spec) => assert_eq!(spec.hop_length, None),
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn cancelled_run_keeps_partial_tracks() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::AcousticsFinished(summary(None, true)));
        assert_eq!(session.tracks().f0_raw.len(), 2);
        assert_eq!(session.hop_length(), None);
    }

    #[test]
    fn failed_run_discards_live_tracks_only() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::AcousticsFinished(summary(Some(64), false)));
        session.apply(TaskEvent::FormantsFinished {
            points: vec![point(100)],
            replace: true,
        });

        // Second run fails after one chunk
        session.in_flight = Some(InFlight {
            kind: TaskKind::Acoustics,
            cancel: CancelToken::new(),
        });
        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::Failed("boom".into()));

        assert!(session.live_tracks().is_empty());
        assert_eq!(session.tracks().f0_raw.len(), 2);
        assert_eq!(session.formants().len(), 1);
        assert!(!session.is_busy());
    }

    #[test]
    fn new_spectrogram_clears_derived_data() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::AcousticsFinished(summary(Some(64), false)));
        session.apply(TaskEvent::FormantsFinished {
            points: vec![point(100)],
            replace: true,
        });

        session.apply(TaskEvent::SpectrogramFinished(SpectrogramImage {
            magnitude_db: vec![],
            n_bins: 0,
            n_frames: 0,
            hop_length: 16,
            n_fft: 1024,
            sample_rate: SR,
        }));
        assert!(session.tracks().is_empty());
        assert!(session.formants().is_empty());
        assert_eq!(session.hop_length(), Some(16));
    }

    #[test]
    fn formants_replace_or_append() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::FormantsFinished {
            points: vec![point(100), point(200)],
            replace: true,
        });
        session.apply(TaskEvent::FormantsFinished {
            points: vec![point(300)],
            replace: false,
        });
        assert_eq!(session.formants().len(), 3);

        session.apply(TaskEvent::FormantsFinished {
            points: vec![point(400)],
            replace: true,
        });
        assert_eq!(session.formants(), &[point(400)]);
    }

    #[test]
    fn new_buffer_resets_everything() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(0.5));
        session.apply(TaskEvent::ChunkFinished(chunk(0, 0.0)));
        session.apply(TaskEvent::AcousticsFinished(summary(Some(64), false)));

        session.set_buffer(voice(0.3));
        assert!(session.tracks().is_empty());
        assert_eq!(session.hop_length(), None);
        assert!(session.spectrogram().is_none());
    }

    #[test]
    fn end_to_end_curves_share_spectrogram_axis() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(1.5));

        let task = session.spectrogram_task(&base(), None).unwrap();
        session.run_to_completion(task, |_| {}).unwrap();
        let hop = session.hop_length().unwrap();
        let image_frames = session.spectrogram().unwrap().n_frames;

        // A different density would derive a different hop; the snapshot wins
        let changed = AnalysisParams {
            render_density: 7,
            ..base()
        };
        let mut chunks = 0;
        let task = session.acoustics_task(&changed).unwrap();
        session
            .run_to_completion(task, |e| {
                if matches!(e, TaskEvent::ChunkFinished(_)) {
                    chunks += 1;
                }
            })
            .unwrap();

        let tracks = session.tracks();
        assert_eq!(session.hop_length(), Some(hop));
        assert!(chunks > 1);
        let period = hop as f64 / SR as f64;
        for (i, t) in tracks.f0_raw.times.iter().enumerate() {
            assert!((t - i as f64 * period).abs() < 1e-9, "frame {i} at {t}");
        }
        assert_eq!(tracks.f0_raw.len(), image_frames);
        assert_eq!(tracks.intensity.len(), image_frames);
        assert!(tracks.f0_derived.mean().is_some());

        let task = session.formant_view_task(&changed, 0, 8000, true).unwrap();
        match &task {
            AnalysisTask::FormantView(view) => assert_eq!(view.hop_length, hop),
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn cancel_reaches_running_task() {
        let mut session = AnalysisSession::new();
        session.set_buffer(voice(20.0));
        let params = AnalysisParams {
            chunk_size_ms: 100,
            chunk_overlap_ms: 0,
            ..base()
        };
        let handle = session.start(session.acoustics_task(&params).unwrap()).unwrap();
        // The worker is still in its coarse pass over 20 s of audio
        session.cancel();

        let mut summary = None;
        while let Some(event) = handle.next() {
            if let TaskEvent::AcousticsFinished(s) = &event {
                summary = Some(s.clone());
            }
            session.apply(event);
        }

        let summary = summary.unwrap();
        assert!(summary.cancelled);
        assert!(summary.chunks_emitted < 200);
        // 1600-sample steps at a 64-sample hop
        assert_eq!(session.tracks().f0_raw.len(), summary.chunks_emitted * 25);
        assert!(!session.is_busy());
    }
}

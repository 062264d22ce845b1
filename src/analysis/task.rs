use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use super::acoustics::{self, AcousticsSummary, ChunkResult};
use super::formants;
use super::params::AnalysisParams;
use super::spectrogram::{self, SpectrogramImage};
use super::tracks::FormantPoint;
use crate::audio::{wav, SampleBuffer};
use crate::error::Result;

pub use super::cancel::CancelToken;

/// Which kind of task is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Load,
    Spectrogram,
    Acoustics,
    FormantView,
}

/// Everything a background task reports, in the order it happens.
///
/// A task sends any number of `ChunkFinished` events (acoustics only)
/// followed by exactly one terminal event: its `*Finished` variant or
/// `Failed`.
#[derive(Debug)]
pub enum TaskEvent {
    Loaded(SampleBuffer),
    ChunkFinished(ChunkResult),
    AcousticsFinished(AcousticsSummary),
    SpectrogramFinished(SpectrogramImage),
    FormantsFinished {
        points: Vec<FormantPoint>,
        replace: bool,
    },
    Failed(String),
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::ChunkFinished(_))
    }
}

/// Decode a WAV file into a mono buffer.
#[derive(Debug, Clone)]
pub struct LoadTask {
    pub path: PathBuf,
}

impl LoadTask {
    pub fn run(&self) -> Result<TaskEvent> {
        wav::load_buffer(&self.path).map(TaskEvent::Loaded)
    }
}

/// Render the full-signal spectrogram.
#[derive(Debug, Clone)]
pub struct SpectrogramTask {
    pub buffer: Arc<SampleBuffer>,
    pub is_wide_band: bool,
    pub render_density: u8,
    /// Hop fixed by an earlier acoustics run; overrides `render_density`.
    pub hop_length: Option<usize>,
    pub pre_emphasis: bool,
    pub top_db: Option<f32>,
}

impl SpectrogramTask {
    pub fn run(&self) -> Result<TaskEvent> {
        let image = match self.hop_length {
            Some(hop) => spectrogram::render_with_hop(
                &self.buffer,
                self.is_wide_band,
                hop,
                self.pre_emphasis,
                self.top_db,
            ),
            None => spectrogram::render(
                &self.buffer,
                self.is_wide_band,
                self.render_density,
                self.pre_emphasis,
                self.top_db,
            ),
        };
        image.map(TaskEvent::SpectrogramFinished)
    }
}

/// Chunked F0 and intensity; the only task that reports progress.
#[derive(Debug, Clone)]
pub struct AcousticsTask {
    pub buffer: Arc<SampleBuffer>,
    /// Snapshot taken when the task was created; the hop length in it
    /// does not change for the lifetime of the run.
    pub params: AnalysisParams,
}

impl AcousticsTask {
    pub fn run<F>(&self, cancel: &CancelToken, on_chunk: F) -> Result<TaskEvent>
    where
        F: FnMut(ChunkResult),
    {
        acoustics::process(&self.buffer, &self.params, cancel, on_chunk)
            .map(TaskEvent::AcousticsFinished)
    }
}

/// Formants over a sample range, usually the visible view.
#[derive(Debug, Clone)]
pub struct FormantViewTask {
    pub buffer: Arc<SampleBuffer>,
    pub start: usize,
    pub end: usize,
    pub hop_length: usize,
    pub pre_emphasis: bool,
    /// Replace the session's formant points instead of appending.
    pub replace: bool,
}

impl FormantViewTask {
    pub fn run(&self) -> Result<TaskEvent> {
        let points = formants::extract_range(
            &self.buffer,
            self.start,
            self.end,
            self.hop_length,
            self.pre_emphasis,
        )?;
        Ok(TaskEvent::FormantsFinished {
            points,
            replace: self.replace,
        })
    }
}

/// One unit of background work.
#[derive(Debug, Clone)]
pub enum AnalysisTask {
    Load(LoadTask),
    Spectrogram(SpectrogramTask),
    Acoustics(AcousticsTask),
    FormantView(FormantViewTask),
}

impl AnalysisTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            AnalysisTask::Load(_) => TaskKind::Load,
            AnalysisTask::Spectrogram(_) => TaskKind::Spectrogram,
            AnalysisTask::Acoustics(_) => TaskKind::Acoustics,
            AnalysisTask::FormantView(_) => TaskKind::FormantView,
        }
    }

    /// Run to completion on the current thread, passing progress events to
    /// `emit`, and return the terminal event.
    pub fn run<F>(&self, cancel: &CancelToken, mut emit: F) -> TaskEvent
    where
        F: FnMut(TaskEvent),
    {
        let result = match self {
            AnalysisTask::Load(task) => task.run(),
            AnalysisTask::Spectrogram(task) => task.run(),
            AnalysisTask::Acoustics(task) => {
                task.run(cancel, |chunk| emit(TaskEvent::ChunkFinished(chunk)))
            }
            AnalysisTask::FormantView(task) => task.run(),
        };

        result.unwrap_or_else(|err| {
            log::debug!("{:?} task failed: {err}", self.kind());
            TaskEvent::Failed(err.to_string())
        })
    }
}

/// Receiving end of a task running on a background thread.
pub struct TaskHandle {
    kind: TaskKind,
    cancel: CancelToken,
    rx: mpsc::Receiver<TaskEvent>,
    _handle: std::thread::JoinHandle<()>,
}

impl TaskHandle {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Receive the next event, blocking until one is available.
    ///
    /// Returns `None` once the worker has sent its terminal event and exited.
    pub fn next(&self) -> Option<TaskEvent> {
        self.rx.recv().ok()
    }

    /// Receive an event if one is already waiting.
    pub fn try_next(&self) -> Option<TaskEvent> {
        self.rx.try_recv().ok()
    }
}

/// Run `task` on a new thread, streaming its events over a channel.
pub fn spawn_task(task: AnalysisTask, cancel: CancelToken) -> TaskHandle {
    let (tx, rx) = mpsc::channel();
    let kind = task.kind();
    let worker_cancel = cancel.clone();

    let handle = std::thread::spawn(move || {
        let progress = tx.clone();
        let last = task.run(&worker_cancel, |event| {
            // Receiver gone: nobody is listening, keep going quietly
            let _ = progress.send(event);
        });
        let _ = tx.send(last);
    });

    TaskHandle {
        kind,
        cancel,
        rx,
        _handle: handle,
    }
}

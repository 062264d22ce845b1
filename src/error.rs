//! Error types for the analysis engine.
//!
//! Engine code returns `crate::error::Result<T>`. The command-line layer
//! wraps these in `anyhow` with file/context information.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures that abort an analysis task.
///
/// Recoverable per-frame conditions (silent LPC frames, a coarse pitch pass
/// with too little voicing) never surface here; they are handled inside the
/// component that encounters them.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A parameter is outside the range the engine can work with.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sample buffer has no samples to analyze.
    #[error("Sample buffer is empty")]
    EmptyBuffer,

    /// A requested sample range does not fit inside the buffer.
    #[error("Invalid sample range {start}..{end} for a buffer of {len} samples")]
    InvalidRange { start: usize, end: usize, len: usize },

    /// The pitch tracker was handed NaN or infinite samples.
    #[error("Signal contains non-finite samples near sample {0}")]
    NonFiniteSamples(usize),

    /// Too few voiced frames to say anything about the pitch range.
    #[error("Only {0} voiced frames found")]
    InsufficientVoicing(usize),

    /// The WAV decoder rejected the file.
    #[error("Failed to decode WAV audio: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Acoustic analysis engine for recorded speech: spectrograms, chunked F0
//! and intensity tracking, and LPC formant estimation, coordinated by a
//! session that runs one background task at a time.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;
pub mod paths;
pub mod report;

pub use error::{AnalysisError, Result};

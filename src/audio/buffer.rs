use crate::error::{AnalysisError, Result};

/// Decoded mono audio: the one input every analysis reads from.
///
/// Immutable once built. The session wraps it in an `Arc` and hands
/// read-only references to background tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidParameter(
                "sample rate must be > 0".into(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index nearest to `secs`, clamped to the buffer.
    pub fn sample_at(&self, secs: f64) -> usize {
        let idx = (secs.max(0.0) * self.sample_rate as f64).round() as usize;
        idx.min(self.samples.len())
    }

    /// Borrow `start..end`, failing if the range does not fit.
    pub fn range(&self, start: usize, end: usize) -> Result<&[f32]> {
        if start > end || end > self.samples.len() {
            return Err(AnalysisError::InvalidRange {
                start,
                end,
                len: self.samples.len(),
            });
        }
        Ok(&self.samples[start..end])
    }
}

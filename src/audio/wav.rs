use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::buffer::SampleBuffer;
use crate::error::Result;

/// Decode a WAV file into a mono `SampleBuffer` with samples in [-1.0, 1.0].
///
/// Multi-channel files are mixed down by averaging each frame's channels;
/// the analyses only ever look at one signal.
pub fn load_buffer(path: &Path) -> Result<SampleBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()?
        }
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<Vec<_>>>()?,
    };

    let samples = mix_to_mono(&interleaved, spec.channels.max(1) as usize);
    log::debug!(
        "decoded {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    SampleBuffer::new(samples, spec.sample_rate)
}

/// Average interleaved frames down to one channel.
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

pub mod buffer;
pub mod wav;

pub use buffer::SampleBuffer;

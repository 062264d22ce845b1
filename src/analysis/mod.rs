pub mod acoustics;
pub mod cancel;
pub mod chunks;
pub mod coarse_f0;
pub mod formants;
pub mod params;
pub mod session;
pub mod spectrogram;
pub mod task;
pub mod tracks;

pub use params::AnalysisParams;
pub use session::AnalysisSession;

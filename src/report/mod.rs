pub mod chart;
pub mod export;

pub use chart::render_chart;
pub use export::{write_json, AnalysisReport, TrackSummary};

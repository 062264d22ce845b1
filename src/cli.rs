use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use phonacq::config::AnalysisConfig;

#[derive(Parser)]
#[command(name = "phonacq")]
#[command(about = "Acoustic analysis of speech recordings: spectrogram, F0, intensity and formants")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full analysis on a WAV file
    Analyze {
        /// WAV file to analyze
        wav: PathBuf,

        /// Formant view as START:END in seconds; repeat to add more views
        /// (later views append their points). Default: the whole file.
        #[arg(long = "view", value_parser = parse_view)]
        views: Vec<(f64, f64)>,

        /// Write the results as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write a spectrogram chart with F0 and formant overlays
        #[arg(long)]
        png: Option<PathBuf>,

        #[command(flatten)]
        overrides: AnalysisOverrides,
    },

    /// Print the coarse F0 search range of a recording
    Range {
        wav: PathBuf,

        #[command(flatten)]
        overrides: AnalysisOverrides,
    },

    /// Print formant points of a time window
    Formants {
        wav: PathBuf,

        /// Window start in seconds
        #[arg(long)]
        from: f64,

        /// Window end in seconds
        #[arg(long)]
        to: f64,

        #[command(flatten)]
        overrides: AnalysisOverrides,
    },

    /// Show where the configuration lives
    Paths,

    /// Print the effective configuration as TOML
    Config,
}

/// Per-invocation overrides of the `[analysis]` config section.
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisOverrides {
    /// Apply pre-emphasis before analysis
    #[arg(long)]
    pub pre_emphasis: bool,

    /// Use the 5 ms wide-band spectrogram window
    #[arg(long)]
    pub wide_band: bool,

    /// Render density 1-9 (higher = finer time axis)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=9))]
    pub density: Option<u8>,

    /// Lower F0 bound in Hz
    #[arg(long)]
    pub f0_min: Option<f32>,

    /// Upper F0 bound in Hz
    #[arg(long)]
    pub f0_max: Option<f32>,

    /// Chunk size for progressive F0 analysis, in ms
    #[arg(long)]
    pub chunk_ms: Option<u32>,

    /// Overlap between chunks, in ms
    #[arg(long)]
    pub overlap_ms: Option<u32>,
}

/// Parse `START:END` (seconds) into a time window.
fn parse_view(s: &str) -> Result<(f64, f64), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|e| format!("bad start '{start}': {e}"))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|e| format!("bad end '{end}': {e}"))?;
    if !(start >= 0.0 && end > start) {
        return Err(format!("view {start}:{end} is empty or negative"));
    }
    Ok((start, end))
}

impl AnalysisOverrides {
    /// A copy of `base` with every given flag applied. Boolean flags only
    /// switch features on.
    pub fn apply(&self, base: &AnalysisConfig) -> AnalysisConfig {
        AnalysisConfig {
            pre_emphasis: base.pre_emphasis || self.pre_emphasis,
            wide_band: base.wide_band || self.wide_band,
            render_density: self.density.unwrap_or(base.render_density),
            f0_min_hz: self.f0_min.unwrap_or(base.f0_min_hz),
            f0_max_hz: self.f0_max.unwrap_or(base.f0_max_hz),
            chunk_size_ms: self.chunk_ms.unwrap_or(base.chunk_size_ms),
            chunk_overlap_ms: self.overlap_ms.unwrap_or(base.chunk_overlap_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_overrides() {
        let cli = Cli::try_parse_from([
            "phonacq",
            "analyze",
            "a.wav",
            "--view",
            "0.5:1.25",
            "--view",
            "2:3",
            "--density",
            "7",
            "--wide-band",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze {
                wav,
                views,
                overrides,
                ..
            } => {
                assert_eq!(wav, PathBuf::from("a.wav"));
                assert_eq!(views, vec![(0.5, 1.25), (2.0, 3.0)]);
                assert_eq!(overrides.density, Some(7));
                assert!(overrides.wide_band);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn view_must_be_a_window() {
        assert!(parse_view("1.0").is_err());
        assert!(parse_view("2:1").is_err());
        assert!(parse_view("-1:1").is_err());
        assert_eq!(parse_view(" 0 : 0.5 "), Ok((0.0, 0.5)));
    }

    #[test]
    fn density_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["phonacq", "range", "a.wav", "--density", "12"]).is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let base = AnalysisConfig::default();
        let overrides = AnalysisOverrides {
            f0_min: Some(100.0),
            pre_emphasis: true,
            ..AnalysisOverrides::default()
        };
        let merged = overrides.apply(&base);
        assert_eq!(merged.f0_min_hz, 100.0);
        assert_eq!(merged.f0_max_hz, base.f0_max_hz);
        assert!(merged.pre_emphasis);
        assert_eq!(merged.render_density, base.render_density);
    }

    #[test]
    fn formants_requires_window() {
        assert!(Cli::try_parse_from(["phonacq", "formants", "a.wav", "--from", "1.0"]).is_err());
    }
}

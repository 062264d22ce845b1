use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisParams;
use crate::paths::AppPaths;

/// Application configuration, loaded from `<config_dir>/config.toml`.
///
/// Every section is `#[serde(default)]`, so a partial file (or no file at
/// all) fills the gaps from the `Default` impls below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pre_emphasis: bool,
    pub f0_min_hz: f32,
    pub f0_max_hz: f32,
    /// 1..=9; each step halves the hop length.
    pub render_density: u8,
    pub wide_band: bool,
    pub chunk_size_ms: u32,
    pub chunk_overlap_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Dynamic range of the spectrogram below its loudest cell.
    pub top_db: f32,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Upper edge of the chart's frequency axis.
    pub max_chart_hz: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pre_emphasis: false,
            f0_min_hz: 75.0,
            f0_max_hz: 600.0,
            render_density: 5,
            wide_band: false,
            chunk_size_ms: 3000,
            chunk_overlap_ms: 500,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_db: 80.0,
            chart_width: 1400,
            chart_height: 600,
            max_chart_hz: 5000.0,
        }
    }
}

/// Bridge from the user-facing config to the engine's parameter record.
/// The hop length is never configured; the session supplies it.
impl From<&AnalysisConfig> for AnalysisParams {
    fn from(cfg: &AnalysisConfig) -> Self {
        AnalysisParams {
            pre_emphasis: cfg.pre_emphasis,
            f0_min_hz: cfg.f0_min_hz,
            f0_max_hz: cfg.f0_max_hz,
            forced_hop_length: None,
            render_density: cfg.render_density,
            is_wide_band: cfg.wide_band,
            chunk_size_ms: cfg.chunk_size_ms,
            chunk_overlap_ms: cfg.chunk_overlap_ms,
        }
    }
}

/// Load the config from its standard location. Missing file: defaults.
pub fn load_config(paths: &AppPaths) -> Result<AppConfig> {
    load_config_from(&paths.config_file())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    AnalysisParams::from(&config.analysis)
        .validate()
        .with_context(|| format!("Invalid [analysis] section in {}", path.display()))?;

    Ok(config)
}

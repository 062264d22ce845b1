use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::analysis::spectrogram::SpectrogramImage;
use crate::analysis::AnalysisSession;
use crate::config::DisplayConfig;

/// Colors for overlays
const COLOR_F0: RGBColor = RGBColor(41, 128, 185); // blue
const COLOR_FORMANT: RGBColor = RGBColor(231, 76, 60); // red

/// Upper bound on drawn cells per axis; wider matrices are decimated.
const MAX_COLUMNS: usize = 1200;
const MAX_ROWS: usize = 256;

/// Render the spectrogram as a grayscale heat map (dark = loud) with the
/// derived F0 curve and formant points drawn on top.
///
/// All layers use the session's time axis: column `i` of the image and F0
/// frame `i` both sit at `i * hop_length / sample_rate` seconds.
pub fn render_chart(
    session: &AnalysisSession,
    display: &DisplayConfig,
    output_path: &Path,
) -> Result<()> {
    let image = session
        .spectrogram()
        .context("No spectrogram to draw; run the spectrogram first")?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let sample_rate = image.sample_rate;
    let nyquist = sample_rate as f64 / 2.0;
    let max_hz = display.max_chart_hz.min(nyquist);
    let duration = image.frame_time(image.n_frames.saturating_sub(1)).max(1e-3);

    let root = BitMapBackend::new(output_path, (display.chart_width, display.chart_height))
        .into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Spectrogram", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..duration, 0.0..max_hz)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Time (s)")
        .y_desc("Frequency (Hz)")
        .draw()?;

    chart.draw_series(heatmap_cells(image, max_hz, display.top_db))?;

    // F0, one line per voiced stretch
    let f0 = &session.tracks().f0_derived;
    let mut segment: Vec<(f64, f64)> = Vec::new();
    let mut segments = Vec::new();
    for (&t, &v) in f0.times.iter().zip(&f0.values) {
        if v.is_finite() {
            segment.push((t, v as f64));
        } else if !segment.is_empty() {
            segments.push(std::mem::take(&mut segment));
        }
    }
    if !segment.is_empty() {
        segments.push(segment);
    }
    for seg in segments {
        chart.draw_series(LineSeries::new(seg, COLOR_F0.stroke_width(2)))?;
    }

    // Formants
    let points: Vec<(f64, f64)> = session
        .formants()
        .iter()
        .flat_map(|p| {
            let t = p.time(sample_rate);
            p.frequencies.iter().map(move |&f| (t, f))
        })
        .filter(|&(_, f)| f <= max_hz)
        .collect();
    chart.draw_series(
        points
            .iter()
            .map(|&(t, f)| Circle::new((t, f), 2, COLOR_FORMANT.filled())),
    )?;

    root.present().context("Failed to write chart PNG")?;
    log::debug!("chart written to {}", output_path.display());

    Ok(())
}

/// One rectangle per (decimated) cell, spanning half a step either side of
/// its frame time and bin frequency.
fn heatmap_cells(
    image: &SpectrogramImage,
    max_hz: f64,
    top_db: f32,
) -> Vec<Rectangle<(f64, f64)>> {
    let visible_bins = ((max_hz / image.bin_frequency(1).max(f64::EPSILON)).floor() as usize + 1)
        .min(image.n_bins);
    let col_step = image.n_frames.div_ceil(MAX_COLUMNS).max(1);
    let row_step = visible_bins.div_ceil(MAX_ROWS).max(1);

    let dt = image.frame_time(col_step);
    let df = image.bin_frequency(row_step);
    let top_db = top_db.max(f32::EPSILON);

    let mut cells = Vec::new();
    for frame in (0..image.n_frames).step_by(col_step) {
        for bin in (0..visible_bins).step_by(row_step) {
            let Some(db) = image.get(bin, frame) else {
                continue;
            };
            let t = image.frame_time(frame);
            let f = image.bin_frequency(bin);
            cells.push(Rectangle::new(
                [(t - dt / 2.0, f - df / 2.0), (t + dt / 2.0, f + df / 2.0)],
                shade(db, top_db).filled(),
            ));
        }
    }
    cells
}

/// 0 dB maps to black, `-top_db` and below to white.
fn shade(db: f32, top_db: f32) -> RGBColor {
    let level = ((db + top_db) / top_db).clamp(0.0, 1.0);
    let v = (255.0 * (1.0 - level)).round() as u8;
    RGBColor(v, v, v)
}

mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{AnalysisOverrides, Cli, Command};
use phonacq::analysis::chunks::ChunkPlanner;
use phonacq::analysis::task::{AnalysisTask, TaskEvent};
use phonacq::analysis::{coarse_f0, AnalysisParams, AnalysisSession};
use phonacq::audio::wav;
use phonacq::config::{self, AppConfig};
use phonacq::paths::AppPaths;
use phonacq::report::{self, AnalysisReport, TrackSummary};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let paths = AppPaths::resolve();

    match cli.command {
        Command::Analyze {
            wav,
            views,
            json,
            png,
            overrides,
        } => {
            let config = config::load_config(&paths)?;
            analyze(&wav, &views, json.as_deref(), png.as_deref(), &config, &overrides)
        }

        Command::Range { wav, overrides } => {
            let config = config::load_config(&paths)?;
            print_range(&wav, &params_for(&config, &overrides)?)
        }

        Command::Formants {
            wav,
            from,
            to,
            overrides,
        } => {
            let config = config::load_config(&paths)?;
            print_formants(&wav, from, to, &params_for(&config, &overrides)?)
        }

        Command::Paths => {
            let file = paths.config_file();
            println!("{}", style("phonacq paths").bold());
            println!("  Config dir:  {}", paths.config_dir().display());
            let status = if file.exists() {
                style("found").green()
            } else {
                style("not found, using defaults").dim()
            };
            println!("  Config file: {} ({status})", file.display());
            Ok(())
        }

        Command::Config => {
            let config = config::load_config(&paths)?;
            let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{text}");
            Ok(())
        }
    }
}

/// Effective engine parameters for this invocation.
fn params_for(config: &AppConfig, overrides: &AnalysisOverrides) -> Result<AnalysisParams> {
    let params = AnalysisParams::from(&overrides.apply(&config.analysis));
    params.validate().context("Invalid analysis parameters")?;
    Ok(params)
}

fn load_session(wav_path: &Path) -> Result<AnalysisSession> {
    let mut session = AnalysisSession::new();
    session
        .load(wav_path)
        .with_context(|| format!("Failed to load {}", wav_path.display()))?;

    if let Some(buffer) = session.buffer() {
        println!(
            "  {} {} ({:.2} s at {} Hz)",
            style(">>").cyan(),
            wav_path.display(),
            buffer.duration_secs(),
            buffer.sample_rate()
        );
    }
    Ok(session)
}

/// Run `task` to the end, turning a `Failed` event into an error.
fn run_task<F>(session: &mut AnalysisSession, task: AnalysisTask, mut on_event: F) -> Result<()>
where
    F: FnMut(&TaskEvent),
{
    let mut failure = None;
    session.run_to_completion(task, |event| {
        if let TaskEvent::Failed(message) = event {
            failure = Some(message.clone());
        }
        on_event(event);
    })?;

    match failure {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

fn analyze(
    wav_path: &Path,
    views: &[(f64, f64)],
    json: Option<&Path>,
    png: Option<&Path>,
    config: &AppConfig,
    overrides: &AnalysisOverrides,
) -> Result<()> {
    let params = params_for(config, overrides)?;
    let mut session = load_session(wav_path)?;

    // Spectrogram first: its hop becomes the time axis for everything else.
    let task = session.spectrogram_task(&params, Some(config.display.top_db))?;
    run_task(&mut session, task, |_| {}).context("Spectrogram failed")?;
    if let Some(image) = session.spectrogram() {
        println!(
            "  {} spectrogram {} x {} (n_fft {}, hop {})",
            style("OK").green(),
            image.n_bins,
            image.n_frames,
            image.n_fft,
            image.hop_length
        );
    }

    let (total, sample_rate) = match session.buffer() {
        Some(buffer) => (buffer.len(), buffer.sample_rate()),
        None => bail!("No audio loaded"),
    };
    let snapshot = session.params_snapshot(&params);
    let chunk_count = ChunkPlanner::new(
        total,
        snapshot.chunk_size_ms,
        snapshot.chunk_overlap_ms,
        sample_rate,
        snapshot.resolve_hop_length(sample_rate),
    )
    .chunk_count();

    let pb = ProgressBar::new(chunk_count as u64);
    pb.set_style(
        ProgressStyle::with_template("  F0/intensity {bar:30.green/dim} {pos}/{len} chunks")
            .context("Invalid progress template")?,
    );
    let task = session.acoustics_task(&params)?;
    let result = run_task(&mut session, task, |event| {
        if let TaskEvent::ChunkFinished(_) = event {
            pb.inc(1);
        }
    });
    pb.finish_and_clear();
    result.context("F0/intensity analysis failed")?;

    let whole_file = [(0.0, total as f64 / sample_rate as f64)];
    let views = if views.is_empty() { &whole_file[..] } else { views };
    for (i, &(from, to)) in views.iter().enumerate() {
        let (start, end) = sample_window(&session, from, to)?;
        let task = session.formant_view_task(&params, start, end, i == 0)?;
        run_task(&mut session, task, |_| {})
            .with_context(|| format!("Formant extraction failed for {from:.2}-{to:.2} s"))?;
    }

    print_summary(&TrackSummary::from_session(&session));

    if let Some(path) = json {
        let report = AnalysisReport::from_session(&session, Some(wav_path))
            .context("No audio loaded")?;
        report::write_json(&report, path)?;
        println!("  {} {}", style("Saved").green(), path.display());
    }
    if let Some(path) = png {
        report::render_chart(&session, &config.display, path)?;
        println!("  {} {}", style("Saved").green(), path.display());
    }

    Ok(())
}

/// Convert a time window to a sample range inside the loaded buffer.
fn sample_window(session: &AnalysisSession, from: f64, to: f64) -> Result<(usize, usize)> {
    let buffer = session.buffer().context("No audio loaded")?;
    let start = buffer.sample_at(from);
    let end = buffer.sample_at(to);
    if start >= end {
        bail!(
            "Window {from:.2}-{to:.2} s is outside the recording ({:.2} s)",
            buffer.duration_secs()
        );
    }
    Ok((start, end))
}

fn print_summary(summary: &TrackSummary) {
    println!();
    println!("{}", style("Summary").bold());
    println!("  Frames:          {}", summary.frames);
    println!("  Voiced:          {:.0}%", summary.voiced_fraction * 100.0);
    match (summary.mean_f0_hz, summary.min_f0_hz, summary.max_f0_hz) {
        (Some(mean), Some(min), Some(max)) => {
            println!("  Mean F0:         {mean:.1} Hz");
            println!("  F0 range:        {min:.1} - {max:.1} Hz");
        }
        _ => println!("  Mean F0:         {}", style("no voiced frames").yellow()),
    }
    match (summary.peak_intensity, summary.peak_intensity_secs) {
        (Some(peak), Some(at)) => println!("  Peak RMS:        {peak:.4} at {at:.2} s"),
        (Some(peak), None) => println!("  Peak RMS:        {peak:.4}"),
        _ => {}
    }
    println!("  Formant points:  {}", summary.formant_points);
}

fn print_range(wav_path: &Path, params: &AnalysisParams) -> Result<()> {
    let buffer = wav::load_buffer(wav_path)
        .with_context(|| format!("Failed to load {}", wav_path.display()))?;
    let (lo, hi) = coarse_f0::estimate_range(&buffer, params.f0_min_hz, params.f0_max_hz);

    println!(
        "  {} {:.1} - {:.1} Hz (search bounds {:.0} - {:.0} Hz)",
        style("F0 range").cyan(),
        lo,
        hi,
        params.f0_min_hz,
        params.f0_max_hz
    );
    if (lo, hi) == (params.f0_min_hz, params.f0_max_hz) {
        println!(
            "  {}",
            style("Not enough voicing to narrow the range; bounds kept").dim()
        );
    }
    Ok(())
}

fn print_formants(wav_path: &Path, from: f64, to: f64, params: &AnalysisParams) -> Result<()> {
    let mut session = load_session(wav_path)?;
    let (start, end) = sample_window(&session, from, to)?;
    let task = session.formant_view_task(params, start, end, true)?;
    run_task(&mut session, task, |_| {}).context("Formant extraction failed")?;

    let sample_rate = session.buffer().map(|b| b.sample_rate()).unwrap_or(1);
    println!("{}", style(format!("{:>9}  F1..F4 (Hz)", "time (s)")).bold());
    for point in session.formants() {
        let freqs: Vec<String> = point.frequencies.iter().map(|f| format!("{f:7.1}")).collect();
        println!("{:>9.3}  {}", point.time(sample_rate), freqs.join(" "));
    }
    if session.formants().is_empty() {
        println!("  {}", style("No voiced frames in this window").yellow());
    }
    Ok(())
}

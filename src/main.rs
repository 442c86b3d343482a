mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;

use beatscope::audio::decode::decode_audio;
use beatscope::audio::PcmAnalyser;
use beatscope::config::{self, AnalysisConfig, Config};
use beatscope::engine::{Engine, EngineConfig};
use beatscope::report::{self, FileDump, SummaryBuilder, TickRecord};
use cli::Cli;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut config = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            // An explicitly requested config must load
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("Ignoring config: {:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    merge_cli(&cli, &mut config);
    config
        .analysis
        .validate()
        .context("Invalid analysis settings")?;

    log::info!("beatscope - beat and rhythm analysis");
    log::info!(
        "FFT {} @ {}fps, sensitivity {:.2}, smoothing {:.2}, bands {:?}{}",
        config.analysis.fft_size,
        config.render.fps,
        config.analysis.sensitivity,
        config.analysis.smoothing,
        config.analysis.band_mode,
        if cli.adaptive { ", adaptive quality" } else { "" }
    );

    let progress = MultiProgress::new();
    let keep_ticks = cli.dump.is_some();
    let results: Vec<Result<FileDump>> = cli
        .inputs
        .par_iter()
        .map(|input| analyze_file(input, &config, cli.adaptive, keep_ticks, &progress))
        .collect();

    let mut dumps = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (input, result) in cli.inputs.iter().zip(results) {
        match result {
            Ok(dump) => {
                println!("{}", dump.summary);
                dumps.push(dump);
            }
            Err(err) => {
                failures += 1;
                log::error!("{}: {:#}", input.display(), err);
            }
        }
    }

    if let Some(ref path) = cli.dump {
        report::write_dump(path, &dumps)?;
    }

    if dumps.is_empty() {
        anyhow::bail!("No input could be analysed");
    }
    if failures > 0 {
        log::warn!("{} of {} inputs failed", failures, cli.inputs.len());
    }
    Ok(())
}

/// Config values apply only where the CLI is still at its default.
fn merge_cli(cli: &Cli, config: &mut Config) {
    let defaults = AnalysisConfig::default();
    if cli.fps != 60 {
        config.render.fps = cli.fps;
    }
    if cli.fft_size != defaults.fft_size {
        config.analysis.fft_size = cli.fft_size;
    }
    if cli.sensitivity != defaults.sensitivity {
        config.analysis.sensitivity = cli.sensitivity;
    }
    if cli.smoothing != defaults.smoothing {
        config.analysis.smoothing = cli.smoothing;
    }
    if let Some(band_mode) = cli.band_mode {
        config.analysis.band_mode = band_mode;
    }
    if let Some(mode) = cli.mode {
        config.render.mode = mode;
    }
    if let Some(scheme) = cli.color_scheme {
        config.render.color_scheme = scheme;
    }
    if let Some(seed) = cli.seed {
        config.render.seed = seed;
    }
}

fn analyze_file(
    input: &Path,
    config: &Config,
    adaptive: bool,
    keep_ticks: bool,
    progress: &MultiProgress,
) -> Result<FileDump> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let audio = decode_audio(input)?;
    let duration = audio.duration_secs();

    let analysis = AnalysisConfig {
        sample_rate: audio.sample_rate,
        ..config.analysis.clone()
    };
    let fps = config.render.fps;
    let source = PcmAnalyser::new(audio, &analysis, fps);
    let mut engine_config = EngineConfig {
        analysis,
        render: config.render.clone(),
        budget_ms: None,
    };
    if adaptive {
        engine_config = engine_config.adaptive();
    }
    let mut engine = Engine::new(source, engine_config)
        .with_context(|| format!("Failed to set up analysis for {}", input.display()))?;

    let pb = progress.add(ProgressBar::new(engine.frame_count().unwrap_or(0)));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_message(
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );

    let mode = config.render.mode;
    let mut summary = SummaryBuilder::default();
    let mut ticks = Vec::new();
    while let Some(result) = engine.tick() {
        let snapshot = result.with_context(|| format!("Analysis failed for {}", input.display()))?;
        summary.record(&snapshot);
        pb.set_position((snapshot.features.timestamp_ms * fps as f64 / 1000.0).round() as u64 + 1);
        if keep_ticks {
            ticks.push(TickRecord {
                primitives: engine.scene(mode).counts(),
                effects: *engine.effects(),
                snapshot,
            });
        }
    }
    pb.finish_and_clear();

    let summary = summary.finish(input, duration, engine.quality());
    log::info!(
        "{}: {} beats, tempo {:.1} BPM over {:.1}s",
        input.display(),
        summary.beats,
        summary.tempo_bpm,
        summary.duration_secs
    );
    Ok(FileDump { summary, ticks })
}

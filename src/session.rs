//! The capture, analyze and plot loop for each run mode.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::analysis::{self, AnalysisKind, AnalysisSettings};
use crate::audio::capture::{MicStream, SampleSource};
use crate::audio::decode;
use crate::audio::features::{Analysis, Waveform};
use crate::audio::wav;
use crate::config::Config;
use crate::output;
use crate::render::figure;
use crate::render::terminal::{LiveView, Status};
use crate::render::text::TextOverlay;

/// Label font size in pixels for a graph of the given height.
fn label_size(height: u32) -> f32 {
    (height as f32 * 0.018).max(12.0)
}

/// Read up to `buffers` buffers of `frames_per_buffer` frames, stopping early
/// once `stop` is set. `stop` is checked before each read.
pub fn capture_for<S: SampleSource>(
    source: &mut S,
    buffers: usize,
    frames_per_buffer: usize,
    stop: &AtomicBool,
) -> Result<Vec<i16>> {
    let pb = ProgressBar::new(buffers as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} buffers ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut samples = Vec::with_capacity(buffers * frames_per_buffer * source.channels() as usize);
    for _ in 0..buffers {
        if stop.load(Ordering::SeqCst) {
            log::info!("Recording interrupted");
            break;
        }
        samples.extend(source.read(frames_per_buffer)?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(samples)
}

/// Read, analyze and hand each result to `update` until it breaks.
/// Returns the number of completed iterations.
pub fn live_loop<S, F>(
    source: &mut S,
    settings: &AnalysisSettings,
    frames: usize,
    mut update: F,
) -> Result<u64>
where
    S: SampleSource,
    F: FnMut(&Analysis, &S) -> Result<ControlFlow<()>>,
{
    let mut iterations = 0;
    loop {
        let raw = source.read(frames)?;
        let waveform = Waveform::from_i16(&raw, source.channels(), source.sample_rate());
        let analysis = analysis::analyze(&waveform, settings)?;
        iterations += 1;
        if update(&analysis, source)?.is_break() {
            return Ok(iterations);
        }
    }
}

/// Analyze once and write the configured outputs.
fn analyze_and_save(
    config: &Config,
    settings: &AnalysisSettings,
    waveform: &Waveform,
    save_recording: bool,
) -> Result<Analysis> {
    if waveform.is_empty() {
        bail!("No audio captured");
    }
    if waveform.len() < settings.min_samples() {
        bail!(
            "Only {} samples captured; {} analysis needs at least {}",
            waveform.len(),
            settings.kind,
            settings.min_samples()
        );
    }

    let out = &config.output;
    if save_recording && out.wav {
        wav::save_wav(&out.dir.join("wav"), &waveform.samples, waveform.sample_rate)?;
    }

    log::info!("Analyzing {:.2}s of audio ({})...", waveform.duration(), settings.kind);
    let analysis = analysis::analyze(waveform, settings)?;
    log::info!(
        "peak={:.4}, rms={:.4}, f0={}",
        analysis.peak,
        analysis.rms,
        analysis
            .fundamental_hz()
            .map_or_else(|| "-".to_string(), |f| format!("{:.1} Hz", f))
    );

    if out.graph {
        let text = TextOverlay::discover(out.font.as_deref(), label_size(out.height));
        figure::save(&analysis, &out.dir, out.width, out.height, text.as_ref())?;
    }
    if out.json {
        output::save_report(&out.dir, &figure::graph_prefix(&analysis), &analysis)?;
    }
    Ok(analysis)
}

/// Record for the configured duration, then analyze and save.
pub fn record(config: &Config, kind: AnalysisKind) -> Result<Analysis> {
    let cap = &config.capture;
    let settings = config.analysis_settings(kind);

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl+C handler")?;

    let mut stream = MicStream::open(cap.device, cap.channels, cap.sample_rate, cap.frames_per_buffer)?;
    let buffers = (cap.duration * cap.sample_rate as f32 / cap.frames_per_buffer as f32) as usize;
    log::info!(
        "Recording {:.1}s ({} buffers), press Ctrl+C to stop early...",
        cap.duration,
        buffers
    );

    let captured = capture_for(&mut stream, buffers, cap.frames_per_buffer as usize, &stop);
    stream.stop()?;
    let raw = captured?;

    let waveform = Waveform::from_i16(&raw, cap.channels, cap.sample_rate);
    analyze_and_save(config, &settings, &waveform, true)
}

/// Decode `path` and run the record-mode analysis over it.
pub fn analyze_file(config: &Config, kind: AnalysisKind, path: &Path) -> Result<Analysis> {
    let settings = config.analysis_settings(kind);
    log::info!("Decoding audio...");
    let waveform = decode::decode_audio(path)?;
    analyze_and_save(config, &settings, &waveform, false)
}

fn check_realtime_buffer(frames: usize, settings: &AnalysisSettings) -> Result<()> {
    if frames < settings.min_samples() {
        bail!(
            "Real-time buffer of {} frames is too short: {} analysis needs at least {} samples",
            frames,
            settings.kind,
            settings.min_samples()
        );
    }
    Ok(())
}

/// Plot continuously in the terminal until the user quits.
pub fn realtime(config: &Config, kind: AnalysisKind) -> Result<()> {
    let cap = &config.capture;
    let settings = config.analysis_settings(kind);
    let frames = cap.realtime_buffer;
    check_realtime_buffer(frames, &settings)?;

    let mut stream = MicStream::open(cap.device, cap.channels, cap.sample_rate, cap.frames_per_buffer)?;
    let mut status = Status {
        device: stream.name().to_string(),
        ..Status::default()
    };

    let mut view = LiveView::start(config.pause())?;
    let result = live_loop(&mut stream, &settings, frames, |analysis, source| {
        status.iteration += 1;
        status.dropped_chunks = source.dropped_chunks();
        view.draw(analysis, &status)?;
        Ok(if view.poll_quit()? {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    });
    view.finish();
    stream.stop()?;

    let iterations = result?;
    log::info!("Real-time view closed after {} updates", iterations);
    Ok(())
}

mod audio;
mod cli;
mod config;
mod dsp;
mod output;
mod prompt;
mod render;
mod session;

use anyhow::Result;
use clap::Parser;
use std::io::{self, IsTerminal};

use audio::analysis::AnalysisKind;
use audio::capture::{self, DeviceInfo};
use cli::{Cli, Mode};
use config::Config;

fn print_devices(devices: &[DeviceInfo]) {
    println!("Input devices:");
    for d in devices {
        println!(
            "  {:>2}: {}{} ({} ch, {})",
            d.index,
            d.name,
            if d.is_default { " [default]" } else { "" },
            d.max_input_channels,
            d.default_sample_rate
                .map_or_else(|| "unknown rate".to_string(), |sr| format!("{}Hz", sr))
        );
    }
}

/// Ask on stdin when it is a terminal; otherwise take `fallback`.
fn ask<T: Copy>(title: &str, options: &[(T, String)], fallback: T) -> Result<T> {
    if !io::stdin().is_terminal() {
        return Ok(fallback);
    }
    let labels: Vec<&str> = options.iter().map(|(_, label)| label.as_str()).collect();
    let choice = prompt::choose(&mut io::stdin().lock(), &mut io::stdout(), title, &labels)?;
    Ok(options[choice].0)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect micscope.toml / global config
    let mut config = match config::locate(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}, using defaults", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    config.merge_cli(&cli);

    if cli.list_devices {
        print_devices(&capture::list_devices()?);
        return Ok(());
    }

    // 1. Resolve mode and analysis kind
    let kind = match config.analysis.kind {
        Some(kind) => kind,
        None => ask(
            "Analysis",
            &AnalysisKind::ALL
                .iter()
                .map(|&k| (k, format!("{:<12} {}", k, k.description())))
                .collect::<Vec<_>>(),
            AnalysisKind::default(),
        )?,
    };

    if let Some(input) = &cli.input {
        log::info!("micscope - {} of {}", kind, input.display());
        session::analyze_file(&config, kind, input)?;
        return Ok(());
    }

    let mode = match cli.mode {
        Some(mode) => mode,
        None => ask(
            "Mode",
            &Mode::ALL
                .iter()
                .map(|&m| (m, m.description().to_string()))
                .collect::<Vec<_>>(),
            Mode::Record,
        )?,
    };

    // 2. Resolve the input device
    if config.capture.device.is_none() && io::stdin().is_terminal() {
        let devices = capture::list_devices()?;
        if devices.len() > 1 {
            let options: Vec<(Option<usize>, String)> = devices
                .iter()
                .map(|d| {
                    let label = if d.is_default {
                        format!("{} [default]", d.name)
                    } else {
                        d.name.clone()
                    };
                    (Some(d.index), label)
                })
                .collect();
            config.capture.device = ask("Device", &options, None)?;
        }
    }

    log::info!("micscope - {:?} mode, {} analysis", mode, kind);
    log::info!(
        "Capture: {}Hz, {} channel(s), {} frames/buffer",
        config.capture.sample_rate,
        config.capture.channels,
        config.capture.frames_per_buffer
    );

    // 3. Run
    match mode {
        Mode::Record => {
            session::record(&config, kind)?;
        }
        Mode::Realtime => session::realtime(&config, kind)?,
    }

    log::info!("Done!");
    Ok(())
}

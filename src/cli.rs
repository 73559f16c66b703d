use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::audio::analysis::AnalysisKind;
use crate::dsp::window::WindowKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Record for a fixed duration, then analyze and save once
    Record,
    /// Analyze and redraw continuously until interrupted
    Realtime,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Record, Mode::Realtime];

    pub fn description(self) -> &'static str {
        match self {
            Mode::Record => "record, then plot and save",
            Mode::Realtime => "real-time plot",
        }
    }
}

/// Every value left unset here falls back to the config file, then to the
/// built-in default.
#[derive(Parser, Debug, Default)]
#[command(name = "micscope", about = "Microphone spectrum, spectrogram and cepstrum analyzer")]
pub struct Cli {
    /// Capture mode (asked interactively when omitted)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Analysis: spectrum, spectrogram or cepstrum (asked interactively when omitted)
    #[arg(short, long)]
    pub analysis: Option<AnalysisKind>,

    /// Analyze an audio file (WAV, MP3, FLAC, OGG) instead of the microphone
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// List input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Input device index from --list-devices
    #[arg(short, long)]
    pub device: Option<usize>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Number of input channels
    #[arg(long)]
    pub channels: Option<u16>,

    /// Frames per device buffer
    #[arg(long)]
    pub frames_per_buffer: Option<u32>,

    /// Recording length in seconds (record mode)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Frames analyzed per update (real-time mode)
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Window function: hann, hamming, blackman, rectangular
    #[arg(long)]
    pub window: Option<WindowKind>,

    /// Segment overlap in percent
    #[arg(long)]
    pub overlap: Option<f32>,

    /// STFT frame size in samples
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// dB reference in Pa; 0 keeps linear amplitudes
    #[arg(long)]
    pub dbref: Option<f32>,

    /// Disable A-weighting
    #[arg(long)]
    pub no_a_weighting: bool,

    /// Fixed lifter cutoff in samples (automatic when omitted)
    #[arg(long)]
    pub lifter: Option<usize>,

    /// Number of mel filters
    #[arg(long)]
    pub mel_filters: Option<usize>,

    /// Directory for graphs, recordings and reports
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Do not save the recording as WAV
    #[arg(long)]
    pub no_wav: bool,

    /// Do not save graphs
    #[arg(long)]
    pub no_graph: bool,

    /// Also save the analysis as JSON
    #[arg(long)]
    pub json: bool,

    /// Graph width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Graph height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Pause between real-time updates in milliseconds
    #[arg(long)]
    pub pause_ms: Option<u64>,

    /// Path to config file (default: ./micscope.toml or ~/.config/micscope/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "micscope",
            "--mode",
            "realtime",
            "--analysis",
            "stft",
            "--device",
            "2",
            "--window",
            "hamming",
            "--lifter",
            "50",
            "--no-a-weighting",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.mode, Some(Mode::Realtime));
        assert_eq!(cli.analysis, Some(AnalysisKind::Spectrogram));
        assert_eq!(cli.device, Some(2));
        assert_eq!(cli.window, Some(WindowKind::Hamming));
        assert_eq!(cli.lifter, Some(50));
        assert!(cli.no_a_weighting);
        assert!(cli.json);
        assert_eq!(cli.sample_rate, None);
    }

    #[test]
    fn rejects_unknown_analysis() {
        assert!(Cli::try_parse_from(["micscope", "--analysis", "wavelet"]).is_err());
    }

    #[test]
    fn defaults_leave_everything_unset() {
        let cli = Cli::try_parse_from(["micscope"]).unwrap();
        assert!(cli.mode.is_none() && cli.analysis.is_none() && cli.input.is_none());
        assert!(!cli.list_devices && !cli.no_wav && !cli.json);
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::analysis::{AnalysisKind, AnalysisSettings};
use crate::cli::Cli;
use crate::dsp::cepstrum::Lifter;
use crate::dsp::pitch::PitchParams;
use crate::dsp::weighting::Level;
use crate::dsp::window::WindowKind;
use crate::dsp::DB_REF_SPL;

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default)]
    pub device: Option<usize>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_frames_per_buffer")]
    pub frames_per_buffer: u32,
    /// Record mode length, seconds.
    #[serde(default = "default_duration")]
    pub duration: f32,
    /// Frames analyzed per real-time update.
    #[serde(default = "default_realtime_buffer")]
    pub realtime_buffer: usize,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub kind: Option<AnalysisKind>,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default = "default_overlap")]
    pub overlap: f32,
    #[serde(default = "default_stft_frame")]
    pub stft_frame: usize,
    /// dB reference in Pa; `0` keeps linear amplitudes.
    #[serde(default = "default_dbref")]
    pub dbref: f32,
    #[serde(default = "default_true")]
    pub a_weighting: bool,
    /// Fixed lifter cutoff; automatic when unset.
    #[serde(default)]
    pub lifter: Option<usize>,
    #[serde(default = "default_lifter_min")]
    pub lifter_min: usize,
    #[serde(default = "default_mel_filters")]
    pub mel_filters: usize,
    #[serde(default = "default_mfcc")]
    pub mfcc: usize,
    #[serde(default = "default_pitch_frame")]
    pub pitch_frame: usize,
    #[serde(default = "default_silence_rms")]
    pub silence_rms: f32,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub wav: bool,
    #[serde(default = "default_true")]
    pub graph: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// TrueType font for graph labels; system fonts are tried when unset.
    #[serde(default)]
    pub font: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            frames_per_buffer: default_frames_per_buffer(),
            duration: default_duration(),
            realtime_buffer: default_realtime_buffer(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            kind: None,
            window: WindowKind::default(),
            overlap: default_overlap(),
            stft_frame: default_stft_frame(),
            dbref: default_dbref(),
            a_weighting: true,
            lifter: None,
            lifter_min: default_lifter_min(),
            mel_filters: default_mel_filters(),
            mfcc: default_mfcc(),
            pitch_frame: default_pitch_frame(),
            silence_rms: default_silence_rms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            wav: true,
            graph: true,
            json: false,
            width: default_width(),
            height: default_height(),
            pause_ms: default_pause_ms(),
            font: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_channels() -> u16 { 1 }
fn default_frames_per_buffer() -> u32 { 1024 }
fn default_duration() -> f32 { 5.0 }
fn default_realtime_buffer() -> usize { 8192 }
fn default_overlap() -> f32 { 50.0 }
fn default_stft_frame() -> usize { 1024 }
fn default_dbref() -> f32 { DB_REF_SPL }
fn default_true() -> bool { true }
fn default_lifter_min() -> usize { 30 }
fn default_mel_filters() -> usize { 20 }
fn default_mfcc() -> usize { 13 }
fn default_pitch_frame() -> usize { 2048 }
fn default_silence_rms() -> f32 { 0.01 }
fn default_dir() -> PathBuf { PathBuf::from(".") }
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 960 }
fn default_pause_ms() -> u64 { 50 }

impl Config {
    /// Command-line values win over file values.
    pub fn merge_cli(&mut self, cli: &Cli) {
        let capture = &mut self.capture;
        if cli.device.is_some() { capture.device = cli.device; }
        if let Some(v) = cli.sample_rate { capture.sample_rate = v; }
        if let Some(v) = cli.channels { capture.channels = v; }
        if let Some(v) = cli.frames_per_buffer { capture.frames_per_buffer = v; }
        if let Some(v) = cli.duration { capture.duration = v; }
        if let Some(v) = cli.buffer { capture.realtime_buffer = v; }

        let analysis = &mut self.analysis;
        if cli.analysis.is_some() { analysis.kind = cli.analysis; }
        if let Some(v) = cli.window { analysis.window = v; }
        if let Some(v) = cli.overlap { analysis.overlap = v; }
        if let Some(v) = cli.frame_size { analysis.stft_frame = v; }
        if let Some(v) = cli.dbref { analysis.dbref = v; }
        if cli.no_a_weighting { analysis.a_weighting = false; }
        if cli.lifter.is_some() { analysis.lifter = cli.lifter; }
        if let Some(v) = cli.mel_filters { analysis.mel_filters = v; }

        let output = &mut self.output;
        if let Some(v) = &cli.output_dir { output.dir = v.clone(); }
        if cli.no_wav { output.wav = false; }
        if cli.no_graph { output.graph = false; }
        if cli.json { output.json = true; }
        if let Some(v) = cli.width { output.width = v; }
        if let Some(v) = cli.height { output.height = v; }
        if let Some(v) = cli.pause_ms { output.pause_ms = v; }
    }

    /// DSP settings for `kind`.
    pub fn analysis_settings(&self, kind: AnalysisKind) -> AnalysisSettings {
        let a = &self.analysis;
        AnalysisSettings {
            kind,
            window: a.window,
            overlap_rate: a.overlap,
            stft_frame: a.stft_frame,
            level: if a.dbref > 0.0 {
                Level {
                    dbref: a.dbref,
                    a_weighting: a.a_weighting,
                }
            } else {
                Level::linear()
            },
            lifter: match a.lifter {
                Some(cutoff) => Lifter::Fixed(cutoff),
                None => Lifter::Auto {
                    min_cutoff: a.lifter_min,
                },
            },
            mel_filters: a.mel_filters,
            mfcc: a.mfcc,
            pitch: PitchParams {
                frame_size: a.pitch_frame,
                overlap_rate: a.overlap,
                silence_rms: a.silence_rms,
            },
        }
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.output.pause_ms)
    }
}

/// Explicit `--config` path, else `./micscope.toml`, else the user config.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("micscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("micscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("micscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.capture.sample_rate, 44100);
        assert_eq!(config.capture.realtime_buffer, 8192);
        assert_eq!(config.analysis.dbref, 2e-5);
        assert!(config.output.wav && config.output.graph && !config.output.json);
        assert_eq!((config.output.width, config.output.height), (1280, 960));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [capture]
            sample_rate = 16000

            [analysis]
            kind = "cepstrum"
            window = "blackman"
            lifter = 50

            [output]
            dir = "out"
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.sample_rate, 16000);
        assert_eq!(config.capture.channels, 1);
        assert_eq!(config.analysis.kind, Some(AnalysisKind::Cepstrum));
        assert_eq!(config.analysis.window, WindowKind::Blackman);
        assert_eq!(config.analysis.lifter, Some(50));
        assert_eq!(config.analysis.mel_filters, 20);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(config.output.json);
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [capture]
            sample_rate = 16000
            duration = 2.0

            [output]
            json = false
            "#,
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "micscope",
            "--sample-rate",
            "48000",
            "--no-a-weighting",
            "--json",
            "--analysis",
            "spectrum",
        ])
        .unwrap();
        config.merge_cli(&cli);

        assert_eq!(config.capture.sample_rate, 48000);
        assert_eq!(config.capture.duration, 2.0);
        assert!(!config.analysis.a_weighting);
        assert!(config.output.json);
        assert_eq!(config.analysis.kind, Some(AnalysisKind::Spectrum));
    }

    #[test]
    fn analysis_settings_map_lifter() {
        let mut config = Config::default();
        let settings = config.analysis_settings(AnalysisKind::Cepstrum);
        assert_eq!(settings.lifter, Lifter::Auto { min_cutoff: 30 });
        assert_eq!(settings.level, Level::spl(true));
        assert_eq!(settings.pitch.frame_size, 2048);

        config.analysis.lifter = Some(50);
        config.analysis.dbref = 0.0;
        let settings = config.analysis_settings(AnalysisKind::Cepstrum);
        assert_eq!(settings.lifter, Lifter::Fixed(50));
        assert!(!settings.level.is_db());
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("micscope.toml");
        std::fs::write(&path, "[capture]\nsample_rate = \"fast\"\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));

        std::fs::write(&path, "[output]\npause_ms = 10\n").unwrap();
        assert_eq!(load_config(&path).unwrap().output.pause_ms, 10);
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(locate(Some(path)), Some(path.to_path_buf()));
    }
}

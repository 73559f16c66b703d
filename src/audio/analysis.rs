use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::features::{Analysis, Waveform};
use crate::dsp::cepstrum::{self, Lifter};
use crate::dsp::mel;
use crate::dsp::pitch::{self, PitchParams};
use crate::dsp::spectrum;
use crate::dsp::stft::{self, StftParams};
use crate::dsp::weighting::Level;
use crate::dsp::window::WindowKind;

/// Which set of graphs a run produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Time wave and frequency response.
    #[default]
    Spectrum,
    /// Time wave, STFT spectrogram and f0 track.
    Spectrogram,
    /// Time wave, spectrum with cepstral envelope, mel spectrum and f0.
    Cepstrum,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::Spectrum,
        AnalysisKind::Spectrogram,
        AnalysisKind::Cepstrum,
    ];

    pub fn description(self) -> &'static str {
        match self {
            AnalysisKind::Spectrum => "time wave and frequency response",
            AnalysisKind::Spectrogram => "time wave and spectrogram",
            AnalysisKind::Cepstrum => "time wave and mel-cepstrum",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisKind::Spectrum => "spectrum",
            AnalysisKind::Spectrogram => "spectrogram",
            AnalysisKind::Cepstrum => "cepstrum",
        };
        f.pad(name)
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spectrum" | "fft" => Ok(AnalysisKind::Spectrum),
            "spectrogram" | "stft" => Ok(AnalysisKind::Spectrogram),
            "cepstrum" | "mel" | "mel-cepstrum" => Ok(AnalysisKind::Cepstrum),
            other => Err(format!(
                "unknown analysis '{}' (expected spectrum, spectrogram or cepstrum)",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalysisSettings {
    pub kind: AnalysisKind,
    pub window: WindowKind,
    pub overlap_rate: f32,
    pub stft_frame: usize,
    pub level: Level,
    pub lifter: Lifter,
    pub mel_filters: usize,
    pub mfcc: usize,
    pub pitch: PitchParams,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            kind: AnalysisKind::default(),
            window: WindowKind::Hann,
            overlap_rate: 50.0,
            stft_frame: 1024,
            level: Level::default(),
            lifter: Lifter::default(),
            mel_filters: 20,
            mfcc: 13,
            pitch: PitchParams::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn stft_params(&self) -> StftParams {
        StftParams {
            frame_size: self.stft_frame,
            overlap_rate: self.overlap_rate,
            window: self.window,
            level: self.level,
        }
    }

    /// Fewest samples a buffer needs for every stage of `kind`.
    pub fn min_samples(&self) -> usize {
        match self.kind {
            AnalysisKind::Spectrum => 2,
            AnalysisKind::Spectrogram => self.stft_frame,
            AnalysisKind::Cepstrum => 2,
        }
    }
}

/// Run the stages of `settings.kind` over `waveform`.
pub fn analyze(waveform: &Waveform, settings: &AnalysisSettings) -> Result<Analysis> {
    let signal = &waveform.samples;
    let sr = waveform.sample_rate;
    let mut analysis = Analysis::new(settings.kind, waveform.clone());

    log::debug!(
        "Analyzing {} samples @ {}Hz ({}), peak={:.4}, rms={:.4}",
        signal.len(),
        sr,
        settings.kind,
        analysis.peak,
        analysis.rms
    );

    match settings.kind {
        AnalysisKind::Spectrum => {
            log::debug!("Stage: amplitude spectrum");
            analysis.spectrum = Some(
                spectrum::amplitude_spectrum(signal, sr, settings.level)
                    .context("Failed to compute amplitude spectrum")?,
            );
        }
        AnalysisKind::Spectrogram => {
            log::debug!("Stage: STFT ({} window)", settings.window);
            analysis.spectrogram = Some(
                stft::stft(signal, sr, &settings.stft_params())
                    .context("Failed to compute spectrogram")?,
            );
            log::debug!("Stage: pitch track");
            analysis.pitch = Some(
                pitch::track(signal, sr, &settings.pitch).context("Failed to track pitch")?,
            );
        }
        AnalysisKind::Cepstrum => {
            log::debug!("Stage: amplitude spectrum");
            analysis.spectrum = Some(
                spectrum::amplitude_spectrum(signal, sr, settings.level)
                    .context("Failed to compute amplitude spectrum")?,
            );
            log::debug!("Stage: cepstrum and envelope");
            analysis.cepstrum = Some(
                cepstrum::analyze(signal, sr, settings.lifter, settings.level)
                    .context("Failed to compute cepstrum")?,
            );
            log::debug!("Stage: mel spectrum ({} filters)", settings.mel_filters);
            analysis.mel = Some(
                mel::mel_spectrum(signal, sr, settings.mel_filters, settings.mfcc, settings.level)
                    .context("Failed to compute mel spectrum")?,
            );
            log::debug!("Stage: pitch track");
            analysis.pitch = Some(
                pitch::track(signal, sr, &settings.pitch).context("Failed to track pitch")?,
            );
        }
    }

    if analysis.pitch.as_ref().is_some_and(|p| p.is_empty()) {
        log::debug!("Signal shorter than one pitch frame, f0 track is empty");
    }
    if let Some(f0) = analysis.fundamental_hz() {
        log::debug!("Estimated f0: {:.1} Hz", f0);
    }

    Ok(analysis)
}

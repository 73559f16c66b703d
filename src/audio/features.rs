use serde::Serialize;

use super::analysis::AnalysisKind;
use super::pcm;
use crate::dsp::cepstrum::Cepstrum;
use crate::dsp::mel::MelSpectrum;
use crate::dsp::pitch::PitchTrack;
use crate::dsp::spectrum::Spectrum;
use crate::dsp::stft::Spectrogram;

/// Normalized mono signal in `[-1, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Normalize interleaved 16-bit PCM and downmix it to mono.
    pub fn from_i16(samples: &[i16], channels: u16, sample_rate: u32) -> Self {
        let normalized = pcm::normalize_i16(samples);
        Self::new(pcm::downmix(&normalized, channels as usize), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn times(&self) -> Vec<f32> {
        pcm::time_axis(self.samples.len(), self.sample_rate)
    }
}

/// Everything computed for one buffer of audio.
#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    pub kind: AnalysisKind,
    pub sample_rate: u32,
    pub duration: f32,
    pub peak: f32,
    pub rms: f32,
    #[serde(skip)]
    pub waveform: Waveform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrum: Option<Spectrum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrogram: Option<Spectrogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cepstrum: Option<Cepstrum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mel: Option<MelSpectrum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<PitchTrack>,
}

impl Analysis {
    /// Empty result carrying only the level statistics of `waveform`.
    pub fn new(kind: AnalysisKind, waveform: Waveform) -> Self {
        Self {
            kind,
            sample_rate: waveform.sample_rate,
            duration: waveform.duration(),
            peak: pcm::peak(&waveform.samples),
            rms: pcm::rms(&waveform.samples),
            waveform,
            spectrum: None,
            spectrogram: None,
            cepstrum: None,
            mel: None,
            pitch: None,
        }
    }

    /// Cepstral f0 of the whole buffer, else the median of the pitch track.
    pub fn fundamental_hz(&self) -> Option<f32> {
        self.cepstrum
            .as_ref()
            .and_then(|c| c.fundamental_hz(self.sample_rate))
            .or_else(|| self.pitch.as_ref().and_then(|p| p.median_f0()))
    }
}

use rayon::prelude::*;
use serde::Serialize;

use super::cepstrum::{cepstral_peak, real_cepstrum};
use super::segment::{self, check_frame};
use super::window::{Window, WindowKind};
use super::{check_sample_rate, DspError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchParams {
    pub frame_size: usize,
    pub overlap_rate: f32,
    /// Frames with RMS below this are reported as unvoiced.
    pub silence_rms: f32,
}

impl Default for PitchParams {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            overlap_rate: 50.0,
            silence_rms: 0.01,
        }
    }
}

/// Fundamental frequency per frame; `0.0` marks an unvoiced frame.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PitchTrack {
    pub times: Vec<f32>,
    pub f0: Vec<f32>,
}

impl PitchTrack {
    pub fn is_empty(&self) -> bool {
        self.f0.is_empty()
    }

    /// Median of the voiced frames.
    pub fn median_f0(&self) -> Option<f32> {
        let mut voiced: Vec<f32> = self.f0.iter().copied().filter(|&f| f > 0.0).collect();
        if voiced.is_empty() {
            return None;
        }
        voiced.sort_by(f32::total_cmp);
        Some(voiced[voiced.len() / 2])
    }
}

pub fn track(signal: &[f32], sample_rate: u32, params: &PitchParams) -> Result<PitchTrack> {
    check_sample_rate(sample_rate)?;
    check_frame(params.frame_size, params.overlap_rate)?;
    if signal.len() < params.frame_size {
        return Ok(PitchTrack::default());
    }

    let segments = match segment::overlap(signal, sample_rate, params.frame_size, params.overlap_rate) {
        Ok(segments) => segments,
        Err(DspError::SignalTooShort { .. }) => return Ok(PitchTrack::default()),
        Err(e) => return Err(e),
    };
    let window = Window::new(WindowKind::Hann, params.frame_size);

    let f0: Vec<f32> = (0..segments.len())
        .into_par_iter()
        .map(|i| {
            let frame = segments.frame(i);
            let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
            if rms < params.silence_rms {
                return 0.0;
            }
            let cepstrum = real_cepstrum(&window.apply(frame), 1.0);
            match cepstral_peak(&cepstrum, sample_rate) {
                Some(p) if p > 0 => sample_rate as f32 / p as f32,
                _ => 0.0,
            }
        })
        .collect();

    log::debug!(
        "pitch: {} frames, {} voiced",
        f0.len(),
        f0.iter().filter(|&&f| f > 0.0).count()
    );

    Ok(PitchTrack {
        times: segments.centre_times(sample_rate),
        f0,
    })
}

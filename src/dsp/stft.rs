use rayon::prelude::*;
use serde::Serialize;

use super::segment;
use super::weighting::Level;
use super::window::{Window, WindowKind};
use super::{bin_frequency, fft_real, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StftParams {
    pub frame_size: usize,
    /// Percent, `[0, 100)`.
    pub overlap_rate: f32,
    pub window: WindowKind,
    pub level: Level,
}

impl Default for StftParams {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            overlap_rate: 50.0,
            window: WindowKind::Hann,
            level: Level::default(),
        }
    }
}

/// Short-time spectra over bins `0..N/2`, indexed `frames[time][freq]`.
#[derive(Clone, Debug, Serialize)]
pub struct Spectrogram {
    pub times: Vec<f32>,
    pub freqs: Vec<f32>,
    pub frames: Vec<Vec<f32>>,
    /// RMS average of the linear frames, then level-scaled.
    pub mean: Vec<f32>,
    pub final_time: f32,
    pub level: Level,
}

pub fn stft(signal: &[f32], sample_rate: u32, params: &StftParams) -> Result<Spectrogram> {
    let segments = segment::overlap(signal, sample_rate, params.frame_size, params.overlap_rate)?;
    let window = Window::new(params.window, params.frame_size);
    let acf = window.acf();
    let n = params.frame_size;
    let half = n / 2;

    log::debug!(
        "STFT: {} frames of {} samples, {} window, acf={:.4}",
        segments.len(),
        n,
        params.window,
        acf
    );

    let linear: Vec<Vec<f32>> = (0..segments.len())
        .into_par_iter()
        .map(|i| {
            let spectrum = fft_real(&window.apply(segments.frame(i)));
            spectrum[..half]
                .iter()
                .map(|c| acf * c.norm() / half as f32)
                .collect()
        })
        .collect();

    let freqs: Vec<f32> = (0..half).map(|k| bin_frequency(k, n, sample_rate)).collect();

    let count = linear.len() as f32;
    let mut mean: Vec<f32> = (0..half)
        .map(|k| (linear.iter().map(|f| f[k] * f[k]).sum::<f32>() / count).sqrt())
        .collect();
    params.level.apply(&mut mean, &freqs);

    let frames: Vec<Vec<f32>> = linear
        .into_iter()
        .map(|mut frame| {
            params.level.apply(&mut frame, &freqs);
            frame
        })
        .collect();

    Ok(Spectrogram {
        times: segments.centre_times(sample_rate),
        freqs,
        frames,
        mean,
        final_time: segments.final_time,
        level: params.level,
    })
}

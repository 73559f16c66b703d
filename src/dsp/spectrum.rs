use rustfft::num_complex::Complex;
use serde::Serialize;

use super::weighting::Level;
use super::{bin_frequency, check_sample_rate, fft_real, DspError, Result};

/// One-sided spectrum over bins `1..N/2` (DC excluded).
#[derive(Clone, Debug, Serialize)]
pub struct Spectrum {
    pub freqs: Vec<f32>,
    pub amplitude: Vec<f32>,
    /// Phase in degrees.
    pub phase: Vec<f32>,
    pub level: Level,
}

impl Spectrum {
    /// Bin with the largest amplitude, as `(frequency, amplitude)`.
    pub fn peak(&self) -> Option<(f32, f32)> {
        self.amplitude
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &a)| (self.freqs[i], a))
    }
}

/// `|X|·2/N` for bins `0..N/2`.
pub fn half_amplitude(spectrum: &[Complex<f32>]) -> Vec<f32> {
    let n = spectrum.len();
    spectrum[..n / 2]
        .iter()
        .map(|c| c.norm() * 2.0 / n as f32)
        .collect()
}

/// FFT amplitude/phase spectrum of the whole signal, scaled by `level`.
pub fn amplitude_spectrum(signal: &[f32], sample_rate: u32, level: Level) -> Result<Spectrum> {
    check_sample_rate(sample_rate)?;
    if signal.is_empty() {
        return Err(DspError::EmptySignal);
    }

    let n = signal.len();
    let spectrum = fft_real(signal);
    let bins = 1..n / 2;

    let freqs: Vec<f32> = bins.clone().map(|k| bin_frequency(k, n, sample_rate)).collect();
    let mut amplitude: Vec<f32> = spectrum[bins.clone()]
        .iter()
        .map(|c| c.norm() * 2.0 / n as f32)
        .collect();
    let phase: Vec<f32> = spectrum[bins].iter().map(|c| c.arg().to_degrees()).collect();

    level.apply(&mut amplitude, &freqs);

    Ok(Spectrum {
        freqs,
        amplitude,
        phase,
        level,
    })
}

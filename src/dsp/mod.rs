//! Signal-processing chain: segmentation, windowing, spectra, cepstra.
//!
//! Every function here is a pure transform over borrowed buffers. Nothing is
//! cached between calls; FFT plans are built per call.

pub mod cepstrum;
pub mod mel;
pub mod pitch;
pub mod segment;
pub mod spectrum;
pub mod stft;
pub mod weighting;
pub mod window;

use rustfft::{num_complex::Complex, FftPlanner};
use thiserror::Error;

/// Reference sound pressure for dB SPL (20 µPa, threshold of hearing).
pub const DB_REF_SPL: f32 = 2e-5;

/// Magnitudes are floored here before any logarithm.
pub const MAGNITUDE_FLOOR: f32 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum DspError {
    #[error("signal is empty")]
    EmptySignal,
    #[error("frame size must be at least 2 samples, got {0}")]
    InvalidFrameSize(usize),
    #[error("overlap rate must be within [0, 100) percent, got {0}")]
    InvalidOverlap(f32),
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("signal of {len} samples is shorter than one {frame}-sample frame")]
    SignalTooShort { len: usize, frame: usize },
    #[error("mel filter count must be positive")]
    InvalidFilterCount,
}

pub type Result<T> = std::result::Result<T, DspError>;

/// Forward FFT of a real signal.
pub(crate) fn fft_real(signal: &[f32]) -> Vec<Complex<f32>> {
    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer
}

/// Inverse FFT of a real sequence, scaled by `1/N`, real part only.
pub(crate) fn ifft_real(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    let mut buffer: Vec<Complex<f32>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_inverse(n);
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.re / n as f32).collect()
}

/// Frequency in Hz of bin `k` of an `n`-point FFT.
pub(crate) fn bin_frequency(k: usize, n: usize, sample_rate: u32) -> f32 {
    k as f32 * sample_rate as f32 / n as f32
}

pub(crate) fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(DspError::InvalidSampleRate);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut impulse = vec![0.0f32; 16];
        impulse[0] = 1.0;
        for bin in fft_real(&impulse) {
            assert!((bin.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn inverse_of_constant_is_impulse() {
        let out = ifft_real(&[1.0; 8]);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!(out[1..].iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn bin_frequency_scales_with_rate() {
        assert_eq!(bin_frequency(0, 1024, 44100), 0.0);
        assert!((bin_frequency(512, 1024, 44100) - 22050.0).abs() < 1e-3);
    }
}

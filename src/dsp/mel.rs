use serde::Serialize;
use std::f32::consts::PI;

use super::spectrum::half_amplitude;
use super::weighting::Level;
use super::{bin_frequency, check_sample_rate, fft_real, DspError, Result, MAGNITUDE_FLOOR};

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// `n` frequencies in Hz, equally spaced on the mel scale from `fmin` to `fmax`.
pub fn mel_frequencies(n: usize, fmin: f32, fmax: f32) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![fmin],
        _ => {
            let (lo, hi) = (hz_to_mel(fmin), hz_to_mel(fmax));
            let step = (hi - lo) / (n - 1) as f32;
            (0..n).map(|i| mel_to_hz(lo + step * i as f32)).collect()
        }
    }
}

/// Triangular filters over the bins `0..fft_size/2` of an FFT.
#[derive(Clone, Debug, Serialize)]
pub struct MelFilterBank {
    /// Centre frequency of each filter, Hz.
    pub centers: Vec<f32>,
    /// Frequency of each bin the weights cover, Hz.
    pub freqs: Vec<f32>,
    /// `weights[filter][bin]`, peak 1.0.
    pub weights: Vec<Vec<f32>>,
}

impl MelFilterBank {
    pub fn new(n_filters: usize, fft_size: usize, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if n_filters == 0 {
            return Err(DspError::InvalidFilterCount);
        }
        if fft_size < 2 {
            return Err(DspError::InvalidFrameSize(fft_size));
        }

        let edges = mel_frequencies(n_filters + 2, 0.0, sample_rate as f32 / 2.0);
        let freqs: Vec<f32> = (0..fft_size / 2)
            .map(|k| bin_frequency(k, fft_size, sample_rate))
            .collect();

        let weights = edges
            .windows(3)
            .map(|e| {
                let (left, centre, right) = (e[0], e[1], e[2]);
                freqs
                    .iter()
                    .map(|&f| {
                        if f <= left || f >= right {
                            0.0
                        } else if f <= centre {
                            (f - left) / (centre - left)
                        } else {
                            (right - f) / (right - centre)
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            centers: edges[1..=n_filters].to_vec(),
            freqs,
            weights,
        })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weighted sum of `amplitudes` (bins `0..N/2`) under each filter.
    pub fn apply(&self, amplitudes: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|filter| filter.iter().zip(amplitudes).map(|(w, a)| w * a).sum())
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MelSpectrum {
    pub centers: Vec<f32>,
    pub amplitude: Vec<f32>,
    #[serde(skip)]
    pub filter_bank: MelFilterBank,
    pub mfcc: Vec<f32>,
    pub level: Level,
}

/// Mel-band amplitudes and MFCCs of the whole signal.
///
/// Bands are reported in dB when `level` is a dB scale; A-weighting is not
/// applied per band.
pub fn mel_spectrum(
    signal: &[f32],
    sample_rate: u32,
    n_filters: usize,
    n_mfcc: usize,
    level: Level,
) -> Result<MelSpectrum> {
    if signal.is_empty() {
        return Err(DspError::EmptySignal);
    }
    let filter_bank = MelFilterBank::new(n_filters, signal.len(), sample_rate)?;
    let energies = filter_bank.apply(&half_amplitude(&fft_real(signal)));
    let mfcc = mfcc(&energies, n_mfcc);

    let band_level = Level {
        a_weighting: false,
        ..level
    };
    let mut amplitude = energies;
    band_level.apply(&mut amplitude, &filter_bank.centers);

    Ok(MelSpectrum {
        centers: filter_bank.centers.clone(),
        amplitude,
        filter_bank,
        mfcc,
        level: band_level,
    })
}

/// First `n` coefficients of the orthonormal DCT-II of the log band energies.
pub fn mfcc(energies: &[f32], n: usize) -> Vec<f32> {
    let m = energies.len();
    if m == 0 {
        return Vec::new();
    }
    let logs: Vec<f32> = energies.iter().map(|e| e.max(MAGNITUDE_FLOOR).ln()).collect();
    let m_f = m as f32;

    (0..n.min(m))
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / m_f).sqrt()
            } else {
                (2.0 / m_f).sqrt()
            };
            let sum: f32 = logs
                .iter()
                .enumerate()
                .map(|(i, l)| l * (PI * k as f32 * (2 * i + 1) as f32 / (2.0 * m_f)).cos())
                .sum();
            scale * sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::test_signals::sine;

    #[test]
    fn mel_scale_reference_points() {
        assert!(hz_to_mel(0.0).abs() < 1e-6);
        // 1 kHz is close to 1000 mel on the HTK scale.
        assert!((hz_to_mel(1000.0) - 999.99).abs() < 0.1);
        assert!((mel_to_hz(hz_to_mel(4321.0)) - 4321.0).abs() < 0.5);
    }

    #[test]
    fn mel_frequencies_span_range() {
        let freqs = mel_frequencies(5, 0.0, 8000.0);
        assert_eq!(freqs.len(), 5);
        assert!(freqs[0].abs() < 1e-3);
        assert!((freqs[4] - 8000.0).abs() < 0.5);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
        // Mel spacing widens towards high frequencies.
        assert!(freqs[4] - freqs[3] > freqs[1] - freqs[0]);
    }

    #[test]
    fn filter_bank_shape() {
        let bank = MelFilterBank::new(20, 1024, 16000).unwrap();
        assert_eq!(bank.len(), 20);
        assert_eq!(bank.centers.len(), 20);
        assert!(bank.weights.iter().all(|w| w.len() == 512));
        assert_eq!(bank.freqs.len(), 512);
        assert_eq!(bank.freqs[64], 1000.0);
        for (filter, &centre) in bank.weights.iter().zip(&bank.centers) {
            assert!(filter.iter().all(|&w| (0.0..=1.0).contains(&w)));
            // The largest weight sits on the bin nearest the centre.
            let (peak_bin, _) = filter
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .unwrap();
            assert!((bank.freqs[peak_bin] - centre).abs() <= 15.625 + 1e-3);
        }
    }

    #[test]
    fn invalid_bank_parameters() {
        assert_eq!(
            MelFilterBank::new(0, 512, 16000).unwrap_err(),
            DspError::InvalidFilterCount
        );
        assert_eq!(
            MelFilterBank::new(10, 512, 0).unwrap_err(),
            DspError::InvalidSampleRate
        );
    }

    #[test]
    fn mfcc_of_flat_spectrum_is_dc_only() {
        let energies = vec![std::f32::consts::E; 16];
        let coeffs = mfcc(&energies, 13);
        assert_eq!(coeffs.len(), 13);
        // ln(e) = 1 per band: c0 = sqrt(1/16)·16 = 4.
        assert!((coeffs[0] - 4.0).abs() < 1e-4);
        assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-4));
    }

    #[test]
    fn mfcc_count_capped_by_bands() {
        assert_eq!(mfcc(&[1.0; 4], 13).len(), 4);
        assert!(mfcc(&[], 13).is_empty());
    }

    #[test]
    fn tone_lands_in_nearest_band() {
        let signal = sine(1000.0, 0.5, 16000, 1600);
        let mel = mel_spectrum(&signal, 16000, 20, 13, Level::linear()).unwrap();
        let loudest = mel
            .amplitude
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let nearest = mel
            .centers
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - 1000.0).abs().total_cmp(&(b.1 - 1000.0).abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, nearest);
        assert_eq!(mel.mfcc.len(), 13);
    }

    #[test]
    fn bands_skip_a_weighting() {
        let signal = sine(1000.0, 0.5, 16000, 1600);
        let mel = mel_spectrum(&signal, 16000, 20, 13, Level::spl(true)).unwrap();
        assert!(!mel.level.a_weighting);
        assert!(mel.amplitude.iter().all(|a| a.is_finite()));
    }
}

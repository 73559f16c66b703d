use serde::{Deserialize, Serialize};

use super::weighting::{a_weighting, db, linear, Level};
use super::{bin_frequency, check_sample_rate, fft_real, ifft_real, DspError, Result};

/// Highest fundamental considered by the cepstral peak search, Hz.
pub const PITCH_SEARCH_MAX_HZ: u32 = 800;
/// Lowest fundamental considered by the cepstral peak search, Hz.
pub const PITCH_SEARCH_MIN_HZ: u32 = 40;

/// Low-pass lifter cutoff selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifter {
    /// Half the fundamental period found by the peak search, at least `min_cutoff`.
    Auto { min_cutoff: usize },
    Fixed(usize),
}

impl Default for Lifter {
    fn default() -> Self {
        Lifter::Auto { min_cutoff: 30 }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Cepstrum {
    /// Quefrency axis in seconds.
    pub quefrency: Vec<f32>,
    pub cepstrum: Vec<f32>,
    pub liftered: Vec<f32>,
    pub cutoff: usize,
    /// Fundamental period in samples, when the search range was non-empty.
    pub peak_index: Option<usize>,
    /// Envelope bins `1..N/2`, aligned with [`super::spectrum::Spectrum`].
    pub envelope_freqs: Vec<f32>,
    pub envelope: Vec<f32>,
    pub level: Level,
}

impl Cepstrum {
    pub fn fundamental_hz(&self, sample_rate: u32) -> Option<f32> {
        self.peak_index
            .filter(|&p| p > 0)
            .map(|p| sample_rate as f32 / p as f32)
    }
}

/// `Re(IFFT(20·log10(|FFT(x)| / reference)))`.
pub fn real_cepstrum(signal: &[f32], reference: f32) -> Vec<f32> {
    let log_spectrum: Vec<f32> = fft_real(signal)
        .iter()
        .map(|c| db(c.norm(), reference))
        .collect();
    ifft_real(&log_spectrum)
}

/// Index of the largest cepstral value inside the voice pitch range.
pub fn cepstral_peak(cepstrum: &[f32], sample_rate: u32) -> Option<usize> {
    let low = (sample_rate / PITCH_SEARCH_MAX_HZ) as usize;
    let high = ((sample_rate / PITCH_SEARCH_MIN_HZ) as usize).min(cepstrum.len() / 2);
    if low >= high {
        return None;
    }
    cepstrum[low..high]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i + low)
}

/// Zero the high-quefrency part `cepstrum[cutoff .. N - cutoff]`.
pub fn lifter(cepstrum: &[f32], cutoff: usize) -> Vec<f32> {
    let n = cepstrum.len();
    let mut out = cepstrum.to_vec();
    if cutoff < n - cutoff.min(n) {
        out[cutoff..n - cutoff].iter_mut().for_each(|c| *c = 0.0);
    }
    out
}

/// Cepstrum, lifter and spectral envelope of the whole signal.
pub fn analyze(signal: &[f32], sample_rate: u32, lifter_kind: Lifter, level: Level) -> Result<Cepstrum> {
    check_sample_rate(sample_rate)?;
    if signal.is_empty() {
        return Err(DspError::EmptySignal);
    }

    let n = signal.len();
    let half = n / 2;
    let cepstrum = real_cepstrum(signal, level.log_reference());
    let peak_index = cepstral_peak(&cepstrum, sample_rate);

    let cutoff = match lifter_kind {
        Lifter::Auto { min_cutoff } => peak_index.map_or(min_cutoff, |p| (p / 2).max(min_cutoff)),
        Lifter::Fixed(cutoff) => cutoff,
    }
    .min(half);
    log::debug!("cepstrum: peak_index={:?}, lifter cutoff={}", peak_index, cutoff);

    let liftered = lifter(&cepstrum, cutoff);

    // Back to a log spectrum, rescaled from raw FFT magnitude to |X|·2/N.
    let gain_db = 20.0 * (half.max(1) as f32).log10();
    let smoothed = fft_real(&liftered);
    let envelope_freqs: Vec<f32> = (1..half).map(|k| bin_frequency(k, n, sample_rate)).collect();
    let envelope: Vec<f32> = smoothed[1..half.max(1)]
        .iter()
        .zip(&envelope_freqs)
        .map(|(c, &f)| {
            let normalized = c.re - gain_db;
            if !level.is_db() {
                linear(normalized, 1.0)
            } else if level.a_weighting {
                normalized + a_weighting(f)
            } else {
                normalized
            }
        })
        .collect();

    let quefrency = (0..n).map(|i| i as f32 / sample_rate as f32).collect();

    Ok(Cepstrum {
        quefrency,
        cepstrum,
        liftered,
        cutoff,
        peak_index,
        envelope_freqs,
        envelope,
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrum::amplitude_spectrum;
    use crate::dsp::test_signals::windowed_harmonics;

    #[test]
    fn finds_fundamental_of_harmonic_signal() {
        let signal = windowed_harmonics(200.0, 20, 16000, 1024);
        let cepstrum = analyze(&signal, 16000, Lifter::default(), Level::spl(false)).unwrap();

        assert_eq!(cepstrum.peak_index, Some(80));
        assert_eq!(cepstrum.cutoff, 40);
        assert!((cepstrum.fundamental_hz(16000).unwrap() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn lifter_zeroes_high_quefrency() {
        let signal = windowed_harmonics(200.0, 20, 16000, 1024);
        let cepstrum = analyze(&signal, 16000, Lifter::Fixed(50), Level::spl(false)).unwrap();

        assert_eq!(cepstrum.cutoff, 50);
        assert_eq!(&cepstrum.liftered[..50], &cepstrum.cepstrum[..50]);
        assert!(cepstrum.liftered[50..1024 - 50].iter().all(|&c| c == 0.0));
        assert_eq!(&cepstrum.liftered[1024 - 50..], &cepstrum.cepstrum[1024 - 50..]);
    }

    #[test]
    fn auto_cutoff_respects_minimum() {
        let signal = windowed_harmonics(200.0, 20, 16000, 1024);
        let cepstrum = analyze(
            &signal,
            16000,
            Lifter::Auto { min_cutoff: 60 },
            Level::spl(false),
        )
        .unwrap();
        assert_eq!(cepstrum.cutoff, 60);
    }

    #[test]
    fn impulse_envelope_is_flat() {
        let mut impulse = vec![0.0f32; 512];
        impulse[0] = 1.0;
        let cepstrum = analyze(&impulse, 8000, Lifter::Fixed(30), Level::linear()).unwrap();

        // |X| = 1 everywhere, so the normalized envelope is 2/N.
        assert!(cepstrum.cepstrum.iter().all(|c| c.abs() < 1e-3));
        for &e in &cepstrum.envelope {
            assert!((e - 2.0 / 512.0).abs() < 1e-5);
        }
    }

    #[test]
    fn envelope_aligns_with_spectrum() {
        let signal = windowed_harmonics(200.0, 20, 16000, 1024);
        let level = Level::spl(false);
        let spectrum = amplitude_spectrum(&signal, 16000, level).unwrap();
        let cepstrum = analyze(&signal, 16000, Lifter::default(), level).unwrap();

        assert_eq!(cepstrum.envelope.len(), spectrum.amplitude.len());
        assert_eq!(cepstrum.envelope_freqs, spectrum.freqs);

        // The envelope smooths across harmonics: it stays below the harmonic
        // peaks and above the valleys between them.
        let peak = spectrum.amplitude.iter().copied().fold(f32::MIN, f32::max);
        let env_max = cepstrum.envelope.iter().copied().fold(f32::MIN, f32::max);
        assert!(env_max < peak);
    }

    #[test]
    fn a_weighting_shifts_envelope_by_curve() {
        let signal = windowed_harmonics(200.0, 20, 16000, 1024);
        let flat = analyze(&signal, 16000, Lifter::default(), Level::spl(false)).unwrap();
        let weighted = analyze(&signal, 16000, Lifter::default(), Level::spl(true)).unwrap();

        assert_eq!(weighted.cutoff, flat.cutoff);
        // Envelope index k is bin k + 1: bin 64 is 1 kHz, bin 6 is 93.75 Hz.
        assert_eq!(weighted.envelope_freqs[63], 1000.0);
        assert!((weighted.envelope[63] - flat.envelope[63]).abs() < 0.05);
        let low_shift = weighted.envelope[5] - flat.envelope[5];
        assert!((low_shift - a_weighting(93.75)).abs() < 1e-3);
        assert!(low_shift < -15.0);
        assert!(flat
            .envelope
            .iter()
            .zip(&weighted.envelope)
            .zip(&flat.envelope_freqs)
            .all(|((f, w), &hz)| (w - f - a_weighting(hz)).abs() < 1e-3));
    }

    #[test]
    fn search_range_outside_short_signal() {
        // 16 kHz / 800 Hz = 20 but half of 32 samples is 16: no search range.
        let signal = vec![0.1f32; 32];
        let cepstrum = analyze(&signal, 16000, Lifter::default(), Level::spl(false)).unwrap();
        assert_eq!(cepstrum.peak_index, None);
        assert_eq!(cepstrum.cutoff, 16);
        assert_eq!(cepstrum.fundamental_hz(16000), None);
    }
}

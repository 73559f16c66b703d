use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl WindowKind {
    /// Symmetric window coefficients (`N - 1` in the denominator).
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size == 1 {
            return vec![1.0];
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Blackman => {
                        0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                    }
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
            WindowKind::Rectangular => "rectangular",
        };
        f.write_str(name)
    }
}

impl FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowKind::Hann),
            "hamming" => Ok(WindowKind::Hamming),
            "blackman" => Ok(WindowKind::Blackman),
            "rectangular" | "rect" | "boxcar" => Ok(WindowKind::Rectangular),
            other => Err(format!(
                "unknown window '{}' (expected hann, hamming, blackman or rectangular)",
                other
            )),
        }
    }
}

/// A window together with its amplitude correction factor.
#[derive(Clone, Debug)]
pub struct Window {
    coeffs: Vec<f32>,
    acf: f32,
}

impl Window {
    pub fn new(kind: WindowKind, size: usize) -> Self {
        let coeffs = kind.coefficients(size);
        let sum: f32 = coeffs.iter().sum();
        // Amplitude Correction Factor: undoes the window's coherent gain.
        let acf = if sum > 0.0 { size as f32 / sum } else { 1.0 };
        Self { coeffs, acf }
    }

    pub fn acf(&self) -> f32 {
        self.acf
    }

    /// Multiply `frame` by the window. Extra samples beyond the window length are dropped.
    pub fn apply(&self, frame: &[f32]) -> Vec<f32> {
        frame.iter().zip(&self.coeffs).map(|(s, w)| s * w).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_zero_at_edges_and_one_in_middle() {
        let w = WindowKind::Hann.coefficients(9);
        assert!(w[0].abs() < 1e-6);
        assert!(w[8].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hann_acf_is_near_two() {
        let window = Window::new(WindowKind::Hann, 1024);
        // Symmetric Hann sums to (N-1)/2, so ACF = 2N/(N-1).
        assert!((window.acf() - 2048.0 / 1023.0).abs() < 1e-3);
    }

    #[test]
    fn rectangular_acf_is_one() {
        let window = Window::new(WindowKind::Rectangular, 256);
        assert!((window.acf() - 1.0).abs() < 1e-6);
        assert_eq!(window.apply(&[0.5; 256]), vec![0.5; 256]);
    }

    #[test]
    fn hamming_and_blackman_endpoints() {
        let hamming = WindowKind::Hamming.coefficients(11);
        assert!((hamming[0] - 0.08).abs() < 1e-6);
        let blackman = WindowKind::Blackman.coefficients(11);
        assert!(blackman[0].abs() < 1e-6);
        assert!((blackman[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_sample_window() {
        let window = Window::new(WindowKind::Hann, 1);
        assert_eq!(window.apply(&[0.3]), vec![0.3]);
        assert_eq!(window.acf(), 1.0);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Hanning".parse::<WindowKind>(), Ok(WindowKind::Hann));
        assert_eq!("boxcar".parse::<WindowKind>(), Ok(WindowKind::Rectangular));
        assert!("kaiser".parse::<WindowKind>().is_err());
        assert_eq!(WindowKind::Blackman.to_string(), "blackman");
    }
}

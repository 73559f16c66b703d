use serde::{Deserialize, Serialize};

use super::{DB_REF_SPL, MAGNITUDE_FLOOR};

/// Frequency substituted for 0 Hz before evaluating the A-weighting curve.
const A_WEIGHTING_ZERO_HZ: f64 = 1e-6;

/// Amplitude scale applied to spectra.
///
/// `dbref > 0` converts to dB relative to `dbref`. A-weighting only applies on
/// top of a dB scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub dbref: f32,
    pub a_weighting: bool,
}

impl Level {
    pub fn linear() -> Self {
        Self {
            dbref: 0.0,
            a_weighting: false,
        }
    }

    /// dB SPL relative to 20 µPa.
    pub fn spl(a_weighting: bool) -> Self {
        Self {
            dbref: DB_REF_SPL,
            a_weighting,
        }
    }

    pub fn is_db(&self) -> bool {
        self.dbref > 0.0
    }

    /// Reference used inside logarithms: `dbref` on a dB scale, else unity.
    pub fn log_reference(&self) -> f32 {
        if self.is_db() {
            self.dbref
        } else {
            1.0
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match (self.is_db(), self.a_weighting) {
            (true, true) => "dB SPL(A)",
            (true, false) => "dB SPL",
            (false, _) => "amplitude",
        }
    }

    /// Rescale linear amplitudes in place. `freqs` pairs with `amps`.
    pub fn apply(&self, amps: &mut [f32], freqs: &[f32]) {
        if !self.is_db() {
            return;
        }
        for a in amps.iter_mut() {
            *a = db(*a, self.dbref);
        }
        if self.a_weighting {
            for (a, &f) in amps.iter_mut().zip(freqs) {
                *a += a_weighting(f);
            }
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::spl(true)
    }
}

pub fn db(x: f32, dbref: f32) -> f32 {
    20.0 * (x.max(MAGNITUDE_FLOOR) / dbref).log10()
}

/// Inverse of [`db`].
pub fn linear(db: f32, dbref: f32) -> f32 {
    dbref * 10f32.powf(db / 20.0)
}

/// A-weighting gain in dB at `freq` Hz (IEC 61672 curve, 0 dB at 1 kHz).
pub fn a_weighting(freq: f32) -> f32 {
    let f = if freq == 0.0 {
        A_WEIGHTING_ZERO_HZ
    } else {
        freq as f64
    };
    let f2 = f * f;
    let ra = (12194f64.powi(2) * f2 * f2)
        / ((f2 + 20.6f64.powi(2))
            * ((f2 + 107.7f64.powi(2)) * (f2 + 737.9f64.powi(2))).sqrt()
            * (f2 + 12194f64.powi(2)));
    (20.0 * ra.log10() + 2.00) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_of_reference_is_zero() {
        assert!(db(2e-5, DB_REF_SPL).abs() < 1e-4);
        assert!((db(1.0, 1.0 / 10.0) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn db_floors_zero_magnitude() {
        let value = db(0.0, 1.0);
        assert!(value.is_finite());
        assert!((value - (-240.0)).abs() < 1e-3);
    }

    #[test]
    fn linear_inverts_db() {
        for (x, r) in [(0.25, DB_REF_SPL), (3.0, 1.0), (1e-3, 0.5)] {
            assert!((linear(db(x, r), r) - x).abs() < 1e-5 * x.max(1.0));
        }
        assert!((linear(0.0, 2e-5) - 2e-5).abs() < 1e-12);
        assert!((linear(20.0, 1.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn a_weighting_reference_points() {
        assert!(a_weighting(1000.0).abs() < 0.01);
        assert!((a_weighting(100.0) - (-19.145)).abs() < 0.01);
        assert!((a_weighting(10_000.0) - (-2.492)).abs() < 0.01);
    }

    #[test]
    fn a_weighting_at_dc_is_finite() {
        let gain = a_weighting(0.0);
        assert!(gain.is_finite());
        assert!(gain < -600.0);
    }

    #[test]
    fn linear_level_leaves_amplitudes() {
        let mut amps = vec![0.5, 0.25];
        Level::linear().apply(&mut amps, &[100.0, 200.0]);
        assert_eq!(amps, vec![0.5, 0.25]);
    }

    #[test]
    fn weighted_level_adds_curve() {
        let mut plain = vec![0.5, 0.5];
        let mut weighted = plain.clone();
        let freqs = [100.0, 1000.0];
        Level::spl(false).apply(&mut plain, &freqs);
        Level::spl(true).apply(&mut weighted, &freqs);
        assert!((weighted[0] - plain[0] - a_weighting(100.0)).abs() < 1e-4);
        assert!((weighted[1] - plain[1]).abs() < 0.01);
    }

    #[test]
    fn unit_labels() {
        assert_eq!(Level::spl(true).unit_label(), "dB SPL(A)");
        assert_eq!(Level::spl(false).unit_label(), "dB SPL");
        assert_eq!(Level::linear().unit_label(), "amplitude");
    }
}

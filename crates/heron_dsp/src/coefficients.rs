//! BiQuad Coefficient Design
//!
//! Closed-form low-shelf, peaking and high-shelf designs from the
//! RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.
//! Coefficients are computed in f64 and stored as f32 with a0 normalized to 1.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::eq::BandRole;
use crate::error::DspError;

/// Normalized second-order section: H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::neutral()
    }
}

impl BiquadCoefficients {
    /// Unity-gain pass-through section
    pub const fn neutral() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Design a section for `role`
    ///
    /// Fails when the frequency is not strictly inside (0, Nyquist), when Q is
    /// not positive, or when the equations produce a non-finite value.
    pub fn design(
        role: BandRole,
        frequency: f32,
        gain_db: f32,
        q: f32,
        sample_rate: f32,
    ) -> Result<Self, DspError> {
        let degenerate = DspError::DegenerateDesign {
            frequency,
            sample_rate,
        };

        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        let in_band = frequency > 0.0 && frequency < sample_rate / 2.0;
        if !in_band || !(q > 0.0) || !gain_db.is_finite() {
            return Err(degenerate);
        }

        let fs = sample_rate as f64;
        let f0 = frequency as f64;
        let q = q as f64;

        let a = 10.0_f64.powf(gain_db as f64 / 40.0);
        let omega = 2.0 * PI * f0 / fs;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match role {
            BandRole::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            ),
            BandRole::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
            BandRole::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
        };

        if a0 == 0.0 || !a0.is_finite() {
            return Err(degenerate);
        }

        let coeffs = Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        };

        if coeffs.is_finite() {
            Ok(coeffs)
        } else {
            Err(degenerate)
        }
    }

    /// Like [`design`](Self::design), but falls back to the neutral section
    ///
    /// Returns the section together with whether the fallback was taken.
    pub fn design_or_neutral(
        role: BandRole,
        frequency: f32,
        gain_db: f32,
        q: f32,
        sample_rate: f32,
    ) -> (Self, bool) {
        match Self::design(role, frequency, gain_db, q, sample_rate) {
            Ok(coeffs) => (coeffs, false),
            Err(_) => (Self::neutral(), true),
        }
    }

    /// Complex frequency response at `frequency` for a section designed at `sample_rate`
    pub fn response(&self, frequency: f64, sample_rate: f64) -> Complex<f64> {
        let omega = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;

        let num = Complex::new(self.b0 as f64, 0.0) + z1 * self.b1 as f64 + z2 * self.b2 as f64;
        let den = Complex::new(1.0, 0.0) + z1 * self.a1 as f64 + z2 * self.a2 as f64;
        num / den
    }

    /// Magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        20.0 * self.response(frequency, sample_rate).norm().max(1e-12).log10()
    }
}

impl From<BiquadCoefficients> for biquad::Coefficients<f32> {
    fn from(c: BiquadCoefficients) -> Self {
        biquad::Coefficients {
            a1: c.a1,
            a2: c.a2,
            b0: c.b0,
            b1: c.b1,
            b2: c.b2,
        }
    }
}

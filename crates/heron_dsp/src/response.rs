//! Analytic Frequency Response
//!
//! Evaluates the cascade's transfer function from a published coefficient
//! snapshot, for drawing the EQ curve. Never used on the audio path.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::coefficients::BiquadCoefficients;
use crate::eq::{Band, BandParams, ProcessingMode, MAX_FREQUENCY, MIN_FREQUENCY, NUM_BANDS};
use crate::error::DspError;

/// Sample rate assumed before the processor has been prepared
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

/// Every band's coefficients plus the rate they were designed at
///
/// Published as a whole value; readers never see a mix of two updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSnapshot {
    pub coefficients: [BiquadCoefficients; NUM_BANDS],
    /// Rate the cascade runs at (host rate times the oversampling factor)
    pub sample_rate: f32,
    pub mode: ProcessingMode,
    /// Monotonic publish counter
    pub generation: u64,
}

impl Default for CoefficientSnapshot {
    fn default() -> Self {
        Self::flat(DEFAULT_SAMPLE_RATE, ProcessingMode::default())
    }
}

impl CoefficientSnapshot {
    /// All bands neutral
    pub fn flat(sample_rate: f32, mode: ProcessingMode) -> Self {
        Self {
            coefficients: [BiquadCoefficients::neutral(); NUM_BANDS],
            sample_rate,
            mode,
            generation: 0,
        }
    }

    /// Design every band for `host_sample_rate` in `mode`
    ///
    /// Bands whose design degenerates fall back to neutral; the returned
    /// mask marks them.
    pub fn design(
        params: &[BandParams; NUM_BANDS],
        host_sample_rate: f32,
        mode: ProcessingMode,
    ) -> (Self, [bool; NUM_BANDS]) {
        let sample_rate = host_sample_rate * mode.oversampling_factor() as f32;
        let mut degenerate = [false; NUM_BANDS];
        let mut snapshot = Self::flat(sample_rate, mode);

        for (i, p) in params.iter().enumerate() {
            match Band::new(i, *p).to_coefficients(sample_rate, mode) {
                Ok(c) => snapshot.coefficients[i] = c,
                Err(_) => degenerate[i] = true,
            }
        }
        (snapshot, degenerate)
    }

    /// Complex response of the whole cascade at `frequency`
    pub fn response(&self, frequency: f32) -> Complex<f64> {
        let fs = self.sample_rate as f64;
        self.coefficients
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, c| acc * c.response(frequency as f64, fs))
    }

    /// Cascade magnitude in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f32) -> f32 {
        (20.0 * self.response(frequency).norm().max(1e-12).log10()) as f32
    }

    /// Magnitude of a single band in dB at `frequency`
    pub fn band_magnitude_db(&self, band: usize, frequency: f32) -> Result<f32, DspError> {
        let c = self
            .coefficients
            .get(band)
            .ok_or(DspError::InvalidBandIndex(band))?;
        Ok(c.magnitude_db(frequency as f64, self.sample_rate as f64) as f32)
    }

    /// Cascade phase in radians at `frequency`
    pub fn phase(&self, frequency: f32) -> f32 {
        self.response(frequency).arg() as f32
    }

    /// Magnitudes in dB at each of `frequencies`
    pub fn curve(&self, frequencies: &[f32]) -> Vec<f32> {
        frequencies.iter().map(|&f| self.magnitude_db(f)).collect()
    }

    /// `(frequency, dB)` pairs over the audible range, log-spaced
    pub fn log_curve(&self, num_points: usize) -> Vec<(f32, f32)> {
        log_frequencies(num_points, MIN_FREQUENCY, MAX_FREQUENCY)
            .into_iter()
            .map(|f| (f, self.magnitude_db(f)))
            .collect()
    }
}

/// `num_points` frequencies from `min` to `max`, evenly spaced on a log axis
pub fn log_frequencies(num_points: usize, min: f32, max: f32) -> Vec<f32> {
    match num_points {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let ratio = (max / min).ln();
            (0..n)
                .map(|i| min * (ratio * i as f32 / (n - 1) as f32).exp())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_params() -> [BandParams; NUM_BANDS] {
        core::array::from_fn(BandParams::default_for)
    }

    #[test]
    fn test_flat_bands_are_0db_everywhere() {
        let (snapshot, degenerate) =
            CoefficientSnapshot::design(&flat_params(), 48_000.0, ProcessingMode::ZeroLatency);
        assert!(!degenerate.iter().any(|&d| d));

        for f in log_frequencies(50, 20.0, 20_000.0) {
            assert!(snapshot.magnitude_db(f).abs() < 0.01, "{f}Hz");
        }
    }

    #[test]
    fn test_peak_band_at_44100() {
        let mut params = flat_params();
        params[3] = BandParams::new(1000.0, 6.0, 1.0);
        let (snapshot, _) =
            CoefficientSnapshot::design(&params, 44_100.0, ProcessingMode::ZeroLatency);

        assert!((snapshot.magnitude_db(1000.0) - 6.0).abs() < 0.05);
        assert!(snapshot.magnitude_db(20.0).abs() < 0.2);
        assert!(snapshot.magnitude_db(20_000.0).abs() < 0.2);
    }

    #[test]
    fn test_oversampled_design_keeps_center_frequency() {
        let mut params = flat_params();
        params[3] = BandParams::new(1000.0, 6.0, 1.0);
        let (snapshot, _) =
            CoefficientSnapshot::design(&params, 44_100.0, ProcessingMode::Oversampled);

        assert_eq!(snapshot.sample_rate, 88_200.0);
        assert!((snapshot.magnitude_db(1000.0) - 6.0).abs() < 0.05);
    }

    #[test]
    fn test_low_shelf_cut() {
        let mut params = flat_params();
        params[0] = BandParams::new(80.0, -12.0, 0.707);
        let (snapshot, _) =
            CoefficientSnapshot::design(&params, 48_000.0, ProcessingMode::ZeroLatency);

        let below = snapshot.magnitude_db(30.0);
        let above = snapshot.magnitude_db(1000.0);
        assert!(below < above - 6.0, "below {below}dB, above {above}dB");
        assert!(above.abs() < 0.5);
    }

    #[test]
    fn test_cascade_equals_sum_of_bands() {
        let mut params = flat_params();
        params[0] = BandParams::new(60.0, 4.0, 0.7);
        params[2] = BandParams::new(400.0, -6.0, 2.0);
        params[5] = BandParams::new(5000.0, 3.0, 1.5);
        let (snapshot, _) =
            CoefficientSnapshot::design(&params, 48_000.0, ProcessingMode::ZeroLatency);

        for f in [50.0, 400.0, 2000.0, 5000.0, 15_000.0] {
            let sum: f32 = (0..NUM_BANDS)
                .map(|b| snapshot.band_magnitude_db(b, f).unwrap())
                .sum();
            assert!((snapshot.magnitude_db(f) - sum).abs() < 1e-3, "{f}Hz");
        }
    }

    #[test]
    fn test_degenerate_band_falls_back_to_neutral() {
        let mut params = flat_params();
        params[6] = BandParams::new(20_000.0, 12.0, 1.0);
        let (snapshot, degenerate) =
            CoefficientSnapshot::design(&params, 22_050.0, ProcessingMode::ZeroLatency);

        assert!(degenerate[6]);
        assert!(snapshot.coefficients[6].is_neutral());
        assert!(degenerate[..6].iter().all(|&d| !d));
    }

    #[test]
    fn test_band_index_out_of_range() {
        let snapshot = CoefficientSnapshot::default();
        assert_eq!(
            snapshot.band_magnitude_db(NUM_BANDS, 1000.0),
            Err(DspError::InvalidBandIndex(NUM_BANDS))
        );
    }

    #[test]
    fn test_neutral_phase_is_zero() {
        let snapshot = CoefficientSnapshot::default();
        assert_eq!(snapshot.phase(1000.0), 0.0);
    }

    #[test]
    fn test_log_frequencies() {
        let f = log_frequencies(3, 20.0, 20_000.0);
        assert_eq!(f.len(), 3);
        assert!((f[0] - 20.0).abs() < 1e-3);
        assert!((f[1] - 632.46).abs() < 0.1);
        assert!((f[2] - 20_000.0).abs() < 0.1);
        assert!(log_frequencies(0, 20.0, 20_000.0).is_empty());

        let curve = CoefficientSnapshot::default().log_curve(16);
        assert_eq!(curve.len(), 16);
        assert!(curve.iter().all(|&(_, db)| db.abs() < 1e-6));
    }
}

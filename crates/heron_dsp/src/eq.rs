//! 7-Band Parametric Equalizer Model
//!
//! Band layout, parameter ranges and processing modes.
//! The first band is a low shelf, the last a high shelf, everything
//! in between is a peaking filter. Roles are positional and fixed.

use serde::{Deserialize, Serialize};

use crate::coefficients::BiquadCoefficients;
use crate::error::DspError;

/// Number of EQ bands
pub const NUM_BANDS: usize = 7;

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20_000.0;
pub const MIN_GAIN_DB: f32 = -24.0;
pub const MAX_GAIN_DB: f32 = 24.0;
pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 10.0;
pub const DEFAULT_Q: f32 = 1.0;

/// Nominal frequency range of each band (Hz)
///
/// Used for default band placement and for the normalized
/// parameter mapping exchanged with the session layer.
pub const BAND_RANGES: [(f32, f32); NUM_BANDS] = [
    (20.0, 80.0),      // Sub-bass
    (70.0, 300.0),     // Bass
    (250.0, 600.0),    // Low midrange
    (500.0, 2500.0),   // Midrange
    (2000.0, 5000.0),  // Upper midrange
    (4000.0, 7000.0),  // Presence
    (6000.0, 20000.0), // Brilliance
];

/// Q multiplier applied to shelves in oversampled mode
const OVERSAMPLED_SHELF_Q_SCALE: f32 = 0.7;
/// Q multiplier applied to peaks in oversampled mode
const OVERSAMPLED_PEAK_Q_SCALE: f32 = 1.5;

/// Filter shape of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandRole {
    LowShelf,
    Peak,
    HighShelf,
}

impl BandRole {
    /// Role of the band at `index`: shelves at both ends, peaks in between
    pub fn for_index(index: usize) -> Self {
        match index {
            0 => BandRole::LowShelf,
            i if i == NUM_BANDS - 1 => BandRole::HighShelf,
            _ => BandRole::Peak,
        }
    }
}

/// Global processing quality/latency tradeoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Direct processing, no added latency
    #[default]
    ZeroLatency,
    /// 2x oversampled processing with a linear-phase resampler
    Oversampled,
}

impl ProcessingMode {
    /// Internal rate multiplier for the filter cascade
    pub fn oversampling_factor(self) -> usize {
        match self {
            ProcessingMode::ZeroLatency => 1,
            ProcessingMode::Oversampled => 2,
        }
    }

    /// Q actually fed into the design equations for a band of `role`
    pub fn effective_q(self, role: BandRole, q: f32) -> f32 {
        match (self, role) {
            (ProcessingMode::ZeroLatency, _) => q,
            (ProcessingMode::Oversampled, BandRole::Peak) => q * OVERSAMPLED_PEAK_Q_SCALE,
            (ProcessingMode::Oversampled, _) => q * OVERSAMPLED_SHELF_Q_SCALE,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ProcessingMode::ZeroLatency => 0,
            ProcessingMode::Oversampled => 1,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ProcessingMode::Oversampled,
            _ => ProcessingMode::ZeroLatency,
        }
    }
}

/// Frequency/gain/Q triple for one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
}

impl BandParams {
    pub fn new(frequency: f32, gain_db: f32, q: f32) -> Self {
        Self {
            frequency,
            gain_db,
            q,
        }
    }

    /// Default parameters for the band at `index`: flat, centered in its nominal range
    pub fn default_for(index: usize) -> Self {
        let (lo, hi) = BAND_RANGES[index.min(NUM_BANDS - 1)];
        Self::new((lo + hi) / 2.0, 0.0, DEFAULT_Q)
    }

    /// Clamp every field into its valid range
    ///
    /// NaN inputs fall back to the lower bound so they never reach the filters.
    pub fn clamped(self) -> Self {
        Self {
            frequency: clamp_or_min(self.frequency, MIN_FREQUENCY, MAX_FREQUENCY),
            gain_db: clamp_or_min(self.gain_db, MIN_GAIN_DB, MAX_GAIN_DB),
            q: clamp_or_min(self.q, MIN_Q, MAX_Q),
        }
    }
}

fn clamp_or_min(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// A band: positional role plus its current parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub role: BandRole,
    pub params: BandParams,
}

impl Band {
    pub fn new(index: usize, params: BandParams) -> Self {
        Self {
            role: BandRole::for_index(index),
            params: params.clamped(),
        }
    }

    /// Design the biquad for this band
    ///
    /// `sample_rate` is the rate the cascade runs at, which is the host rate
    /// multiplied by the mode's oversampling factor.
    pub fn to_coefficients(
        self,
        sample_rate: f32,
        mode: ProcessingMode,
    ) -> Result<BiquadCoefficients, DspError> {
        let q = mode.effective_q(self.role, self.params.q);
        BiquadCoefficients::design(
            self.role,
            self.params.frequency,
            self.params.gain_db,
            q,
            sample_rate,
        )
    }
}

/// Default band set: flat response, bands centered in their nominal ranges
pub fn default_bands() -> [Band; NUM_BANDS] {
    core::array::from_fn(|i| Band::new(i, BandParams::default_for(i)))
}

/// Convert dB gain to linear amplitude
/// Formula: amplitude = 10^(dB/20)
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_band_is_low_shelf() {
        assert_eq!(BandRole::for_index(0), BandRole::LowShelf);
    }

    #[test]
    fn test_last_band_is_high_shelf() {
        assert_eq!(BandRole::for_index(NUM_BANDS - 1), BandRole::HighShelf);
    }

    #[test]
    fn test_middle_bands_are_peaking() {
        for i in 1..NUM_BANDS - 1 {
            assert_eq!(BandRole::for_index(i), BandRole::Peak);
        }
    }

    #[test]
    fn test_default_bands_are_flat_and_centered() {
        let bands = default_bands();
        for (i, band) in bands.iter().enumerate() {
            let (lo, hi) = BAND_RANGES[i];
            assert_eq!(band.params.gain_db, 0.0);
            assert_eq!(band.params.q, DEFAULT_Q);
            assert_eq!(band.params.frequency, (lo + hi) / 2.0);
        }
    }

    #[test]
    fn test_clamping() {
        let p = BandParams::new(5.0, 100.0, 50.0).clamped();
        assert_eq!(p.frequency, MIN_FREQUENCY);
        assert_eq!(p.gain_db, MAX_GAIN_DB);
        assert_eq!(p.q, MAX_Q);

        let p = BandParams::new(1.0e6, -100.0, 0.0).clamped();
        assert_eq!(p.frequency, MAX_FREQUENCY);
        assert_eq!(p.gain_db, MIN_GAIN_DB);
        assert_eq!(p.q, MIN_Q);

        let p = BandParams::new(f32::NAN, f32::NAN, f32::NAN).clamped();
        assert_eq!(p, BandParams::new(MIN_FREQUENCY, MIN_GAIN_DB, MIN_Q));
    }

    #[test]
    fn test_effective_q() {
        let zl = ProcessingMode::ZeroLatency;
        let os = ProcessingMode::Oversampled;
        assert_eq!(zl.effective_q(BandRole::Peak, 2.0), 2.0);
        assert_eq!(zl.effective_q(BandRole::LowShelf, 2.0), 2.0);
        assert!((os.effective_q(BandRole::Peak, 2.0) - 3.0).abs() < 1e-6);
        assert!((os.effective_q(BandRole::LowShelf, 2.0) - 1.4).abs() < 1e-6);
        assert!((os.effective_q(BandRole::HighShelf, 2.0) - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_mode_round_trip_through_u8() {
        for mode in [ProcessingMode::ZeroLatency, ProcessingMode::Oversampled] {
            assert_eq!(ProcessingMode::from_u8(mode.to_u8()), mode);
        }
        assert_eq!(ProcessingMode::from_u8(42), ProcessingMode::ZeroLatency);
    }

    #[test]
    fn test_db_to_amplitude() {
        assert!((db_to_amplitude(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_amplitude(20.0) - 10.0).abs() < 1e-4);
        assert!((db_to_amplitude(-6.0) - 0.501).abs() < 1e-3);
    }
}

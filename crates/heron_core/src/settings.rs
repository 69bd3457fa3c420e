//! Session State
//!
//! Band settings as a host or preset file stores them: every value
//! normalized to `[0, 1]` through a skewed range, plus the latency mode.
//! JSON via serde_json.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use heron_dsp::{
    BandParams, ProcessingMode, BAND_RANGES, MAX_GAIN_DB, MAX_Q, MIN_GAIN_DB, MIN_Q, NUM_BANDS,
};

use crate::error::{EngineError, EngineResult};

/// Linear range with a power-law skew
///
/// `value = start + (end - start) * norm^(1 / skew)`. A skew below 1
/// spends more of the normalized range on the low end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalisableRange {
    pub start: f32,
    pub end: f32,
    pub skew: f32,
}

impl NormalisableRange {
    pub const fn new(start: f32, end: f32, skew: f32) -> Self {
        Self { start, end, skew }
    }

    /// Map a plain value into `[0, 1]`, clamping to the range first
    pub fn to_normalized(&self, value: f32) -> f32 {
        let value = if value.is_nan() {
            self.start
        } else {
            value.clamp(self.start, self.end)
        };
        let proportion = (value - self.start) / (self.end - self.start);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        let proportion = if self.skew == 1.0 {
            normalized
        } else {
            normalized.powf(1.0 / self.skew)
        };
        self.start + (self.end - self.start) * proportion
    }
}

pub const GAIN_RANGE: NormalisableRange = NormalisableRange::new(MIN_GAIN_DB, MAX_GAIN_DB, 1.0);
pub const Q_RANGE: NormalisableRange = NormalisableRange::new(MIN_Q, MAX_Q, 0.5);

/// Frequency range of `band`: its nominal range, skewed toward the low end
pub fn frequency_range(band: usize) -> NormalisableRange {
    let (start, end) = BAND_RANGES[band.min(NUM_BANDS - 1)];
    NormalisableRange::new(start, end, 0.5)
}

/// Q ceilings per band for musical limiting
const MUSICAL_Q_CAPS: [f32; NUM_BANDS] = [0.8, 1.0, 1.2, 1.5, 1.8, 2.0, 1.5];

/// Limit Q to a musically useful width
///
/// Each band has a ceiling, and large boosts or cuts are widened further.
pub fn musical_q(band: usize, gain_db: f32, q: f32) -> f32 {
    let mut q = q.min(MUSICAL_Q_CAPS[band.min(NUM_BANDS - 1)]);
    if gain_db.abs() > 10.0 {
        q *= 0.7;
    } else if gain_db.abs() > 6.0 {
        q *= 0.85;
    }
    q.clamp(MIN_Q, MAX_Q)
}

/// One band with every value in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBand {
    pub frequency: f32,
    pub gain: f32,
    pub q: f32,
}

impl NormalizedBand {
    pub fn from_params(band: usize, params: &BandParams) -> Self {
        Self {
            frequency: frequency_range(band).to_normalized(params.frequency),
            gain: GAIN_RANGE.to_normalized(params.gain_db),
            q: Q_RANGE.to_normalized(params.q),
        }
    }

    pub fn to_params(&self, band: usize) -> BandParams {
        BandParams::new(
            frequency_range(band).from_normalized(self.frequency),
            GAIN_RANGE.from_normalized(self.gain),
            Q_RANGE.from_normalized(self.q),
        )
    }
}

fn default_zero_latency() -> bool {
    true
}

/// Persisted EQ state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub bands: [NormalizedBand; NUM_BANDS],
    #[serde(default = "default_zero_latency")]
    pub zero_latency: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        let defaults: [BandParams; NUM_BANDS] = core::array::from_fn(BandParams::default_for);
        Self::from_params(&defaults, ProcessingMode::ZeroLatency)
    }
}

impl SessionState {
    pub fn from_params(params: &[BandParams; NUM_BANDS], mode: ProcessingMode) -> Self {
        Self {
            bands: core::array::from_fn(|band| NormalizedBand::from_params(band, &params[band])),
            zero_latency: mode == ProcessingMode::ZeroLatency,
        }
    }

    /// Plain band parameters, optionally with musical Q limiting
    pub fn to_params(&self, musical: bool) -> [BandParams; NUM_BANDS] {
        core::array::from_fn(|band| {
            let mut params = self.bands[band].to_params(band);
            if musical {
                params.q = musical_q(band, params.gain_db, params.q);
            }
            params
        })
    }

    pub fn mode(&self) -> ProcessingMode {
        if self.zero_latency {
            ProcessingMode::ZeroLatency
        } else {
            ProcessingMode::Oversampled
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a session file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let file = fs::File::open(path)
            .map_err(|e| EngineError::Config(format!("Failed to open {:?}: {}", path, e)))?;
        let session = serde_json::from_reader(file)?;
        info!("Session loaded from {:?}", path);
        Ok(session)
    }

    /// Write a session file, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::Config(e.to_string()))?;
        }
        let file = fs::File::create(path).map_err(|e| EngineError::Config(e.to_string()))?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Session saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_range_is_linear() {
        assert_eq!(GAIN_RANGE.from_normalized(0.5), 0.0);
        assert_eq!(GAIN_RANGE.from_normalized(0.0), -24.0);
        assert_eq!(GAIN_RANGE.to_normalized(12.0), 0.75);
    }

    #[test]
    fn test_q_range_is_skewed() {
        // norm^(1/0.5) = 0.25 of the span
        assert!((Q_RANGE.from_normalized(0.5) - 2.575).abs() < 1e-4);
        assert!((Q_RANGE.from_normalized(1.0) - 10.0).abs() < 1e-5);
        assert_eq!(Q_RANGE.to_normalized(0.1), 0.0);
    }

    #[test]
    fn test_frequency_uses_band_range() {
        let (start, end) = BAND_RANGES[3];
        let range = frequency_range(3);
        assert_eq!(range.from_normalized(0.0), start);
        assert_eq!(range.from_normalized(1.0), end);
        // Values outside the band's range clamp to it
        assert_eq!(range.to_normalized(end * 4.0), 1.0);
    }

    #[test]
    fn test_value_round_trip() {
        for band in 0..NUM_BANDS {
            let (start, end) = BAND_RANGES[band];
            let params = BandParams::new(start + (end - start) * 0.3, -7.5, 3.3);
            let restored = NormalizedBand::from_params(band, &params).to_params(band);
            assert!((restored.frequency - params.frequency).abs() < 0.05);
            assert!((restored.gain_db - params.gain_db).abs() < 1e-4);
            assert!((restored.q - params.q).abs() < 1e-4);
        }
    }

    #[test]
    fn test_nan_maps_to_range_start() {
        assert_eq!(GAIN_RANGE.from_normalized(f32::NAN), -24.0);
        assert_eq!(Q_RANGE.to_normalized(f32::NAN), 0.0);
    }

    #[test]
    fn test_musical_q() {
        assert_eq!(musical_q(0, 0.0, 5.0), 0.8);
        assert!((musical_q(5, 8.0, 3.0) - 1.7).abs() < 1e-6);
        assert!((musical_q(3, -12.0, 1.0) - 0.7).abs() < 1e-6);
        assert_eq!(musical_q(2, 0.0, 0.05), MIN_Q);
        assert_eq!(musical_q(2, 0.0, 0.5), 0.5);
    }

    #[test]
    fn test_default_session_is_flat() {
        let session = SessionState::default();
        assert!(session.zero_latency);
        assert_eq!(session.mode(), ProcessingMode::ZeroLatency);
        for params in session.to_params(false) {
            assert!(params.gain_db.abs() < 1e-4);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let mut session = SessionState::default();
        session.bands[2].gain = 0.8;
        session.zero_latency = false;

        let json = session.to_json().unwrap();
        let restored = SessionState::from_json(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.mode(), ProcessingMode::Oversampled);
    }

    #[test]
    fn test_missing_mode_defaults_to_zero_latency() {
        let band = r#"{ "frequency": 0.5, "gain": 0.5, "q": 0.3 }"#;
        let json = format!(r#"{{ "bands": [{b}, {b}, {b}, {b}, {b}, {b}, {b}] }}"#, b = band);
        let session = SessionState::from_json(&json).unwrap();
        assert!(session.zero_latency);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SessionState::from_json("{ not json"),
            Err(EngineError::Serialization(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("heron-session-{}", std::process::id()))
            .join("session.json");
        let mut session = SessionState::default();
        session.bands[6].q = 0.9;

        session.save(&path).unwrap();
        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded, session);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}

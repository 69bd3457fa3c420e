//! DSP Error Types

use thiserror::Error;

use crate::eq::NUM_BANDS;

/// Errors that can occur during DSP operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid band index: {0} (must be 0-{max})", max = NUM_BANDS - 1)]
    InvalidBandIndex(usize),

    #[error("Degenerate filter design for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    DegenerateDesign { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Buffer size mismatch: expected at most {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Channel count mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("Processor used before prepare()")]
    NotPrepared,

    #[error("Invalid analysis window size: {0} (must be even and at least 16)")]
    InvalidWindowSize(usize),

    #[error("Invalid level range: floor {floor}dB must be finite and below ceiling {ceiling}dB")]
    InvalidLevelRange { floor: f32, ceiling: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DspError::InvalidBandIndex(15);
        assert!(err.to_string().contains("15"));
        assert!(err.to_string().contains("0-6"));

        let err = DspError::DegenerateDesign {
            frequency: 30000.0,
            sample_rate: 48000.0,
        };
        assert!(err.to_string().contains("30000"));

        let err = DspError::BufferSizeMismatch {
            expected: 512,
            got: 1024,
        };
        assert!(err.to_string().contains("1024"));

        let err = DspError::InvalidLevelRange {
            floor: 0.0,
            ceiling: -100.0,
        };
        assert!(err.to_string().contains("-100"));
    }
}

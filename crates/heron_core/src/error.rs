//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the EQ engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("DSP error: {0}")]
    Dsp(#[from] heron_dsp::DspError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Processor used before prepare()")]
    NotPrepared,

    #[error("Block too large: at most {max} frames per call, got {got}")]
    BlockTooLarge { max: usize, got: usize },

    #[error("Channel count mismatch: prepared for {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("Command queue full - audio thread is not draining commands")]
    ChannelSendError,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::BlockTooLarge { max: 512, got: 4096 };
        assert!(err.to_string().contains("4096"));

        let err = EngineError::Config("bad sample rate".into());
        assert!(err.to_string().contains("bad sample rate"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = heron_dsp::DspError::InvalidBandIndex(10);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::Dsp(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::Serialization(_)));
    }
}

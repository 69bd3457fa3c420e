//! Heron DSP - Digital Signal Processing Module
//!
//! This crate provides the signal-processing building blocks for Heron:
//! - 7-band parametric equalizer model (low shelf, 5 peaks, high shelf)
//! - RBJ cookbook coefficient design and a series BiQuad cascade
//! - 2x polyphase oversampling around the cascade
//! - FFT spectrum estimator for real-time visualization
//! - Analytic frequency response for drawing the EQ curve
//! - Linear parameter smoothing, denormal protection and test signals
//!
//! # Architecture
//!
//! The DSP chain follows a strict "no allocation in audio callback" rule.
//! Everything that allocates happens in `new()`/`prepare()`; the per-block
//! paths only touch preallocated state.

mod buffer;
mod cascade;
mod coefficients;
mod denormal;
mod eq;
mod error;
mod fft;
mod oversampling;
mod processor;
mod response;
mod smoothing;
mod test_signal;

pub use buffer::AudioBlock;
pub use cascade::FilterCascade;
pub use coefficients::BiquadCoefficients;
pub use denormal::DenormalGuard;
pub use eq::{
    db_to_amplitude, default_bands, Band, BandParams, BandRole, ProcessingMode, BAND_RANGES,
    DEFAULT_Q, MAX_FREQUENCY, MAX_GAIN_DB, MAX_Q, MIN_FREQUENCY, MIN_GAIN_DB, MIN_Q, NUM_BANDS,
};
pub use error::DspError;
pub use fft::{
    EstimatorState, SpectrumConfig, SpectrumEstimator, SpectrumHandle, DEFAULT_UPDATE_INTERVAL,
    DEFAULT_WINDOW_SIZE,
};
pub use oversampling::{Oversampler, OVERSAMPLING_FACTOR};
pub use processor::{AudioProcessor, ProcessContext};
pub use response::{log_frequencies, CoefficientSnapshot, DEFAULT_SAMPLE_RATE};
pub use smoothing::{LinearSmoother, DEFAULT_SMOOTHING_SECONDS};
pub use test_signal::{TestSignal, TestSignalConfig, Waveform};

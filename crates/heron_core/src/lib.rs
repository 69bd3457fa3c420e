//! Heron Core - EQ Engine
//!
//! This crate wires the `heron_dsp` building blocks into a real-time engine:
//! - Lock-free band parameter store with per-block smoothing
//! - Audio-thread processor (zero-latency or 2x oversampled cascade)
//! - Control handle for parameters, mode, spectrum and response queries
//! - Normalized session state for hosts and preset files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Control Threads                         │
//! │   EqController ──targets/mode──▶ SharedState (atomics)      │
//! │        │  ▲                             │                   │
//! │  rtrb  │  │ crossbeam        RwLock     │                   │
//! │ commands  events          (try_write)   ▼                   │
//! └────────┼──┼─────────────────────────────┼───────────────────┘
//!          ▼  │                             │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   EqProcessor: smoothing ▶ design ▶ [2x up] ▶ cascade       │
//! │                ▶ [2x down] ▶ spectrum tap                   │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod engine;
mod error;
mod message;
mod params;
mod processor;
mod settings;
mod shared;

pub use config::{EngineConfig, StreamConfig};
pub use engine::EqController;
pub use error::{EngineError, EngineResult};
pub use message::{Command, Event};
pub use params::{BandParameterStore, BandTargets};
pub use processor::EqProcessor;
pub use settings::{
    frequency_range, musical_q, NormalisableRange, NormalizedBand, SessionState, GAIN_RANGE,
    Q_RANGE,
};
pub use shared::SharedState;

// Re-export DSP types for convenience
pub use heron_dsp::{
    AudioBlock, AudioProcessor, BandParams, BandRole, CoefficientSnapshot, ProcessContext,
    ProcessingMode, SpectrumConfig, SpectrumHandle, TestSignalConfig, Waveform, NUM_BANDS,
};

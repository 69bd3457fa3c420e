//! Engine and Stream Configuration

use serde::{Deserialize, Serialize};

use heron_dsp::{ProcessingMode, SpectrumConfig, DEFAULT_SMOOTHING_SECONDS};

/// Host stream format the processor is prepared for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Largest block the host will hand over in one call, in frames
    pub max_block_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            max_block_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds of one full block
    pub fn block_latency_ms(&self) -> f32 {
        (self.max_block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.max_block_size == 0 || self.max_block_size > 8192 {
            return Err(format!("Invalid block size: {}", self.max_block_size));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// Parameter smoothing ramp in milliseconds
    #[serde(default = "default_smoothing_ms")]
    pub smoothing_ms: f32,

    /// Processing mode at startup
    #[serde(default)]
    pub initial_mode: ProcessingMode,

    /// Spectrum estimator settings
    #[serde(default)]
    pub spectrum: SpectrumConfig,

    /// Channel fed to the spectrum estimator (clamped to the channel count)
    #[serde(default)]
    pub spectrum_channel: usize,

    /// Capacity of the control -> audio command queue
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Capacity of the audio -> control event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_smoothing_ms() -> f32 {
    DEFAULT_SMOOTHING_SECONDS * 1000.0
}

fn default_command_capacity() -> usize {
    32
}

fn default_event_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            smoothing_ms: default_smoothing_ms(),
            initial_mode: ProcessingMode::ZeroLatency,
            spectrum: SpectrumConfig::default(),
            spectrum_channel: 0,
            command_capacity: default_command_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                max_block_size: 128, // ~2.6ms
            },
            ..Self::default()
        }
    }

    /// Create config optimized for stability and quality
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                max_block_size: 1024, // ~21ms
            },
            initial_mode: ProcessingMode::Oversampled,
            ..Self::default()
        }
    }

    /// Smoothing ramp in seconds
    pub fn smoothing_seconds(&self) -> f32 {
        self.smoothing_ms / 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        if !(self.smoothing_ms.is_finite() && (0.0..=1000.0).contains(&self.smoothing_ms)) {
            return Err(format!("Invalid smoothing time: {}ms", self.smoothing_ms));
        }
        self.spectrum.validate().map_err(|e| e.to_string())?;
        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err("Queue capacities must be non-zero".to_string());
        }
        Ok(())
    }
}

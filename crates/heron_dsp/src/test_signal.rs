//! Test Signal Generator
//!
//! Sine, white noise and pink noise sources that can replace the input
//! block for calibrating the EQ and the spectrum display.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::buffer::AudioBlock;
use crate::eq::{MAX_FREQUENCY, MIN_FREQUENCY};

const DEFAULT_SEED: u64 = 0x4845_524f_4e;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    WhiteNoise,
    PinkNoise,
}

/// Generator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestSignalConfig {
    pub waveform: Waveform,
    /// Sine frequency in Hz (20 - 20000)
    pub frequency: f32,
    /// Output scale (0.0 - 1.0)
    pub amplitude: f32,
}

impl Default for TestSignalConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 1000.0,
            amplitude: 0.5,
        }
    }
}

impl TestSignalConfig {
    pub fn clamped(self) -> Self {
        Self {
            waveform: self.waveform,
            frequency: if self.frequency.is_nan() {
                MIN_FREQUENCY
            } else {
                self.frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY)
            },
            amplitude: if self.amplitude.is_nan() {
                0.0
            } else {
                self.amplitude.clamp(0.0, 1.0)
            },
        }
    }
}

/// Paul Kellett's refined pink noise filter (-3dB/octave, +/-0.05dB above 9.2Hz at 44.1kHz)
#[derive(Debug, Clone, Copy, Default)]
struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    #[inline]
    fn next(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let pink = b.iter().sum::<f32>() + white * 0.5362;
        b[6] = white * 0.115926;
        // Roughly back into [-1, 1]
        pink * 0.11
    }
}

/// Mono signal source, written identically to every channel
pub struct TestSignal {
    config: TestSignalConfig,
    sample_rate: f32,
    phase: f32,
    rng: StdRng,
    pink: PinkFilter,
}

impl TestSignal {
    pub fn new(config: TestSignalConfig, sample_rate: f32) -> Self {
        Self::with_seed(config, sample_rate, DEFAULT_SEED)
    }

    /// Deterministic noise for reproducible runs
    pub fn with_seed(config: TestSignalConfig, sample_rate: f32, seed: u64) -> Self {
        Self {
            config: config.clamped(),
            sample_rate,
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
            pink: PinkFilter::default(),
        }
    }

    pub fn config(&self) -> &TestSignalConfig {
        &self.config
    }

    /// Change settings without touching the noise state; the sine phase restarts
    pub fn set_config(&mut self, config: TestSignalConfig) {
        let config = config.clamped();
        if config.waveform != self.config.waveform {
            self.reset();
        }
        self.config = config;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.pink = PinkFilter::default();
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = match self.config.waveform {
            Waveform::Sine => {
                let value = self.phase.sin();
                if self.sample_rate > 0.0 {
                    self.phase += std::f32::consts::TAU * self.config.frequency / self.sample_rate;
                    if self.phase >= std::f32::consts::TAU {
                        self.phase -= std::f32::consts::TAU;
                    }
                }
                value
            }
            Waveform::WhiteNoise => self.rng.random_range(-1.0..1.0),
            Waveform::PinkNoise => {
                let white = self.rng.random_range(-1.0..1.0);
                self.pink.next(white)
            }
        };
        value * self.config.amplitude
    }

    /// Overwrite the active frames of every channel in `block`
    ///
    /// # Real-time Safety
    /// No allocations.
    pub fn fill(&mut self, block: &mut AudioBlock) {
        let channels = block.num_channels();
        for frame in 0..block.num_frames() {
            let value = self.next_sample();
            for ch in 0..channels {
                block.channel_mut(ch)[frame] = value;
            }
        }
    }
}

//! FFT Spectrum Estimator
//!
//! Feeds post-EQ audio into a circular history and, at a bounded rate,
//! turns the most recent window into a dB magnitude spectrum for display.
//!
//! # Architecture
//!
//! The estimator itself is owned by the audio thread. Finished spectra are
//! published into a shared frame that any number of [`SpectrumHandle`]s can
//! read. Publishing uses `try_write`, so a reader holding the lock delays
//! the publish by one block instead of blocking the audio thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Default analysis window (power of 2)
/// 1024 samples at 48kHz = ~21ms window, ~47Hz resolution
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Default number of audio blocks between analyses
pub const DEFAULT_UPDATE_INTERVAL: u32 = 4;

/// Linear magnitude floor before the dB conversion
const MAGNITUDE_FLOOR: f32 = 1e-6;

/// Smoothing factor for spectrum decay (0.0 = instant, 1.0 = no decay)
const SPECTRUM_DECAY: f32 = 0.7;

/// Attack factor for spectrum rise (higher = faster response to new peaks)
const SPECTRUM_ATTACK: f32 = 0.5;

/// Spectrum estimator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// FFT length in samples
    pub window_size: usize,
    /// Audio blocks between analyses
    pub update_interval: u32,
    /// Lowest reported level in dB
    pub floor_db: f32,
    /// Highest reported level in dB
    pub ceiling_db: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            floor_db: -100.0,
            ceiling_db: 0.0,
        }
    }
}

impl SpectrumConfig {
    pub fn validate(&self) -> Result<(), DspError> {
        if self.window_size < 16 || self.window_size % 2 != 0 {
            return Err(DspError::InvalidWindowSize(self.window_size));
        }
        let finite = self.floor_db.is_finite() && self.ceiling_db.is_finite();
        if !finite || self.floor_db >= self.ceiling_db {
            return Err(DspError::InvalidLevelRange {
                floor: self.floor_db,
                ceiling: self.ceiling_db,
            });
        }
        Ok(())
    }

    /// Number of published bins (`window_size / 2`)
    pub fn num_bins(&self) -> usize {
        self.window_size / 2
    }

    /// Center frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.window_size as f32
    }
}

/// Hann window: 0 at both edges, 1 at the center
fn hann_window(n: usize, size: usize) -> f32 {
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos())
}

/// Estimator lifecycle
///
/// `Idle` -> samples arrive -> `Accumulating` -> analysis -> `Ready`
/// -> published -> `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorState {
    Idle,
    Accumulating,
    /// A spectrum is computed but not yet published
    Ready,
}

/// Raw and display-smoothed spectra, always replaced together
#[derive(Debug, Clone)]
struct SpectrumFrame {
    raw: Vec<f32>,
    smoothed: Vec<f32>,
}

#[derive(Debug)]
struct SpectrumShared {
    frame: RwLock<SpectrumFrame>,
    generation: AtomicU64,
}

/// Read side of the estimator, cheap to clone
#[derive(Debug, Clone)]
pub struct SpectrumHandle {
    shared: Arc<SpectrumShared>,
    config: SpectrumConfig,
}

impl SpectrumHandle {
    /// Latest published spectrum in dB (`window_size / 2` values)
    pub fn snapshot(&self) -> Vec<f32> {
        self.shared.frame.read().raw.clone()
    }

    /// Latest spectrum with attack/decay ballistics applied
    pub fn smoothed_snapshot(&self) -> Vec<f32> {
        self.shared.frame.read().smoothed.clone()
    }

    /// Copy the latest spectrum into `out` without allocating
    ///
    /// Copies `min(out.len(), num_bins)` values.
    pub fn read_into(&self, out: &mut [f32]) {
        let frame = self.shared.frame.read();
        let n = out.len().min(frame.raw.len());
        out[..n].copy_from_slice(&frame.raw[..n]);
    }

    /// Number of spectra published so far
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Bin with the highest level in the latest spectrum
    pub fn peak_bin(&self) -> Option<usize> {
        let frame = self.shared.frame.read();
        frame
            .raw
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    pub fn num_bins(&self) -> usize {
        self.config.num_bins()
    }

    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        self.config.bin_frequency(bin, sample_rate)
    }
}

/// Audio-side spectrum estimator
///
/// Real-time safe after construction: `push_block` never allocates or blocks.
pub struct SpectrumEstimator {
    config: SpectrumConfig,
    /// Circular history of `2 * window_size` samples
    history: Vec<f32>,
    write_pos: usize,
    new_samples: usize,
    blocks_since_analysis: u32,
    window: Vec<f32>,
    /// Scale that maps a full-scale sine to 0 dB
    normalization: f32,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    pending: Vec<f32>,
    /// Next publish overwrites the smoothed spectrum instead of easing into it
    snap_smoothed: bool,
    state: EstimatorState,
    shared: Arc<SpectrumShared>,
}

impl SpectrumEstimator {
    pub fn new(config: SpectrumConfig) -> Result<Self, DspError> {
        config.validate()?;

        let n = config.window_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let scratch_len = fft.get_inplace_scratch_len();

        let window: Vec<f32> = (0..n).map(|i| hann_window(i, n)).collect();
        let window_sum: f32 = window.iter().sum();

        let floor = vec![config.floor_db; config.num_bins()];
        let shared = Arc::new(SpectrumShared {
            frame: RwLock::new(SpectrumFrame {
                raw: floor.clone(),
                smoothed: floor.clone(),
            }),
            generation: AtomicU64::new(0),
        });

        Ok(Self {
            config,
            history: vec![0.0; 2 * n],
            write_pos: 0,
            new_samples: 0,
            blocks_since_analysis: 0,
            window,
            normalization: 2.0 / window_sum,
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); n],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            pending: floor,
            snap_smoothed: false,
            state: EstimatorState::Idle,
            shared,
        })
    }

    /// Create a reader for the control side
    pub fn handle(&self) -> SpectrumHandle {
        SpectrumHandle {
            shared: Arc::clone(&self.shared),
            config: self.config,
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    /// Append one block of mono samples and analyze/publish when due
    ///
    /// Returns true when a new spectrum was published during this call.
    ///
    /// # Real-time Safety
    /// No allocations, no blocking locks.
    pub fn push_block(&mut self, samples: &[f32]) -> bool {
        let len = self.history.len();
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % len;
        }
        self.new_samples = self.new_samples.saturating_add(samples.len());
        self.blocks_since_analysis = self.blocks_since_analysis.saturating_add(1);

        match self.state {
            // A previous publish was contended; retry before analyzing again
            EstimatorState::Ready => self.try_publish(),
            EstimatorState::Idle | EstimatorState::Accumulating => {
                if self.new_samples >= self.config.window_size
                    && self.blocks_since_analysis >= self.config.update_interval
                {
                    self.analyze();
                    self.try_publish()
                } else {
                    if !samples.is_empty() {
                        self.state = EstimatorState::Accumulating;
                    }
                    false
                }
            }
        }
    }

    /// Clear the history and publish a floor spectrum
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
        self.new_samples = 0;
        self.blocks_since_analysis = 0;
        self.pending.fill(self.config.floor_db);
        self.snap_smoothed = true;
        self.state = EstimatorState::Ready;
        self.try_publish();
    }

    fn analyze(&mut self) {
        let n = self.config.window_size;
        let len = self.history.len();

        // Oldest of the most recent `n` samples first
        let start = (self.write_pos + len - n) % len;
        for (i, (bin, &w)) in self.fft_buffer.iter_mut().zip(&self.window).enumerate() {
            *bin = Complex::new(self.history[(start + i) % len] * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        let (floor, ceiling) = (self.config.floor_db, self.config.ceiling_db);
        for (out, bin) in self.pending.iter_mut().zip(&self.fft_buffer) {
            let magnitude = (bin.norm() * self.normalization).max(MAGNITUDE_FLOOR);
            *out = (20.0 * magnitude.log10()).clamp(floor, ceiling);
        }

        self.new_samples = 0;
        self.blocks_since_analysis = 0;
        self.state = EstimatorState::Ready;
    }

    fn try_publish(&mut self) -> bool {
        let Some(mut frame) = self.shared.frame.try_write() else {
            return false;
        };

        frame.raw.copy_from_slice(&self.pending);
        let SpectrumFrame { raw, smoothed } = &mut *frame;
        for (current, &target) in smoothed.iter_mut().zip(raw.iter()) {
            *current = if self.snap_smoothed {
                target
            } else if target > *current {
                *current + (target - *current) * SPECTRUM_ATTACK
            } else {
                *current * SPECTRUM_DECAY + target * (1.0 - SPECTRUM_DECAY)
            };
        }
        drop(frame);

        self.snap_smoothed = false;
        self.shared.generation.fetch_add(1, Ordering::Release);
        self.state = EstimatorState::Idle;
        true
    }
}

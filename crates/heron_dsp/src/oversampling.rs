//! 2x Polyphase Oversampling
//!
//! Wraps the filter cascade in Oversampled mode:
//! upsample -> cascade at 2x rate -> downsample.
//!
//! # Algorithm
//!
//! A linear-phase half-band lowpass (Kaiser-windowed sinc) is split into
//! even and odd polyphase branches. Interpolation runs both branches on
//! every input sample; decimation feeds even high-rate samples to one
//! branch and odd samples to the other, producing one output per pair.
//! Up and down filters each add (taps - 1) / 2 high-rate samples of delay,
//! so the round trip costs (taps - 1) / 2 host-rate samples.

use std::f64::consts::PI;

use crate::buffer::AudioBlock;
use crate::error::DspError;

/// Internal rate multiplier
pub const OVERSAMPLING_FACTOR: usize = 2;

/// Prototype filter length (odd, so the group delay is a whole number of samples)
const PROTOTYPE_TAPS: usize = 47;

/// Kaiser stopband attenuation target
const STOPBAND_ATTENUATION_DB: f64 = 90.0;

/// Zeroth-order modified Bessel function (series expansion)
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let half = x / 2.0;
    for k in 1..50 {
        term *= (half / k as f64) * (half / k as f64);
        sum += term;
        if term < sum * 1e-12 {
            break;
        }
    }
    sum
}

/// Design the half-band prototype and split it into (even, odd) branches
///
/// Each branch is normalized to a DC sum of 0.5, so both interpolation
/// phases have unity gain and the full filter sums to 1.
fn design_halfband_branches(num_taps: usize) -> (Vec<f32>, Vec<f32>) {
    let m = (num_taps - 1) as f64;
    let cutoff = 0.25; // Half the high-rate Nyquist, in cycles per sample
    let beta = 0.1102 * (STOPBAND_ATTENUATION_DB - 8.7);

    let prototype: Vec<f64> = (0..num_taps)
        .map(|i| {
            let n = i as f64 - m / 2.0;
            let sinc = if n.abs() < 1e-10 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * n).sin() / (PI * n)
            };

            let ratio = (i as f64 - m / 2.0) / (m / 2.0);
            let window = bessel_i0(beta * (1.0 - ratio * ratio).max(0.0).sqrt()) / bessel_i0(beta);
            sinc * window
        })
        .collect();

    let branch = |phase: usize| -> Vec<f32> {
        let taps: Vec<f64> = prototype.iter().skip(phase).step_by(2).copied().collect();
        let sum: f64 = taps.iter().sum();
        taps.iter().map(|t| (t * 0.5 / sum) as f32).collect()
    };

    (branch(0), branch(1))
}

/// One polyphase branch: a short FIR with its own circular history
#[derive(Debug, Clone)]
struct PolyphaseBranch {
    taps: Vec<f32>,
    history: Vec<f32>,
    pos: usize,
}

impl PolyphaseBranch {
    fn new(taps: Vec<f32>) -> Self {
        let len = taps.len();
        Self {
            taps,
            history: vec![0.0; len],
            pos: 0,
        }
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        self.pos = (self.pos + 1) % self.history.len();
        self.history[self.pos] = sample;
    }

    /// Convolution of the taps with the history, newest sample first
    #[inline]
    fn dot(&self) -> f32 {
        let len = self.history.len();
        self.taps
            .iter()
            .enumerate()
            .map(|(k, &tap)| tap * self.history[(self.pos + len - k) % len])
            .sum()
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
    }
}

/// Up/down state for one channel
#[derive(Debug, Clone)]
struct ChannelResampler {
    up_even: PolyphaseBranch,
    up_odd: PolyphaseBranch,
    down_even: PolyphaseBranch,
    down_odd: PolyphaseBranch,
}

impl ChannelResampler {
    fn new(even: &[f32], odd: &[f32]) -> Self {
        Self {
            up_even: PolyphaseBranch::new(even.to_vec()),
            up_odd: PolyphaseBranch::new(odd.to_vec()),
            down_even: PolyphaseBranch::new(even.to_vec()),
            down_odd: PolyphaseBranch::new(odd.to_vec()),
        }
    }

    #[inline]
    fn upsample(&mut self, input: f32) -> (f32, f32) {
        self.up_even.push(input);
        self.up_odd.push(input);
        // Zero-stuffing halves the energy; each phase is scaled back up by the factor
        (self.up_even.dot() * 2.0, self.up_odd.dot() * 2.0)
    }

    #[inline]
    fn downsample(&mut self, first: f32, second: f32) -> f32 {
        self.down_even.push(first);
        let output = self.down_even.dot() + self.down_odd.dot();
        self.down_odd.push(second);
        output
    }

    fn reset(&mut self) {
        self.up_even.reset();
        self.up_odd.reset();
        self.down_even.reset();
        self.down_odd.reset();
    }
}

/// 2x oversampler with an internal high-rate block
pub struct Oversampler {
    even_taps: Vec<f32>,
    odd_taps: Vec<f32>,
    channels: Vec<ChannelResampler>,
    buffer: AudioBlock,
    max_block_size: usize,
}

impl Default for Oversampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Oversampler {
    pub fn new() -> Self {
        let (even_taps, odd_taps) = design_halfband_branches(PROTOTYPE_TAPS);
        Self {
            even_taps,
            odd_taps,
            channels: Vec::new(),
            buffer: AudioBlock::default(),
            max_block_size: 0,
        }
    }

    /// Allocate per-channel state and the high-rate buffer
    ///
    /// Must be called whenever the block size or channel count changes.
    pub fn prepare(&mut self, max_block_size: usize, channels: usize) {
        self.channels = (0..channels)
            .map(|_| ChannelResampler::new(&self.even_taps, &self.odd_taps))
            .collect();
        self.buffer = AudioBlock::new(channels, max_block_size * OVERSAMPLING_FACTOR);
        self.max_block_size = max_block_size;
    }

    /// Clear all filter histories
    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
        self.buffer.clear();
    }

    pub fn factor(&self) -> usize {
        OVERSAMPLING_FACTOR
    }

    /// Round-trip delay in host-rate samples
    pub fn latency_samples(&self) -> usize {
        (PROTOTYPE_TAPS - 1) / 2
    }

    /// Interpolate `input` into the internal high-rate block and return it
    ///
    /// # Real-time Safety
    /// No allocations.
    pub fn process_up(&mut self, input: &AudioBlock) -> Result<&mut AudioBlock, DspError> {
        self.check_block(input)?;

        let frames = input.num_frames();
        self.buffer.set_num_frames(frames * OVERSAMPLING_FACTOR)?;

        for (ch, (resampler, dest)) in self
            .channels
            .iter_mut()
            .zip(self.buffer.channels_mut())
            .enumerate()
        {
            for (i, &sample) in input.channel(ch).iter().enumerate() {
                let (even, odd) = resampler.upsample(sample);
                dest[2 * i] = even;
                dest[2 * i + 1] = odd;
            }
        }

        Ok(&mut self.buffer)
    }

    /// Decimate the internal high-rate block back into `output`
    pub fn process_down(&mut self, output: &mut AudioBlock) -> Result<(), DspError> {
        self.check_block(output)?;

        let frames = self.buffer.num_frames() / OVERSAMPLING_FACTOR;
        output.set_num_frames(frames)?;

        for (ch, (resampler, dest)) in self
            .channels
            .iter_mut()
            .zip(output.channels_mut())
            .enumerate()
        {
            let source = self.buffer.channel(ch);
            for (i, out) in dest.iter_mut().enumerate() {
                *out = resampler.downsample(source[2 * i], source[2 * i + 1]);
            }
        }
        Ok(())
    }

    fn check_block(&self, block: &AudioBlock) -> Result<(), DspError> {
        if self.channels.is_empty() {
            return Err(DspError::NotPrepared);
        }
        if block.num_channels() != self.channels.len() {
            return Err(DspError::ChannelMismatch {
                expected: self.channels.len(),
                got: block.num_channels(),
            });
        }
        if block.num_frames() > self.max_block_size {
            return Err(DspError::BufferSizeMismatch {
                expected: self.max_block_size,
                got: block.num_frames(),
            });
        }
        Ok(())
    }
}

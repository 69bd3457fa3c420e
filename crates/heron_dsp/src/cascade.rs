//! Series BiQuad Filter Cascade
//!
//! Holds one DirectForm2Transposed section per band per channel and runs
//! every channel through band 0 .. band N-1 in order. The combined
//! response is the product of the per-band transfer functions.

use biquad::{Biquad, DirectForm2Transposed};

use crate::buffer::AudioBlock;
use crate::coefficients::BiquadCoefficients;
use crate::eq::NUM_BANDS;
use crate::error::DspError;

type BandFilters = [DirectForm2Transposed<f32>; NUM_BANDS];

fn neutral_filters(coefficients: &[BiquadCoefficients; NUM_BANDS]) -> BandFilters {
    core::array::from_fn(|band| DirectForm2Transposed::<f32>::new(coefficients[band].into()))
}

/// Per-channel filter banks plus the active coefficient set
pub struct FilterCascade {
    // DirectForm2Transposed: better numerical stability than DF1
    filters: Vec<BandFilters>,
    coefficients: [BiquadCoefficients; NUM_BANDS],
    sample_rate: f32,
    max_block_size: usize,
    prepared: bool,
}

impl Default for FilterCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCascade {
    /// Create an unprepared cascade with every band neutral
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            coefficients: [BiquadCoefficients::neutral(); NUM_BANDS],
            sample_rate: 0.0,
            max_block_size: 0,
            prepared: false,
        }
    }

    /// Allocate filter state for `channels` and clear it
    ///
    /// Must be called before processing and whenever the sample rate,
    /// block size or channel count changes. Allocates; never call from
    /// the audio callback.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
    ) -> Result<(), DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(DspError::ChannelMismatch {
                expected: 1,
                got: 0,
            });
        }

        self.filters = (0..channels)
            .map(|_| neutral_filters(&self.coefficients))
            .collect();
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.prepared = true;
        Ok(())
    }

    /// Clear all delay lines
    ///
    /// Reserve this for real discontinuities (stream restart, preset load,
    /// mode change). Coefficient updates do not need it.
    pub fn reset(&mut self) {
        for bank in &mut self.filters {
            for filter in bank.iter_mut() {
                filter.reset_state();
            }
        }
    }

    /// Switch the processing rate without reallocating
    ///
    /// Clears the delay lines: state recorded at one rate is meaningless at another.
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<(), DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        self.reset();
        Ok(())
    }

    /// Swap the coefficients of one band on every channel
    ///
    /// Delay lines are kept, so the change takes effect from the next sample
    /// without a transient from cleared state.
    pub fn set_coefficients(
        &mut self,
        band: usize,
        coefficients: BiquadCoefficients,
    ) -> Result<(), DspError> {
        if band >= NUM_BANDS {
            return Err(DspError::InvalidBandIndex(band));
        }
        self.coefficients[band] = coefficients;
        for bank in &mut self.filters {
            bank[band].update_coefficients(coefficients.into());
        }
        Ok(())
    }

    pub fn coefficients(&self) -> &[BiquadCoefficients; NUM_BANDS] {
        &self.coefficients
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.filters.len()
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Run every channel of `block` through all bands in series
    ///
    /// # Real-time Safety
    /// No allocations. O(frames * channels * bands).
    pub fn process(&mut self, block: &mut AudioBlock) -> Result<(), DspError> {
        if !self.prepared {
            return Err(DspError::NotPrepared);
        }
        if block.num_channels() != self.filters.len() {
            return Err(DspError::ChannelMismatch {
                expected: self.filters.len(),
                got: block.num_channels(),
            });
        }
        if block.num_frames() > self.max_block_size {
            return Err(DspError::BufferSizeMismatch {
                expected: self.max_block_size,
                got: block.num_frames(),
            });
        }

        for (bank, samples) in self.filters.iter_mut().zip(block.channels_mut()) {
            for filter in bank.iter_mut() {
                for sample in samples.iter_mut() {
                    *sample = filter.run(*sample);
                }
            }
        }
        Ok(())
    }

    /// Process a single sample on one channel through every band
    #[inline]
    pub fn process_sample(&mut self, channel: usize, sample: f32) -> f32 {
        match self.filters.get_mut(channel) {
            Some(bank) => bank.iter_mut().fold(sample, |x, filter| filter.run(x)),
            None => sample,
        }
    }
}

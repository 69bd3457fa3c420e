//! Planar Audio Block
//!
//! Fixed-capacity, channel-major sample storage. All memory is reserved
//! up front; changing the active frame count never reallocates.

use crate::error::DspError;

/// Planar audio buffer: `[ch0 frames..capacity][ch1 frames..capacity]...`
#[derive(Debug, Clone, Default)]
pub struct AudioBlock {
    data: Vec<f32>,
    channels: usize,
    capacity: usize,
    frames: usize,
}

impl AudioBlock {
    /// Allocate a zeroed block. Only call outside the audio callback.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels * capacity],
            channels,
            capacity,
            frames: capacity,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Maximum frames per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Active frames per channel
    pub fn num_frames(&self) -> usize {
        self.frames
    }

    /// Set the active frame count (no allocation)
    pub fn set_num_frames(&mut self, frames: usize) -> Result<(), DspError> {
        if frames > self.capacity {
            return Err(DspError::BufferSizeMismatch {
                expected: self.capacity,
                got: frames,
            });
        }
        self.frames = frames;
        Ok(())
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.capacity;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.capacity;
        &mut self.data[start..start + self.frames]
    }

    /// Iterate over the active part of every channel
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let frames = self.frames;
        self.data
            .chunks_exact_mut(self.capacity.max(1))
            .take(self.channels)
            .map(move |ch| &mut ch[..frames])
    }

    /// Zero the active frames of every channel
    pub fn clear(&mut self) {
        for ch in self.channels_mut() {
            ch.fill(0.0);
        }
    }

    /// Load interleaved samples `[L0, R0, L1, R1, ...]` into the block
    ///
    /// The buffer length must be a multiple of the channel count and fit the capacity.
    pub fn copy_from_interleaved(&mut self, interleaved: &[f32]) -> Result<(), DspError> {
        let frames = self.frames_in(interleaved.len())?;
        self.set_num_frames(frames)?;

        let channels = self.channels;
        for (ch, dest) in self.channels_mut().enumerate() {
            for (frame, sample) in dest.iter_mut().enumerate() {
                *sample = interleaved[frame * channels + ch];
            }
        }
        Ok(())
    }

    /// Write the active frames back out as interleaved samples
    pub fn copy_to_interleaved(&self, interleaved: &mut [f32]) -> Result<(), DspError> {
        let frames = self.frames_in(interleaved.len())?;
        if frames != self.frames {
            return Err(DspError::BufferSizeMismatch {
                expected: self.frames,
                got: frames,
            });
        }

        for ch in 0..self.channels {
            for (frame, &sample) in self.channel(ch).iter().enumerate() {
                interleaved[frame * self.channels + ch] = sample;
            }
        }
        Ok(())
    }

    fn frames_in(&self, interleaved_len: usize) -> Result<usize, DspError> {
        if self.channels == 0 || interleaved_len % self.channels != 0 {
            return Err(DspError::ChannelMismatch {
                expected: self.channels,
                got: interleaved_len % self.channels.max(1),
            });
        }
        Ok(interleaved_len / self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_is_silent() {
        let block = AudioBlock::new(2, 64);
        assert_eq!(block.num_channels(), 2);
        assert_eq!(block.num_frames(), 64);
        assert!(block.channel(0).iter().chain(block.channel(1)).all(|&s| s == 0.0));
    }

    #[test]
    fn test_interleave_round_trip() {
        let mut block = AudioBlock::new(2, 8);
        let input = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        block.copy_from_interleaved(&input).unwrap();

        assert_eq!(block.num_frames(), 3);
        assert_eq!(block.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(block.channel(1), &[-0.1, -0.2, -0.3]);

        let mut output = [0.0; 6];
        block.copy_to_interleaved(&mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_rejects_oversized_input() {
        let mut block = AudioBlock::new(2, 4);
        let input = [0.0; 10];
        assert!(matches!(
            block.copy_from_interleaved(&input),
            Err(DspError::BufferSizeMismatch { expected: 4, got: 5 })
        ));
    }

    #[test]
    fn test_rejects_ragged_input() {
        let mut block = AudioBlock::new(2, 4);
        assert!(matches!(
            block.copy_from_interleaved(&[0.0; 3]),
            Err(DspError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_only_touches_active_frames() {
        let mut block = AudioBlock::new(1, 4);
        block.channel_mut(0).fill(1.0);
        block.set_num_frames(2).unwrap();
        block.clear();
        block.set_num_frames(4).unwrap();
        assert_eq!(block.channel(0), &[0.0, 0.0, 1.0, 1.0]);
    }
}

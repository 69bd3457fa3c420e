//! Audio Processor Trait
//!
//! The host-facing entry point of a real-time processor: interleaved
//! buffers in, processed in place.

/// Context passed to processors containing stream metadata
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub channels: usize,
    /// Largest block the host will deliver, in frames
    pub buffer_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, channels: usize, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            buffer_size,
        }
    }

    /// Frames contained in an interleaved buffer of `len` samples
    pub fn frames_in(&self, len: usize) -> usize {
        if self.channels == 0 {
            0
        } else {
            len / self.channels
        }
    }
}

/// Trait for real-time audio processors
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// `process()` cannot fail. Implementations that hit a precondition
/// violation write silence instead of panicking.
pub trait AudioProcessor: Send {
    /// Process audio buffer in-place
    ///
    /// Buffer format is interleaved: [L0, R0, L1, R1, ...]
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (delay lines, histories, etc.)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;

    /// Added delay in samples at the host rate
    fn latency_samples(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test processor that just inverts audio
    struct InvertProcessor;

    impl AudioProcessor for InvertProcessor {
        fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
            for sample in buffer.iter_mut() {
                *sample = -*sample;
            }
        }

        fn reset(&mut self) {}

        fn name(&self) -> &'static str {
            "Inverter"
        }
    }

    #[test]
    fn test_trait_defaults() {
        let mut p = InvertProcessor;
        assert_eq!(p.latency_samples(), 0);
        assert_eq!(p.name(), "Inverter");

        let mut buffer = vec![0.5, -0.5];
        p.process(&mut buffer, &ProcessContext::new(48000.0, 2, 1));
        assert_eq!(buffer, vec![-0.5, 0.5]);
    }

    #[test]
    fn test_process_context() {
        let ctx = ProcessContext::new(48000.0, 2, 512);
        assert_eq!(ctx.sample_rate, 48000.0);
        assert_eq!(ctx.channels, 2);
        assert_eq!(ctx.buffer_size, 512);
        assert_eq!(ctx.frames_in(1024), 512);
        assert_eq!(ProcessContext::new(48000.0, 0, 0).frames_in(10), 0);
    }
}

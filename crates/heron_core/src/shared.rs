//! Shared State
//!
//! Everything both the audio thread and control threads touch.
//! Control threads write targets and the mode; the audio thread publishes
//! the active coefficient snapshot and latency. Nothing here can block the
//! audio thread: it only uses atomics and `try_write`.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::params::BandTargets;
use heron_dsp::{CoefficientSnapshot, ProcessingMode};

/// Shared state between the audio processor and its controllers
pub struct SharedState {
    /// Band targets written by control threads
    pub targets: Arc<BandTargets>,

    /// Requested mode, read once per block
    mode: AtomicU8,

    /// Latency of the mode the processor is actually running, in host samples
    latency_samples: AtomicU32,

    /// Last published coefficient set
    coefficients: RwLock<CoefficientSnapshot>,

    /// Generation of `coefficients`, for cheap change polling
    generation: AtomicU64,
}

impl SharedState {
    pub fn new(
        targets: Arc<BandTargets>,
        mode: ProcessingMode,
        snapshot: CoefficientSnapshot,
    ) -> Self {
        Self {
            targets,
            mode: AtomicU8::new(mode.to_u8()),
            latency_samples: AtomicU32::new(0),
            generation: AtomicU64::new(snapshot.generation),
            coefficients: RwLock::new(snapshot),
        }
    }

    pub fn set_mode(&self, mode: ProcessingMode) {
        self.mode.store(mode.to_u8(), Ordering::Relaxed);
    }

    pub fn mode(&self) -> ProcessingMode {
        ProcessingMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_latency_samples(&self, samples: usize) {
        self.latency_samples.store(samples as u32, Ordering::Relaxed);
    }

    pub fn latency_samples(&self) -> usize {
        self.latency_samples.load(Ordering::Relaxed) as usize
    }

    /// Replace the published snapshot if no reader holds the lock
    ///
    /// Stamps the snapshot with the next generation. Returns false when the
    /// lock was contended; the caller keeps the snapshot and retries.
    pub fn try_publish(&self, snapshot: &CoefficientSnapshot) -> bool {
        let Some(mut published) = self.coefficients.try_write() else {
            return false;
        };
        let generation = self.generation.load(Ordering::Relaxed) + 1;
        *published = CoefficientSnapshot {
            generation,
            ..*snapshot
        };
        drop(published);
        self.generation.store(generation, Ordering::Release);
        true
    }

    pub fn snapshot(&self) -> CoefficientSnapshot {
        *self.coefficients.read()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_dsp::BiquadCoefficients;

    fn state() -> SharedState {
        SharedState::new(
            Arc::new(BandTargets::default()),
            ProcessingMode::ZeroLatency,
            CoefficientSnapshot::default(),
        )
    }

    #[test]
    fn test_mode_round_trip() {
        let state = state();
        assert_eq!(state.mode(), ProcessingMode::ZeroLatency);
        state.set_mode(ProcessingMode::Oversampled);
        assert_eq!(state.mode(), ProcessingMode::Oversampled);
    }

    #[test]
    fn test_publish_bumps_generation() {
        let state = state();
        assert_eq!(state.generation(), 0);

        let mut snapshot = CoefficientSnapshot::flat(44_100.0, ProcessingMode::ZeroLatency);
        snapshot.coefficients[2] = BiquadCoefficients {
            b0: 1.1,
            ..BiquadCoefficients::neutral()
        };
        assert!(state.try_publish(&snapshot));
        assert!(state.try_publish(&snapshot));

        let published = state.snapshot();
        assert_eq!(state.generation(), 2);
        assert_eq!(published.generation, 2);
        assert_eq!(published.sample_rate, 44_100.0);
        assert_eq!(published.coefficients[2].b0, 1.1);
    }

    #[test]
    fn test_publish_fails_while_read_locked() {
        let state = state();
        let guard = state.coefficients.read();
        assert!(!state.try_publish(&CoefficientSnapshot::default()));
        drop(guard);
        assert_eq!(state.generation(), 0);
        assert!(state.try_publish(&CoefficientSnapshot::default()));
    }

    #[test]
    fn test_latency() {
        let state = state();
        state.set_latency_samples(23);
        assert_eq!(state.latency_samples(), 23);
    }
}

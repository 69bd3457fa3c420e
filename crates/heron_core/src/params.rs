//! Band Parameter Store
//!
//! Targets are written by control threads into atomics (f32 bit patterns)
//! and never block. The audio thread owns one [`LinearSmoother`] per value
//! and pulls targets at the start of every block.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use heron_dsp::{BandParams, DspError, LinearSmoother, NUM_BANDS};

/// Lock-free f32 cell
/// Rust pattern: AtomicF32 doesn't exist, so we use bit-casting
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct AtomicBand {
    frequency: AtomicF32,
    gain_db: AtomicF32,
    q: AtomicF32,
}

/// Target values for every band, shared between threads
#[derive(Debug)]
pub struct BandTargets {
    bands: [AtomicBand; NUM_BANDS],
}

impl Default for BandTargets {
    fn default() -> Self {
        Self::new(&core::array::from_fn(BandParams::default_for))
    }
}

impl BandTargets {
    pub fn new(initial: &[BandParams; NUM_BANDS]) -> Self {
        Self {
            bands: core::array::from_fn(|i| {
                let p = initial[i].clamped();
                AtomicBand {
                    frequency: AtomicF32::new(p.frequency),
                    gain_db: AtomicF32::new(p.gain_db),
                    q: AtomicF32::new(p.q),
                }
            }),
        }
    }

    /// Clamp and store new targets for `band`; returns the stored values
    ///
    /// Wait-free. The three fields are stored independently.
    pub fn set(&self, band: usize, params: BandParams) -> Result<BandParams, DspError> {
        let slot = self.bands.get(band).ok_or(DspError::InvalidBandIndex(band))?;
        let p = params.clamped();
        slot.frequency.store(p.frequency);
        slot.gain_db.store(p.gain_db);
        slot.q.store(p.q);
        Ok(p)
    }

    pub fn get(&self, band: usize) -> Result<BandParams, DspError> {
        let slot = self.bands.get(band).ok_or(DspError::InvalidBandIndex(band))?;
        Ok(BandParams::new(
            slot.frequency.load(),
            slot.gain_db.load(),
            slot.q.load(),
        ))
    }

    pub fn all(&self) -> [BandParams; NUM_BANDS] {
        core::array::from_fn(|i| {
            let slot = &self.bands[i];
            BandParams::new(slot.frequency.load(), slot.gain_db.load(), slot.q.load())
        })
    }
}

/// Smoothers for one band: frequency, gain, Q
#[derive(Debug, Clone, Copy)]
struct BandSmoothers {
    frequency: LinearSmoother,
    gain_db: LinearSmoother,
    q: LinearSmoother,
}

impl BandSmoothers {
    fn new(p: BandParams) -> Self {
        Self {
            frequency: LinearSmoother::new(p.frequency),
            gain_db: LinearSmoother::new(p.gain_db),
            q: LinearSmoother::new(p.q),
        }
    }

    fn values_mut(&mut self) -> [&mut LinearSmoother; 3] {
        [&mut self.frequency, &mut self.gain_db, &mut self.q]
    }

    fn current(&self) -> BandParams {
        BandParams::new(
            self.frequency.current(),
            self.gain_db.current(),
            self.q.current(),
        )
    }
}

/// Audio-side view of the band parameters
pub struct BandParameterStore {
    targets: Arc<BandTargets>,
    smoothers: [BandSmoothers; NUM_BANDS],
    smoothing_seconds: f32,
}

impl BandParameterStore {
    /// Smoothers start at the current targets
    pub fn new(targets: Arc<BandTargets>, smoothing_seconds: f32) -> Self {
        let initial = targets.all();
        Self {
            targets,
            smoothers: core::array::from_fn(|i| BandSmoothers::new(initial[i])),
            smoothing_seconds,
        }
    }

    /// Set ramp lengths for `sample_rate` and jump to the targets
    pub fn prepare(&mut self, sample_rate: f32) {
        let targets = self.targets.all();
        for (band, target) in self.smoothers.iter_mut().zip(targets) {
            let values = [target.frequency, target.gain_db, target.q];
            for (smoother, value) in band.values_mut().into_iter().zip(values) {
                smoother.set_target(value);
                smoother.reset(sample_rate, self.smoothing_seconds);
            }
        }
    }

    /// Pull targets and advance every smoother by `num_samples`
    ///
    /// A ramp is re-armed only for values whose target changed.
    /// Returns true if any smoothed value moved.
    pub fn advance(&mut self, num_samples: u32) -> bool {
        let targets = self.targets.all();
        let mut moved = false;
        for (band, target) in self.smoothers.iter_mut().zip(targets) {
            let values = [target.frequency, target.gain_db, target.q];
            for (smoother, value) in band.values_mut().into_iter().zip(values) {
                let before = smoother.current();
                smoother.set_target(value);
                moved |= smoother.skip(num_samples) != before;
            }
        }
        moved
    }

    /// Pull targets and jump straight to them
    pub fn snap_to_targets(&mut self) {
        let targets = self.targets.all();
        for (band, target) in self.smoothers.iter_mut().zip(targets) {
            let values = [target.frequency, target.gain_db, target.q];
            for (smoother, value) in band.values_mut().into_iter().zip(values) {
                smoother.set_target(value);
                smoother.snap_to_target();
            }
        }
    }

    pub fn smoothed(&self, band: usize) -> Result<BandParams, DspError> {
        self.smoothers
            .get(band)
            .map(BandSmoothers::current)
            .ok_or(DspError::InvalidBandIndex(band))
    }

    pub fn smoothed_all(&self) -> [BandParams; NUM_BANDS] {
        core::array::from_fn(|i| self.smoothers[i].current())
    }

    pub fn is_smoothing(&self) -> bool {
        self.smoothers.iter().any(|b| {
            b.frequency.is_smoothing() || b.gain_db.is_smoothing() || b.q.is_smoothing()
        })
    }
}

//! Linear Parameter Smoothing
//!
//! Each smoother is a tiny state machine: `Idle` holds the target,
//! `Ramping` walks toward it in equal steps. A ramp is only re-armed
//! when the target actually changes, so repeated writes of the same
//! value never restart it.

/// Default ramp length (1ms): short enough to be inaudible, long enough to avoid steps
pub const DEFAULT_SMOOTHING_SECONDS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SmootherState {
    Idle,
    Ramping { remaining: u32, step: f32 },
}

/// Linear ramp toward a target value
#[derive(Debug, Clone, Copy)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    ramp_samples: u32,
    state: SmootherState,
}

impl LinearSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            ramp_samples: 0,
            state: SmootherState::Idle,
        }
    }

    /// Set the ramp length for `sample_rate` and jump to the current target
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        let samples = (sample_rate.max(0.0) * ramp_seconds.max(0.0)).floor();
        self.ramp_samples = samples as u32;
        self.snap_to_target();
    }

    /// Set a new target, re-arming the ramp only if it differs from the current one
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;
        if self.ramp_samples == 0 {
            self.snap_to_target();
            return;
        }

        self.state = SmootherState::Ramping {
            remaining: self.ramp_samples,
            step: (target - self.current) / self.ramp_samples as f32,
        };
    }

    /// Jump straight to the target
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.state = SmootherState::Idle;
    }

    /// Advance by one sample and return the new value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.skip(1)
    }

    /// Advance by `num_samples` and return the new value
    pub fn skip(&mut self, num_samples: u32) -> f32 {
        if let SmootherState::Ramping { remaining, step } = self.state {
            if num_samples >= remaining {
                self.snap_to_target();
            } else {
                let remaining = remaining - num_samples;
                self.current = self.target - step * remaining as f32;
                self.state = SmootherState::Ramping { remaining, step };
            }
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        matches!(self.state, SmootherState::Ramping { .. })
    }
}

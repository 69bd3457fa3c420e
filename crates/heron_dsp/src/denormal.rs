//! Denormal Protection
//!
//! Recursive filters decaying toward silence produce subnormal floats,
//! which run on slow microcode paths on x86. [`DenormalGuard`] switches
//! the SSE unit to flush-to-zero / denormals-are-zero for its lifetime
//! and restores the previous control word on drop.
//!
//! On other architectures the guard is a no-op.

#[cfg(target_arch = "x86_64")]
mod imp {
    #[allow(deprecated)]
    use std::arch::x86_64::{_mm_getcsr, _mm_setcsr};

    /// MXCSR flush-to-zero bit
    const FTZ: u32 = 0x8000;
    /// MXCSR denormals-are-zero bit
    const DAZ: u32 = 0x0040;

    pub struct State {
        previous: u32,
    }

    #[allow(deprecated)]
    pub fn enable() -> State {
        // SAFETY: SSE is part of the x86_64 baseline; only the FTZ/DAZ bits change
        let previous = unsafe { _mm_getcsr() };
        unsafe { _mm_setcsr(previous | FTZ | DAZ) };
        State { previous }
    }

    #[allow(deprecated)]
    pub fn restore(state: &State) {
        // SAFETY: writes back the word read in `enable`
        unsafe { _mm_setcsr(state.previous) };
    }

    #[cfg(test)]
    #[allow(deprecated)]
    pub fn flush_enabled() -> bool {
        // SAFETY: read-only access to the control register
        unsafe { _mm_getcsr() & FTZ != 0 }
    }
}

#[cfg(not(target_arch = "x86_64"))]
mod imp {
    pub struct State;

    pub fn enable() -> State {
        State
    }

    pub fn restore(_state: &State) {}
}

/// Scoped FTZ/DAZ for the duration of one audio block
///
/// ```ignore
/// let _guard = DenormalGuard::new();
/// cascade.process(&mut block)?;
/// ```
#[must_use = "denormal flushing is only active while the guard is alive"]
pub struct DenormalGuard {
    state: imp::State,
}

impl DenormalGuard {
    pub fn new() -> Self {
        Self {
            state: imp::enable(),
        }
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DenormalGuard {
    fn drop(&mut self) {
        imp::restore(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_scoped() {
        let guard = DenormalGuard::new();
        #[cfg(target_arch = "x86_64")]
        assert!(imp::flush_enabled());
        drop(guard);
        #[cfg(target_arch = "x86_64")]
        assert!(!imp::flush_enabled());
    }

    #[test]
    fn test_nested_guards_restore_in_order() {
        let outer = DenormalGuard::new();
        {
            let _inner = DenormalGuard::new();
        }
        // Inner guard restores the outer guard's setting, not the default
        #[cfg(target_arch = "x86_64")]
        assert!(imp::flush_enabled());
        drop(outer);
    }

    #[test]
    fn test_subnormals_flush_inside_guard() {
        let _guard = DenormalGuard::new();
        let tiny = std::hint::black_box(f32::MIN_POSITIVE);
        let product = std::hint::black_box(tiny * 0.5);
        #[cfg(target_arch = "x86_64")]
        assert_eq!(product, 0.0);
        assert!(product.is_finite());
    }
}

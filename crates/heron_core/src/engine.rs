//! EQ Engine - Control Handle
//!
//! [`EqController::new`] builds both halves of the engine:
//!
//! ```text
//!   EqController (any thread, Clone)            EqProcessor (audio thread)
//!   ──────────────────────────────              ──────────────────────────
//!   set_band_target ──▶ atomics ───────────────▶ smoothers, once per block
//!   set_processing_mode ──▶ atomic ────────────▶ mode sync
//!   request_reset / set_test_signal ──rtrb────▶ command drain
//!   coefficient_snapshot ◀── RwLock (try_write) ◀ designer
//!   spectrum_snapshot ◀──── RwLock (try_write) ◀ spectrum estimator
//!   poll_events ◀──────── crossbeam (try_send) ◀ events
//! ```
//!
//! None of the controller methods can block the audio thread.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use rtrb::{Producer, RingBuffer};
use tracing::{debug, error, info, warn};

use heron_dsp::{
    BandParams, CoefficientSnapshot, ProcessingMode, SpectrumEstimator, SpectrumHandle,
    TestSignalConfig, NUM_BANDS,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, Event};
use crate::params::BandTargets;
use crate::processor::EqProcessor;
use crate::settings::SessionState;
use crate::shared::SharedState;

/// Control-side handle to a running EQ
///
/// Cheap to clone. Clones share one event stream: each event is delivered
/// to whichever clone polls it first.
#[derive(Clone)]
pub struct EqController {
    shared: Arc<SharedState>,
    spectrum: SpectrumHandle,

    /// rtrb is single-producer; the mutex serializes control threads only
    commands: Arc<Mutex<Producer<Command>>>,

    events: Receiver<Event>,
    config: Arc<EngineConfig>,
}

impl EqController {
    /// Build a controller and the processor it drives
    ///
    /// The processor must be moved to the audio thread and prepared before
    /// its first block.
    pub fn new(config: EngineConfig) -> EngineResult<(Self, EqProcessor)> {
        config.validate().map_err(EngineError::Config)?;

        let initial: [BandParams; NUM_BANDS] = core::array::from_fn(BandParams::default_for);
        let (snapshot, _) = CoefficientSnapshot::design(
            &initial,
            config.stream.sample_rate as f32,
            config.initial_mode,
        );
        let shared = Arc::new(SharedState::new(
            Arc::new(BandTargets::new(&initial)),
            config.initial_mode,
            snapshot,
        ));

        let (producer, consumer) = RingBuffer::<Command>::new(config.command_capacity);
        let (event_sender, event_receiver) = bounded::<Event>(config.event_capacity);

        let spectrum = SpectrumEstimator::new(config.spectrum)?;
        let spectrum_handle = spectrum.handle();

        let processor = EqProcessor::new(
            Arc::clone(&shared),
            spectrum,
            consumer,
            event_sender,
            &config,
        );

        info!(
            "EQ engine created: {} bands, {:?}, {}Hz",
            NUM_BANDS, config.initial_mode, config.stream.sample_rate
        );

        let controller = Self {
            shared,
            spectrum: spectrum_handle,
            commands: Arc::new(Mutex::new(producer)),
            events: event_receiver,
            config: Arc::new(config),
        };
        Ok((controller, processor))
    }

    /// Set the target for one band; returns the values actually stored
    ///
    /// Out-of-range values are clamped. The audio thread ramps to the new
    /// target over the smoothing time.
    pub fn set_band_target(
        &self,
        band: usize,
        frequency: f32,
        gain_db: f32,
        q: f32,
    ) -> EngineResult<BandParams> {
        let stored = self
            .shared
            .targets
            .set(band, BandParams::new(frequency, gain_db, q))?;
        debug!(
            "Set band {} target to {:.1}Hz {:+.1}dB Q{:.2}",
            band, stored.frequency, stored.gain_db, stored.q
        );
        Ok(stored)
    }

    pub fn band_target(&self, band: usize) -> EngineResult<BandParams> {
        Ok(self.shared.targets.get(band)?)
    }

    pub fn band_targets(&self) -> [BandParams; NUM_BANDS] {
        self.shared.targets.all()
    }

    /// Request a processing mode; the audio thread applies it at its next block
    pub fn set_processing_mode(&self, mode: ProcessingMode) {
        debug!("Processing mode requested: {:?}", mode);
        self.shared.set_mode(mode);
    }

    /// Requested processing mode
    pub fn processing_mode(&self) -> ProcessingMode {
        self.shared.mode()
    }

    /// Latency of the mode the processor is running, in host samples
    pub fn latency_samples(&self) -> usize {
        self.shared.latency_samples()
    }

    /// Latest spectrum in dB, one value per bin
    pub fn spectrum_snapshot(&self) -> Vec<f32> {
        self.spectrum.snapshot()
    }

    /// Latest spectrum with display smoothing applied
    pub fn smoothed_spectrum(&self) -> Vec<f32> {
        self.spectrum.smoothed_snapshot()
    }

    pub fn spectrum_handle(&self) -> SpectrumHandle {
        self.spectrum.clone()
    }

    /// Coefficient set the audio thread most recently published
    pub fn coefficient_snapshot(&self) -> CoefficientSnapshot {
        self.shared.snapshot()
    }

    pub fn coefficients_generation(&self) -> u64 {
        self.shared.generation()
    }

    /// True if a snapshot newer than `last_seen` was published; updates `last_seen`
    pub fn has_new_coefficients(&self, last_seen: &mut u64) -> bool {
        let generation = self.shared.generation();
        if generation != *last_seen {
            *last_seen = generation;
            true
        } else {
            false
        }
    }

    /// Combined magnitude of the active coefficients at `frequency`, in dB
    pub fn magnitude_response_db(&self, frequency: f32) -> f32 {
        self.shared.snapshot().magnitude_db(frequency)
    }

    /// `(frequency, dB)` pairs on a log grid from 20Hz to 20kHz
    pub fn response_curve(&self, num_points: usize) -> Vec<(f32, f32)> {
        self.shared.snapshot().log_curve(num_points)
    }

    /// Snap smoothing to the targets and clear all filter state
    pub fn request_reset(&self) -> EngineResult<()> {
        self.send_command(Command::Reset)
    }

    /// Replace the processor input with a test signal, or `None` to stop
    pub fn set_test_signal(&self, signal: Option<TestSignalConfig>) -> EngineResult<()> {
        debug!("Test signal: {:?}", signal);
        self.send_command(Command::SetTestSignal(signal.map(TestSignalConfig::clamped)))
    }

    /// Drain pending events, logging each one
    pub fn poll_events(&self) -> Vec<Event> {
        let events: Vec<Event> = self.events.try_iter().collect();
        for event in &events {
            match event {
                Event::Prepared {
                    sample_rate,
                    max_block_size,
                    channels,
                } => info!(
                    "Processor prepared: {}Hz, block {}, {} channels",
                    sample_rate, max_block_size, channels
                ),
                Event::ModeChanged {
                    mode,
                    latency_samples,
                } => info!("Mode changed to {:?} ({} samples latency)", mode, latency_samples),
                Event::DegenerateBand {
                    band,
                    frequency,
                    sample_rate,
                } => warn!(
                    "Band {} at {}Hz cannot be designed at {}Hz; running flat",
                    band, frequency, sample_rate
                ),
                Event::BandRecovered { band } => debug!("Band {} recovered", band),
                Event::StateReset => debug!("Processor state reset"),
                Event::BlockRejected { frames, channels } => error!(
                    "Block of {} frames x {} channels rejected, output silenced",
                    frames, channels
                ),
            }
        }
        events
    }

    /// Current targets and mode as a normalized session
    pub fn session_state(&self) -> SessionState {
        SessionState::from_params(&self.shared.targets.all(), self.processing_mode())
    }

    /// Apply a stored session, then reset the processor so it starts clean
    ///
    /// With `musical_q`, Q values are limited per band and by gain.
    pub fn load_session(&self, session: &SessionState, musical_q: bool) -> EngineResult<()> {
        for (band, params) in session.to_params(musical_q).into_iter().enumerate() {
            self.shared.targets.set(band, params)?;
        }
        self.shared.set_mode(session.mode());
        info!("Session loaded ({:?}, musical Q {})", session.mode(), musical_q);
        self.request_reset()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.commands
            .lock()
            .push(command)
            .map_err(|_| EngineError::ChannelSendError)
    }
}

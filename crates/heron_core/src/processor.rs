//! Real-time EQ Processor
//!
//! Owned by the audio thread. Every block runs the same sequence:
//!
//! ```text
//! commands -> mode sync -> (test signal) -> smoothing -> coefficients
//!          -> [upsample] -> cascade -> [downsample] -> spectrum tap
//! ```
//!
//! Everything that allocates lives in [`EqProcessor::prepare`].

use std::sync::Arc;

use crossbeam_channel::Sender;
use rtrb::Consumer;
use tracing::info;

use heron_dsp::{
    AudioBlock, AudioProcessor, BandParams, CoefficientSnapshot, DenormalGuard, DspError,
    FilterCascade, Oversampler, ProcessContext, ProcessingMode, SpectrumEstimator, TestSignal,
    TestSignalConfig, NUM_BANDS, OVERSAMPLING_FACTOR,
};

use crate::config::{EngineConfig, StreamConfig};
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, Event};
use crate::params::BandParameterStore;
use crate::shared::SharedState;

/// The audio-thread half of the engine
pub struct EqProcessor {
    shared: Arc<SharedState>,
    params: BandParameterStore,
    cascade: FilterCascade,
    oversampler: Oversampler,
    spectrum: SpectrumEstimator,
    test_signal: TestSignal,
    test_signal_enabled: bool,

    /// Planar scratch for the interleaved entry point
    scratch: AudioBlock,

    commands: Consumer<Command>,
    events: Sender<Event>,

    /// Mode the cascade is currently running
    mode: ProcessingMode,
    degenerate: [bool; NUM_BANDS],

    /// Designed but not yet published (the publish lock was contended)
    pending: Option<CoefficientSnapshot>,
    coefficients_dirty: bool,

    spectrum_channel: usize,
    /// Upper bounds for every `prepare` call
    stream: StreamConfig,
    /// Inside a run of blocks answered with silence
    rejecting: bool,
    sample_rate: f32,
    max_block_size: usize,
    channels: usize,
    prepared: bool,
}

impl EqProcessor {
    pub(crate) fn new(
        shared: Arc<SharedState>,
        spectrum: SpectrumEstimator,
        commands: Consumer<Command>,
        events: Sender<Event>,
        config: &EngineConfig,
    ) -> Self {
        let params =
            BandParameterStore::new(Arc::clone(&shared.targets), config.smoothing_seconds());
        let sample_rate = config.stream.sample_rate as f32;
        let mode = shared.mode();

        let processor = Self {
            params,
            cascade: FilterCascade::new(),
            oversampler: Oversampler::new(),
            spectrum,
            test_signal: TestSignal::new(TestSignalConfig::default(), sample_rate),
            test_signal_enabled: false,
            scratch: AudioBlock::default(),
            commands,
            events,
            mode,
            degenerate: [false; NUM_BANDS],
            pending: None,
            coefficients_dirty: true,
            spectrum_channel: config.spectrum_channel,
            stream: config.stream.clone(),
            rejecting: false,
            sample_rate,
            max_block_size: 0,
            channels: 0,
            prepared: false,
            shared,
        };
        processor.shared.set_latency_samples(processor.latency_samples());
        processor
    }

    /// Prepare for the format in the engine's [`StreamConfig`]
    pub fn prepare_stream(&mut self) -> EngineResult<()> {
        let stream = self.stream.clone();
        self.prepare(
            stream.sample_rate as f32,
            stream.max_block_size as usize,
            stream.channels as usize,
        )
    }

    /// Prepare for a stream format
    ///
    /// Allocates every buffer the block path needs, snaps the smoothers to
    /// their targets and publishes a fresh coefficient snapshot. Call before
    /// the first block and whenever the format changes; never from inside
    /// the audio callback. The block size and channel count may not exceed
    /// the configured [`StreamConfig`]; the sample rate follows the host.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
    ) -> EngineResult<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate).into());
        }
        if channels == 0 {
            return Err(EngineError::Config("Channel count must be non-zero".to_string()));
        }
        if max_block_size == 0 {
            return Err(EngineError::Config("Block size must be non-zero".to_string()));
        }
        if max_block_size > self.stream.max_block_size as usize {
            return Err(EngineError::BlockTooLarge {
                max: self.stream.max_block_size as usize,
                got: max_block_size,
            });
        }
        if channels > self.stream.channels as usize {
            return Err(EngineError::Config(format!(
                "{} channels exceeds the configured {}",
                channels, self.stream.channels
            )));
        }

        self.mode = self.shared.mode();
        let design_rate = sample_rate * self.mode.oversampling_factor() as f32;
        self.cascade
            .prepare(design_rate, max_block_size * OVERSAMPLING_FACTOR, channels)?;
        self.oversampler.prepare(max_block_size, channels);
        self.scratch = AudioBlock::new(channels, max_block_size);

        self.params.prepare(sample_rate);
        self.test_signal.set_sample_rate(sample_rate);
        self.test_signal.reset();
        self.spectrum.reset();

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.channels = channels;
        self.degenerate = [false; NUM_BANDS];
        self.rejecting = false;
        self.prepared = true;

        self.update_coefficients()?;
        self.publish_pending();
        self.shared.set_latency_samples(self.latency_samples());

        info!(
            "EQ prepared: {}Hz, {} channels, max block {} ({:?}, configured block latency {:.1}ms)",
            sample_rate,
            channels,
            max_block_size,
            self.mode,
            self.stream.block_latency_ms()
        );
        self.emit(Event::Prepared {
            sample_rate,
            max_block_size,
            channels,
        });
        Ok(())
    }

    /// Mode the cascade is running, which trails the requested mode by at most one block
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Smoothed parameters the cascade is currently designed from
    pub fn smoothed_params(&self) -> [BandParams; NUM_BANDS] {
        self.params.smoothed_all()
    }

    /// Snap smoothing and clear every delay line
    pub fn reset_state(&mut self) {
        self.params.snap_to_targets();
        self.cascade.reset();
        self.oversampler.reset();
        self.test_signal.reset();
        self.spectrum.reset();
        self.coefficients_dirty = true;
        self.emit(Event::StateReset);
    }

    /// Process an interleaved buffer in place
    ///
    /// # Real-time Safety
    /// No allocations: the planar scratch block was sized in `prepare`.
    pub fn try_process(&mut self, buffer: &mut [f32]) -> EngineResult<()> {
        if !self.prepared {
            return Err(EngineError::NotPrepared);
        }
        let frames = buffer.len() / self.channels;
        if frames > self.max_block_size {
            return Err(EngineError::BlockTooLarge {
                max: self.max_block_size,
                got: frames,
            });
        }

        let mut block = std::mem::take(&mut self.scratch);
        let result = self.process_interleaved(&mut block, buffer);
        self.scratch = block;
        result
    }

    fn process_interleaved(
        &mut self,
        block: &mut AudioBlock,
        buffer: &mut [f32],
    ) -> EngineResult<()> {
        block.copy_from_interleaved(buffer)?;
        self.process_block(block)?;
        block.copy_to_interleaved(buffer)?;
        Ok(())
    }

    /// Process a planar block in place
    ///
    /// # Real-time Safety
    /// No allocations, no blocking locks, no logging.
    pub fn process_block(&mut self, block: &mut AudioBlock) -> EngineResult<()> {
        if !self.prepared {
            return Err(EngineError::NotPrepared);
        }
        if block.num_channels() != self.channels {
            return Err(EngineError::ChannelMismatch {
                expected: self.channels,
                got: block.num_channels(),
            });
        }
        let frames = block.num_frames();
        if frames > self.max_block_size {
            return Err(EngineError::BlockTooLarge {
                max: self.max_block_size,
                got: frames,
            });
        }

        let _denormals = DenormalGuard::new();

        self.drain_commands();
        self.sync_mode()?;

        if self.test_signal_enabled {
            self.test_signal.fill(block);
        }

        if self.params.advance(frames as u32) || self.coefficients_dirty {
            self.update_coefficients()?;
        }
        self.publish_pending();

        match self.mode {
            ProcessingMode::ZeroLatency => self.cascade.process(block)?,
            ProcessingMode::Oversampled => {
                let upsampled = self.oversampler.process_up(block)?;
                self.cascade.process(upsampled)?;
                self.oversampler.process_down(block)?;
            }
        }

        let reference = self.spectrum_channel.min(self.channels - 1);
        self.spectrum.push_block(block.channel(reference));
        Ok(())
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                Command::Reset => self.reset_state(),
                Command::SetTestSignal(Some(config)) => {
                    self.test_signal.set_config(config);
                    self.test_signal_enabled = true;
                }
                Command::SetTestSignal(None) => self.test_signal_enabled = false,
            }
        }
    }

    /// Apply a mode change requested since the last block
    fn sync_mode(&mut self) -> EngineResult<()> {
        let requested = self.shared.mode();
        if requested == self.mode {
            return Ok(());
        }

        self.mode = requested;
        self.cascade
            .set_sample_rate(self.sample_rate * requested.oversampling_factor() as f32)?;
        self.oversampler.reset();
        self.coefficients_dirty = true;

        let latency_samples = self.latency_samples();
        self.shared.set_latency_samples(latency_samples);
        self.emit(Event::ModeChanged {
            mode: requested,
            latency_samples,
        });
        Ok(())
    }

    fn update_coefficients(&mut self) -> EngineResult<()> {
        let params = self.params.smoothed_all();
        let (snapshot, degenerate) =
            CoefficientSnapshot::design(&params, self.sample_rate, self.mode);

        for (band, coefficients) in snapshot.coefficients.iter().enumerate() {
            self.cascade.set_coefficients(band, *coefficients)?;
        }

        for band in 0..NUM_BANDS {
            match (self.degenerate[band], degenerate[band]) {
                (false, true) => self.emit(Event::DegenerateBand {
                    band,
                    frequency: params[band].frequency,
                    sample_rate: snapshot.sample_rate,
                }),
                (true, false) => self.emit(Event::BandRecovered { band }),
                _ => {}
            }
        }

        self.degenerate = degenerate;
        self.pending = Some(snapshot);
        self.coefficients_dirty = false;
        Ok(())
    }

    fn publish_pending(&mut self) {
        if let Some(snapshot) = &self.pending {
            if self.shared.try_publish(snapshot) {
                self.pending = None;
            }
        }
    }

    fn emit(&self, event: Event) {
        // A full channel drops the event rather than block the audio thread
        let _ = self.events.try_send(event);
    }
}

impl AudioProcessor for EqProcessor {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        let accepted = context.channels == self.channels
            && context.buffer_size <= self.max_block_size
            && self.try_process(buffer).is_ok();
        if accepted {
            self.rejecting = false;
            return;
        }

        buffer.fill(0.0);
        // One event per run of rejected blocks
        if !self.rejecting {
            self.rejecting = true;
            self.emit(Event::BlockRejected {
                frames: context.frames_in(buffer.len()),
                channels: context.channels,
            });
        }
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn name(&self) -> &'static str {
        "Heron 7-Band EQ"
    }

    fn latency_samples(&self) -> usize {
        match self.mode {
            ProcessingMode::ZeroLatency => 0,
            ProcessingMode::Oversampled => self.oversampler.latency_samples(),
        }
    }
}

//! Message Types for Thread Communication
//!
//! Commands flow from control threads -> audio thread (rtrb SPSC queue)
//! Events flow from audio thread -> control threads (bounded crossbeam channel)
//!
//! Continuous values (band targets, mode) do not go through here; they
//! live in atomics in the shared state.

use serde::{Deserialize, Serialize};

use heron_dsp::{ProcessingMode, TestSignalConfig};

/// Discrete requests for the audio thread
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Snap smoothers to their targets and clear all filter state
    ///
    /// Sent after loading a session or preset.
    Reset,

    /// Replace the input with a test signal, or `None` to stop
    SetTestSignal(Option<TestSignalConfig>),
}

/// Events sent from the audio thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Processor prepared for a new stream format
    Prepared {
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
    },

    /// The processing mode took effect
    ModeChanged {
        mode: ProcessingMode,
        latency_samples: usize,
    },

    /// A band could not be designed and is running neutral
    DegenerateBand {
        band: usize,
        frequency: f32,
        sample_rate: f32,
    },

    /// A previously degenerate band is designing normally again
    BandRecovered { band: usize },

    /// Filter and smoothing state were cleared
    StateReset,

    /// A host block could not be processed and was replaced with silence
    ///
    /// Sent once at the start of a run of rejected blocks.
    BlockRejected { frames: usize, channels: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::ModeChanged {
            mode: ProcessingMode::Oversampled,
            latency_samples: 23,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ModeChanged"));
        assert!(json.contains("Oversampled"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_block_rejected_serialization() {
        let event = Event::BlockRejected {
            frames: 4096,
            channels: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BlockRejected"));
        assert!(json.contains("4096"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_degenerate_band_serialization() {
        let event = Event::DegenerateBand {
            band: 6,
            frequency: 20000.0,
            sample_rate: 22050.0,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        if let Event::DegenerateBand { band, frequency, .. } = deserialized {
            assert_eq!(band, 6);
            assert_eq!(frequency, 20000.0);
        } else {
            panic!("Wrong variant");
        }
    }
}

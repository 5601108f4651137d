//! Host-facing processor
//!
//! Owns the effect chain and shares parameters and meters with any number of
//! control-rate [`ControlHandle`]s. `process_block` is the real-time entry
//! point: it takes one parameter snapshot per sub-block, never locks and
//! never allocates.

use std::sync::Arc;

use log::{debug, info};

use crate::dsp::{EffectChain, MAX_EFFECT_CHANNELS};
use crate::error::{FxError, Result};
use crate::meter::LevelMeter;
use crate::params::{ParamId, ParamSnapshot, Parameters};

/// Reverb/delay tail reported to hosts, in seconds
pub const TAIL_LENGTH_SECS: f64 = 2.0;

/// Negotiated processing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub max_block_len: usize,
    pub input_channels: usize,
    pub output_channels: usize,
}

impl ProcessSpec {
    /// Spec with matching input and output channel counts
    pub fn new(sample_rate: f64, max_block_len: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_len,
            input_channels: channels,
            output_channels: channels,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(FxError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }
        if self.max_block_len == 0 {
            return Err(FxError::InvalidBlockLength {
                len: self.max_block_len,
            });
        }
        if self.output_channels == 0 || self.input_channels > self.output_channels {
            return Err(FxError::InvalidChannelCount {
                inputs: self.input_channels,
                outputs: self.output_channels,
            });
        }
        Ok(())
    }
}

/// State shared between the audio thread and control threads
#[derive(Debug, Default)]
struct SharedState {
    params: Parameters,
    input_meter: LevelMeter,
    output_meter: LevelMeter,
}

/// Cloneable control-rate view of a [`Processor`]
///
/// Every method is a lock-free atomic load or store and may be called from
/// any thread while the processor runs.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    shared: Arc<SharedState>,
}

impl ControlHandle {
    /// Set a parameter, clamping to its range; returns the stored value
    pub fn set_parameter(&self, id: ParamId, value: f32) -> f32 {
        self.shared.params.set(id, value)
    }

    pub fn get_parameter(&self, id: ParamId) -> f32 {
        self.shared.params.get(id)
    }

    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        self.shared.params.set_normalized(id, normalized)
    }

    pub fn get_normalized(&self, id: ParamId) -> f32 {
        self.shared.params.get_normalized(id)
    }

    /// Set a parameter by its string identifier
    pub fn set_by_name(&self, name: &str, value: f32) -> Result<f32> {
        self.shared.params.set_by_name(name, value)
    }

    pub fn reset_to_defaults(&self) {
        self.shared.params.reset_to_defaults();
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        self.shared.params.snapshot()
    }

    /// Held input level (linear RMS, pre input gain)
    pub fn input_level(&self) -> f32 {
        self.shared.input_meter.level()
    }

    /// Held output level (linear RMS, post output gain)
    pub fn output_level(&self) -> f32 {
        self.shared.output_meter.level()
    }
}

/// The multi-effect engine as seen by a host
#[derive(Debug)]
pub struct Processor {
    shared: Arc<SharedState>,
    chain: EffectChain,
    spec: Option<ProcessSpec>,
}

impl Processor {
    /// Create an unprepared processor with default parameters
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedState::default()),
            chain: EffectChain::new(),
            spec: None,
        }
    }

    /// Whether a host may run this processor with the given bus layout
    ///
    /// Output must be mono or stereo and input must match it.
    pub fn supports_layout(input_channels: usize, output_channels: usize) -> bool {
        matches!(output_channels, 1 | 2) && input_channels == output_channels
    }

    /// Prepare for `channels` in and out
    pub fn prepare(&mut self, sample_rate: f64, max_block_len: usize, channels: usize) -> Result<()> {
        self.prepare_with_spec(ProcessSpec::new(sample_rate, max_block_len, channels))
    }

    /// (Re)allocate buffers and reset all stage state and meters
    ///
    /// Must not run concurrently with `process_block`.
    pub fn prepare_with_spec(&mut self, spec: ProcessSpec) -> Result<()> {
        spec.validate()?;

        self.chain
            .prepare(spec.sample_rate as f32, spec.max_block_len, spec.output_channels);
        self.shared.input_meter.reset();
        self.shared.output_meter.reset();
        self.spec = Some(spec);

        info!(
            "Prepared: {} Hz, max block {}, {} in / {} out",
            spec.sample_rate, spec.max_block_len, spec.input_channels, spec.output_channels
        );
        if spec.output_channels > MAX_EFFECT_CHANNELS {
            debug!(
                "Effects run on the first {} of {} channels",
                MAX_EFFECT_CHANNELS, spec.output_channels
            );
        }
        if !Self::supports_layout(spec.input_channels, spec.output_channels) {
            debug!(
                "Layout {} in / {} out is outside the supported set",
                spec.input_channels, spec.output_channels
            );
        }
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    pub fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    /// Process one host block in place
    ///
    /// Channels at or beyond the prepared input count are silenced first.
    /// Blocks longer than the prepared maximum are handled in consecutive
    /// sub-blocks. Does nothing before `prepare`.
    pub fn process_block<C>(&mut self, channels: &mut [C])
    where
        C: AsRef<[f32]> + AsMut<[f32]>,
    {
        let Some(spec) = self.spec else {
            return;
        };

        let len = channels
            .iter()
            .map(|channel| channel.as_ref().len())
            .min()
            .unwrap_or(0);

        for channel in channels.iter_mut().skip(spec.input_channels) {
            channel.as_mut()[..len].fill(0.0);
        }

        let mut offset = 0;
        while offset < len {
            let chunk = (len - offset).min(spec.max_block_len);
            let snapshot = self.shared.params.snapshot();
            let levels = self.chain.process(&snapshot, channels, offset, chunk);
            self.shared.input_meter.update(levels.input);
            self.shared.output_meter.update(levels.output);
            offset += chunk;
        }
    }

    /// Clear stage state (delay lines, reverb tail, LFO phase) and meters
    pub fn reset(&mut self) {
        self.chain.reset();
        self.shared.input_meter.reset();
        self.shared.output_meter.reset();
    }

    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn set_parameter(&self, id: ParamId, value: f32) -> f32 {
        self.shared.params.set(id, value)
    }

    pub fn get_parameter(&self, id: ParamId) -> f32 {
        self.shared.params.get(id)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.shared.params
    }

    pub fn input_level(&self) -> f32 {
        self.shared.input_meter.level()
    }

    pub fn output_level(&self) -> f32 {
        self.shared.output_meter.level()
    }

    pub fn tail_length_secs(&self) -> f64 {
        TAIL_LENGTH_SECS
    }

    /// The chain adds no latency
    pub fn latency_samples(&self) -> usize {
        0
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

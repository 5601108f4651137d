//! Flanger stage
//!
//! Per-channel modulated delay with feedback, driven by a unipolar sine LFO
//! whose phase is shared by both channels. The wet signal is the input plus
//! the delayed tap, which gives the comb-filtered flanging sum.

use std::f32::consts::TAU;

use serde::Serialize;

use super::delay_line::DelayLine;
use super::stage::{Stage, StageControls};
use super::DEFAULT_SAMPLE_RATE;

/// Delay at LFO minimum
pub const FLANGER_MIN_DELAY_MS: f32 = 0.2;

/// Delay at LFO maximum with full depth
pub const FLANGER_MAX_DELAY_MS: f32 = 8.0;

/// Minimum delay-line length regardless of sample rate
const MIN_LINE_SAMPLES: usize = 8192;

/// Flanger stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlangerParams {
    pub enabled: bool,
    pub rate_hz: f32,
    pub depth: f32,
    /// Feedback gain, bounded to [-0.95, 0.95] by the parameter range
    pub feedback: f32,
    pub mix: f32,
}

impl StageControls for FlangerParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

#[derive(Debug, Clone)]
pub struct FlangerStage {
    sample_rate: f32,
    lines: [DelayLine; 2],
    phase: f32,
}

impl FlangerStage {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    fn with_sample_rate(sample_rate: f32) -> Self {
        let window = (FLANGER_MAX_DELAY_MS * 0.001 * sample_rate).ceil() as usize;
        let capacity = window.max(MIN_LINE_SAMPLES);
        Self {
            sample_rate,
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            phase: 0.0,
        }
    }

    /// Fractional delay for a unipolar LFO value scaled by depth
    #[inline]
    fn delay_samples(&self, modulation: f32) -> f32 {
        let delay_ms =
            FLANGER_MIN_DELAY_MS + (FLANGER_MAX_DELAY_MS - FLANGER_MIN_DELAY_MS) * modulation;
        delay_ms * 0.001 * self.sample_rate
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

impl Default for FlangerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FlangerStage {
    type Params = FlangerParams;

    fn name(&self) -> &'static str {
        "flanger"
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_len: usize) {
        *self = Self::with_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.phase = 0.0;
    }

    fn process(&mut self, params: &FlangerParams, channels: &mut [Vec<f32>], len: usize) {
        let phase_inc = TAU * params.rate_hz / self.sample_rate;
        let feedback = params.feedback;

        for i in 0..len {
            let lfo = 0.5 * (1.0 + self.phase.sin());
            let delay = self.delay_samples(lfo * params.depth);

            for (samples, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                let input = samples[i];
                let delayed = line.read(delay);
                line.push(input + delayed * feedback);
                samples[i] = input + delayed;
            }

            self.phase = (self.phase + phase_inc).rem_euclid(TAU);
        }
    }
}

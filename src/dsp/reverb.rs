//! Reverb effect implementation
//!
//! Implements the Freeverb algorithm:
//! - 8 parallel comb filters with damped feedback
//! - 4 series allpass filters for diffusion
//! - Right channel tunings offset by a fixed stereo spread
//!
//! Width is fixed at full stereo and the output is fully wet; the chain
//! owns the dry blend.

use serde::Serialize;

use super::stage::{Stage, StageControls};
use super::{flush_denormal, DEFAULT_SAMPLE_RATE};

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f32 = 44100.0;

/// Comb filter delays at 44100 Hz (8 filters)
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz (4 filters)
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for right channel)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass filters (standard Freeverb value)
const ALLPASS_GAIN: f32 = 0.5;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Input attenuation ahead of the comb bank
const INPUT_GAIN: f32 = 0.015;

/// Wet level scaling at full wet
const WET_SCALE: f32 = 3.0;

/// Stereo width (fixed at full)
const WIDTH: f32 = 1.0;

// ============================================================================
// Parameter Structs
// ============================================================================

/// Reverb stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReverbParams {
    pub enabled: bool,
    /// Room size: 0 (tiny) to 1 (huge hall)
    pub room_size: f32,
    /// Damping: 0 (bright) to 1 (dark)
    pub damping: f32,
    pub mix: f32,
}

impl StageControls for ReverbParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass feedback comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    /// One-pole low-pass state in the feedback path
    last: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            last: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let output = self.buffer[self.index];
        self.last = flush_denormal(output * (1.0 - damp) + self.last * damp);
        self.buffer[self.index] = input + self.last * feedback;

        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.last = 0.0;
    }
}

/// Schroeder allpass used for diffusion
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * ALLPASS_GAIN;

        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        buffered - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// Comb bank and allpass chain for one output channel
#[derive(Debug, Clone)]
struct ReverbChannel {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl ReverbChannel {
    fn new(sample_rate: f32, spread: usize) -> Self {
        let scale = sample_rate / REFERENCE_SAMPLE_RATE;
        let scaled = |tuning: usize| ((tuning + spread) as f32 * scale) as usize;
        Self {
            combs: std::array::from_fn(|i| CombFilter::new(scaled(COMB_DELAYS[i]))),
            allpasses: std::array::from_fn(|i| AllpassFilter::new(scaled(ALLPASS_DELAYS[i]))),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input, damp, feedback);
        }
        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for allpass in &mut self.allpasses {
            allpass.clear();
        }
    }
}

// ============================================================================
// Main Reverb Stage
// ============================================================================

/// Freeverb reverberator, always fully wet
#[derive(Debug, Clone)]
pub struct ReverbStage {
    sample_rate: f32,
    left: ReverbChannel,
    right: ReverbChannel,
}

impl ReverbStage {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            left: ReverbChannel::new(sample_rate, 0),
            right: ReverbChannel::new(sample_rate, STEREO_SPREAD),
        }
    }

    /// Comb feedback for a room size in [0, 1]
    #[inline]
    fn feedback(room_size: f32) -> f32 {
        room_size.clamp(0.0, 1.0) * ROOM_SCALE + ROOM_OFFSET
    }

    /// Damping coefficient for a damping amount in [0, 1]
    #[inline]
    fn damp(damping: f32) -> f32 {
        damping.clamp(0.0, 1.0) * DAMP_SCALE
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn process_mono(&mut self, samples: &mut [f32], damp: f32, feedback: f32, wet1: f32) {
        for sample in samples {
            let input = *sample * INPUT_GAIN;
            *sample = self.left.process(input, damp, feedback) * wet1;
        }
    }

    fn process_stereo(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        damp: f32,
        feedback: f32,
        wet1: f32,
        wet2: f32,
    ) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input = (*l + *r) * INPUT_GAIN;
            let out_l = self.left.process(input, damp, feedback);
            let out_r = self.right.process(input, damp, feedback);

            // wet1 controls same-side contribution, wet2 cross-side
            *l = out_l * wet1 + out_r * wet2;
            *r = out_r * wet1 + out_l * wet2;
        }
    }
}

impl Default for ReverbStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ReverbStage {
    type Params = ReverbParams;

    fn name(&self) -> &'static str {
        "reverb"
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_len: usize) {
        *self = Self::with_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn process(&mut self, params: &ReverbParams, channels: &mut [Vec<f32>], len: usize) {
        let feedback = Self::feedback(params.room_size);
        let damp = Self::damp(params.damping);
        let wet1 = 0.5 * WET_SCALE * (1.0 + WIDTH);
        let wet2 = 0.5 * WET_SCALE * (1.0 - WIDTH);

        match channels {
            [] => {}
            [mono] => self.process_mono(&mut mono[..len], damp, feedback, wet1),
            [left, right, ..] => {
                self.process_stereo(&mut left[..len], &mut right[..len], damp, feedback, wet1, wet2)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::block_rms;

    fn params(room_size: f32, damping: f32) -> ReverbParams {
        ReverbParams {
            enabled: true,
            room_size,
            damping,
            mix: 1.0,
        }
    }

    fn impulse_response(p: ReverbParams, channels: usize, len: usize) -> Vec<Vec<f32>> {
        let mut reverb = ReverbStage::new();
        reverb.prepare(44100.0, len);
        let mut buffer = vec![vec![0.0_f32; len]; channels];
        for channel in &mut buffer {
            channel[0] = 1.0;
        }
        reverb.process(&p, &mut buffer, len);
        buffer
    }

    #[test]
    fn test_comb_filter() {
        let mut comb = CombFilter::new(4);
        let out: Vec<f32> = (0..9)
            .map(|i| comb.process(if i == 0 { 1.0 } else { 0.0 }, 0.0, 0.5))
            .collect();
        assert_eq!(out[4], 1.0);
        assert_eq!(out[8], 0.5);
    }

    #[test]
    fn test_allpass_filter() {
        let mut allpass = AllpassFilter::new(3);
        let out: Vec<f32> = (0..7)
            .map(|i| allpass.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();
        assert_eq!(out[0], -1.0);
        assert_eq!(out[3], 1.0);
        assert_eq!(out[6], 0.5);
    }

    #[test]
    fn test_reverb_silence_in_silence_out() {
        let mut reverb = ReverbStage::new();
        reverb.prepare(48000.0, 512);
        let mut buffer = vec![vec![0.0_f32; 512]; 2];
        reverb.process(&params(0.35, 0.5), &mut buffer, 512);
        assert!(buffer.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reverb_output_is_fully_wet() {
        // First comb delay is 1116 samples; nothing comes out before it
        let out = impulse_response(params(0.5, 0.5), 2, 1024);
        assert!(out.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reverb_produces_tail() {
        let out = impulse_response(params(0.5, 0.5), 2, 20000);
        assert!(block_rms(&out, 5000..20000) > 1e-4);
    }

    #[test]
    fn test_reverb_room_size_affects_decay() {
        let small = impulse_response(params(0.1, 0.5), 1, 20000);
        let large = impulse_response(params(0.9, 0.5), 1, 20000);

        // Large room should have longer decay (higher late RMS)
        assert!(block_rms(&large, 10000..20000) > block_rms(&small, 10000..20000));
    }

    #[test]
    fn test_reverb_damping_affects_brightness() {
        let bright = impulse_response(params(0.5, 0.0), 1, 5000);
        let dark = impulse_response(params(0.5, 1.0), 1, 5000);

        let diff_sum: f32 = bright[0]
            .iter()
            .zip(&dark[0])
            .map(|(b, d)| (b - d).abs())
            .sum();
        assert!(diff_sum > 0.01);
    }

    #[test]
    fn test_reverb_stereo_channels_differ() {
        let out = impulse_response(params(0.5, 0.5), 2, 8000);
        let diff: f32 = out[0].iter().zip(&out[1]).map(|(l, r)| (l - r).abs()).sum();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_reverb_reset() {
        let mut reverb = ReverbStage::new();
        reverb.prepare(44100.0, 4000);
        let mut buffer = vec![vec![0.5_f32; 4000]; 2];
        reverb.process(&params(0.8, 0.2), &mut buffer, 4000);

        reverb.reset();
        let mut silent = vec![vec![0.0_f32; 4000]; 2];
        reverb.process(&params(0.8, 0.2), &mut silent, 4000);
        assert!(silent.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reverb_sample_rate_scaling() {
        let mut reverb = ReverbStage::new();
        reverb.prepare(88200.0, 512);
        assert_eq!(reverb.sample_rate(), 88200.0);
        assert_eq!(reverb.left.combs[0].buffer.len(), 2232);
        assert_eq!(reverb.right.combs[0].buffer.len(), (1116 + 23) * 2);
        assert_eq!(reverb.left.allpasses[3].buffer.len(), 450);
    }

    #[test]
    fn test_reverb_no_nan_or_inf() {
        let mut reverb = ReverbStage::new();
        reverb.prepare(44100.0, 4410);
        for block in 0..50 {
            let mut buffer: Vec<Vec<f32>> = (0..2)
                .map(|ch| {
                    (0..4410)
                        .map(|i| (((block * 4410 + i) as f32) * 0.013 + ch as f32).sin())
                        .collect()
                })
                .collect();
            reverb.process(&params(1.0, 0.0), &mut buffer, 4410);
            assert!(buffer.iter().flatten().all(|s| s.is_finite()));
        }
    }
}

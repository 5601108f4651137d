//! Chorus stage
//!
//! Sine-modulated short delay around a fixed 7 ms centre. The stage always
//! renders fully wet with no feedback; the chain applies the blend.
//! One LFO drives the delay of every channel.

use std::f32::consts::TAU;

use serde::Serialize;

use super::delay_line::DelayLine;
use super::stage::{Stage, StageControls};
use super::DEFAULT_SAMPLE_RATE;

/// Centre of the modulated delay
pub const CHORUS_CENTRE_DELAY_MS: f32 = 7.0;

/// Peak-to-peak modulation at depth 1.0
pub const CHORUS_MAX_MODULATION_MS: f32 = 20.0;

/// Shortest delay the modulation may reach
const MIN_DELAY_MS: f32 = 1.0;

/// Chorus stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChorusParams {
    pub enabled: bool,
    /// LFO rate in Hz
    pub rate_hz: f32,
    /// Modulation depth (0-1)
    pub depth: f32,
    pub mix: f32,
}

impl StageControls for ChorusParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

#[derive(Debug, Clone)]
pub struct ChorusStage {
    sample_rate: f32,
    lines: [DelayLine; 2],
    phase: f32,
}

impl ChorusStage {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    fn with_sample_rate(sample_rate: f32) -> Self {
        let capacity = Self::line_capacity(sample_rate);
        Self {
            sample_rate,
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            phase: 0.0,
        }
    }

    fn line_capacity(sample_rate: f32) -> usize {
        let longest_ms = CHORUS_CENTRE_DELAY_MS + CHORUS_MAX_MODULATION_MS * 0.5;
        (longest_ms * 0.001 * sample_rate).ceil() as usize + 2
    }

    /// Delay in samples for an LFO value in [-1, 1]
    #[inline]
    fn delay_samples(&self, lfo: f32, depth: f32) -> f32 {
        let excursion_ms = CHORUS_MAX_MODULATION_MS * 0.5 * depth.clamp(0.0, 1.0);
        let delay_ms = (CHORUS_CENTRE_DELAY_MS + excursion_ms * lfo).max(MIN_DELAY_MS);
        delay_ms * 0.001 * self.sample_rate
    }

    /// Current LFO phase in radians, in [0, 2π)
    pub fn phase(&self) -> f32 {
        self.phase
    }
}

impl Default for ChorusStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ChorusStage {
    type Params = ChorusParams;

    fn name(&self) -> &'static str {
        "chorus"
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

    fn process(&mut self, params: &ChorusParams, channels: &mut [Vec<f32>], len: usize) {
        let phase_inc = TAU * params.rate_hz.max(0.0) / self.sample_rate;

        for i in 0..len {
            let delay = self.delay_samples(self.phase.sin(), params.depth);

            for (samples, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                let input = samples[i];
                let delayed = line.read(delay);
                line.push(input);
                samples[i] = delayed;
            }

            self.phase = (self.phase + phase_inc).rem_euclid(TAU);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rate_hz: f32, depth: f32) -> ChorusParams {
        ChorusParams {
            enabled: true,
            rate_hz,
            depth,
            mix: 1.0,
        }
    }

    #[test]
    fn test_zero_depth_is_pure_centre_delay() {
        let mut stage = ChorusStage::new();
        stage.prepare(48000.0, 1024);

        let mut channels = vec![vec![0.0_f32; 1024]];
        channels[0][0] = 1.0;
        stage.process(&params(1.0, 0.0), &mut channels, 1024);

        // 7 ms at 48 kHz
        let peak = channels[0]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(336));
    }

    #[test]
    fn test_fully_wet_output_is_delayed() {
        let mut stage = ChorusStage::new();
        stage.prepare(44100.0, 64);
        let mut channels = vec![vec![1.0_f32; 64], vec![1.0_f32; 64]];
        stage.process(&params(0.8, 0.25), &mut channels, 64);
        // Nothing has travelled through the line yet
        assert!(channels.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_phase_persists_and_wraps() {
        let mut stage = ChorusStage::new();
        stage.prepare(1000.0, 1000);
        let mut channels = vec![vec![0.0_f32; 250]];
        stage.process(&params(1.0, 0.5), &mut channels, 250);
        assert!((stage.phase() - std::f32::consts::FRAC_PI_2).abs() < 1e-3);

        for _ in 0..3 {
            stage.process(&params(1.0, 0.5), &mut channels, 250);
        }
        assert!(stage.phase() >= 0.0 && stage.phase() < TAU);
        assert!(stage.phase() < 1e-2 || stage.phase() > TAU - 1e-2);
    }

    #[test]
    fn test_extreme_settings_stay_bounded() {
        let mut stage = ChorusStage::new();
        stage.prepare(44100.0, 512);
        let mut seed = 0x1234_5678_u32;
        for _ in 0..200 {
            let mut channels: Vec<Vec<f32>> = (0..2)
                .map(|_| {
                    (0..512)
                        .map(|_| {
                            seed ^= seed << 13;
                            seed ^= seed >> 17;
                            seed ^= seed << 5;
                            (seed as f32 / u32::MAX as f32) * 2.0 - 1.0
                        })
                        .collect()
                })
                .collect();
            stage.process(&params(8.0, 1.0), &mut channels, 512);
            assert!(channels.iter().flatten().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
    }

    #[test]
    fn test_identical_channels_stay_identical() {
        let mut stage = ChorusStage::new();
        stage.prepare(48000.0, 4800);

        let sine: Vec<f32> = (0..4800)
            .map(|i| 0.5 * (TAU * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let mut channels = vec![sine.clone(), sine];
        stage.process(&params(2.0, 1.0), &mut channels, 4800);

        assert!(channels[0].iter().any(|&s| s != 0.0));
        assert_eq!(channels[0], channels[1]);
    }

    #[test]
    fn test_prepare_clears_state() {
        let mut stage = ChorusStage::new();
        stage.prepare(44100.0, 256);
        let mut channels = vec![vec![1.0_f32; 256]];
        stage.process(&params(2.0, 0.5), &mut channels, 256);

        stage.prepare(48000.0, 256);
        assert_eq!(stage.phase(), 0.0);
        let mut silent = vec![vec![0.0_f32; 256]];
        stage.process(&params(2.0, 0.5), &mut silent, 256);
        assert!(silent[0].iter().all(|&s| s == 0.0));
    }
}

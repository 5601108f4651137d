//! Delay Effect
//!
//! Classic feedback echo with one line per channel. The wet output is the
//! delayed tap alone; the dry signal comes back through the chain's blend.

use serde::Serialize;

use super::delay_line::DelayLine;
use super::stage::{Stage, StageControls};
use super::DEFAULT_SAMPLE_RATE;

/// Longest supported delay time
pub const MAX_DELAY_MS: f32 = 1200.0;

/// Delay stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayParams {
    pub enabled: bool,
    /// Delay time in milliseconds (1-1200)
    pub time_ms: f32,
    /// Feedback amount (0-0.95)
    pub feedback: f32,
    pub mix: f32,
}

impl StageControls for DelayParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

/// Stereo feedback echo
#[derive(Debug, Clone)]
pub struct DelayStage {
    sample_rate: f32,
    lines: [DelayLine; 2],
}

impl DelayStage {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    fn with_sample_rate(sample_rate: f32) -> Self {
        let capacity = Self::required_buffer_size(sample_rate);
        Self {
            sample_rate,
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
        }
    }

    /// Samples needed to hold the longest delay (plus interpolation slack)
    fn required_buffer_size(sample_rate: f32) -> usize {
        (MAX_DELAY_MS * 0.001 * sample_rate).ceil() as usize + 1
    }

    /// Fractional delay in samples for a time in milliseconds
    #[inline]
    pub fn delay_samples(&self, time_ms: f32) -> f32 {
        time_ms / 1000.0 * self.sample_rate
    }

    /// Longest delay the lines can produce, in samples
    pub fn max_delay_samples(&self) -> f32 {
        self.lines[0].max_delay()
    }
}

impl Default for DelayStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for DelayStage {
    type Params = DelayParams;

    fn name(&self) -> &'static str {
        "delay"
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_len: usize) {
        *self = Self::with_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }

    fn process(&mut self, params: &DelayParams, channels: &mut [Vec<f32>], len: usize) {
        let delay = self.delay_samples(params.time_ms);
        let feedback = params.feedback;

        for (samples, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
            for sample in &mut samples[..len] {
                let delayed = line.read(delay);
                line.push(*sample + delayed * feedback);
                *sample = delayed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(time_ms: f32, feedback: f32) -> DelayParams {
        DelayParams {
            enabled: true,
            time_ms,
            feedback,
            mix: 1.0,
        }
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut samples = vec![0.0; len];
        samples[0] = 1.0;
        samples
    }

    #[test]
    fn test_delay_produces_echo() {
        let mut stage = DelayStage::new();
        stage.prepare(48000.0, 4800);
        let mut channels = vec![impulse(4800)];
        stage.process(&params(50.0, 0.0), &mut channels, 4800);

        // 50 ms at 48 kHz
        assert_relative_eq!(channels[0][2400], 1.0, epsilon = 1e-4);
        let others: f32 = channels[0]
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2400 && *i != 2401)
            .map(|(_, s)| s.abs())
            .sum();
        assert!(others < 1e-3);
    }

    #[test]
    fn test_dry_is_not_in_wet() {
        let mut stage = DelayStage::new();
        stage.prepare(44100.0, 128);
        let mut channels = vec![vec![0.7_f32; 128]];
        stage.process(&params(100.0, 0.5), &mut channels, 128);
        assert!(channels[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut stage = DelayStage::new();
        stage.prepare(1000.0, 400);
        let mut channels = vec![impulse(400)];
        stage.process(&params(100.0, 0.5), &mut channels, 400);

        assert_relative_eq!(channels[0][100], 1.0, epsilon = 1e-4);
        assert_relative_eq!(channels[0][200], 0.5, epsilon = 1e-4);
        assert_relative_eq!(channels[0][300], 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_echo_crosses_block_boundary() {
        let mut stage = DelayStage::new();
        stage.prepare(1000.0, 64);
        let mut first = vec![impulse(64)];
        stage.process(&params(100.0, 0.0), &mut first, 64);
        assert!(first[0].iter().all(|&s| s == 0.0));

        let mut second = vec![vec![0.0_f32; 64]];
        stage.process(&params(100.0, 0.0), &mut second, 64);
        assert_relative_eq!(second[0][36], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_capacity_covers_max_time() {
        for sample_rate in [44100.0, 96000.0, 192000.0] {
            let mut stage = DelayStage::new();
            stage.prepare(sample_rate, 512);
            assert!(stage.max_delay_samples() >= stage.delay_samples(MAX_DELAY_MS));
        }
    }

    #[test]
    fn test_reset_clears_lines() {
        let mut stage = DelayStage::new();
        stage.prepare(1000.0, 64);
        let mut channels = vec![impulse(64)];
        stage.process(&params(100.0, 0.0), &mut channels, 64);
        stage.reset();

        let mut silent = vec![vec![0.0_f32; 128]];
        stage.process(&params(100.0, 0.0), &mut silent, 128);
        assert!(silent[0].iter().all(|&s| s == 0.0));
    }
}

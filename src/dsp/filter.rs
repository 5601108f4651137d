//! Filter stage
//!
//! Series high-pass then low-pass, both second-order Butterworth biquads.
//! Coefficients are recomputed from the current cutoffs every block with no
//! smoothing; filter history survives parameter changes and is cleared only
//! on prepare.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use serde::Serialize;

use super::stage::{Stage, StageControls};
use super::{DEFAULT_SAMPLE_RATE, DENORMAL_THRESHOLD};

/// Lowest cutoff handed to the coefficient math
const MIN_CUTOFF_HZ: f64 = 1.0;

/// Fraction of Nyquist the cutoff may reach
const NYQUIST_GUARD: f64 = 0.99;

/// Filter stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterParams {
    pub enabled: bool,
    /// High-pass cutoff in Hz
    pub hpf_hz: f32,
    /// Low-pass cutoff in Hz
    pub lpf_hz: f32,
    /// Wet/dry fraction (0-1)
    pub mix: f32,
}

impl StageControls for FilterParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

/// Response of a single biquad section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

/// Keep a cutoff strictly inside (0, sample_rate / 2)
pub fn clamp_cutoff(cutoff_hz: f64, sample_rate: f64) -> f64 {
    let upper = sample_rate * 0.5 * NYQUIST_GUARD;
    if !cutoff_hz.is_finite() {
        return upper;
    }
    cutoff_hz.max(MIN_CUTOFF_HZ).min(upper)
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Audio EQ Cookbook pass filters at Q = 1/sqrt(2)
    fn calculate(kind: FilterKind, sample_rate: f64, cutoff_hz: f64) -> Self {
        let freq = clamp_cutoff(cutoff_hz, sample_rate);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * FRAC_1_SQRT_2);

        let (b0, b1, b2) = match kind {
            FilterKind::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterKind::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
        };
        let a0 = 1.0 + alpha;

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Biquad history for one channel (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = if output.abs() < DENORMAL_THRESHOLD as f64 {
            0.0
        } else {
            output
        };

        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// High-pass into low-pass, per channel
#[derive(Debug, Clone)]
pub struct FilterStage {
    sample_rate: f64,
    hpf: BiquadCoeffs,
    lpf: BiquadCoeffs,
    hpf_state: [BiquadState; 2],
    lpf_state: [BiquadState; 2],
}

impl FilterStage {
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE as f64,
            hpf: BiquadCoeffs::default(),
            lpf: BiquadCoeffs::default(),
            hpf_state: [BiquadState::default(); 2],
            lpf_state: [BiquadState::default(); 2],
        }
    }

    fn update_coefficients(&mut self, params: &FilterParams) {
        self.hpf = BiquadCoeffs::calculate(FilterKind::HighPass, self.sample_rate, params.hpf_hz as f64);
        self.lpf = BiquadCoeffs::calculate(FilterKind::LowPass, self.sample_rate, params.lpf_hz as f64);
    }
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FilterStage {
    type Params = FilterParams;

    fn name(&self) -> &'static str {
        "filter"
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_len: usize) {
        self.sample_rate = sample_rate as f64;
        self.reset();
    }

    fn reset(&mut self) {
        for state in self.hpf_state.iter_mut().chain(self.lpf_state.iter_mut()) {
            state.reset();
        }
    }

    fn process(&mut self, params: &FilterParams, channels: &mut [Vec<f32>], len: usize) {
        self.update_coefficients(params);

        for (ch, samples) in channels.iter_mut().take(2).enumerate() {
            let hpf_state = &mut self.hpf_state[ch];
            let lpf_state = &mut self.lpf_state[ch];
            for sample in &mut samples[..len] {
                let high_passed = hpf_state.process(*sample as f64, &self.hpf);
                *sample = lpf_state.process(high_passed, &self.lpf) as f32;
            }
        }
    }
}

//! Distortion stage
//!
//! Drive gain followed by a tanh soft clip. Stateless per sample.

use serde::Serialize;

use super::db_to_linear;
use super::stage::{Stage, StageControls};

/// Distortion stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistortionParams {
    pub enabled: bool,
    /// Pre-clip gain in dB
    pub drive_db: f32,
    pub mix: f32,
}

impl StageControls for DistortionParams {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

/// Soft-clipping waveshaper
#[derive(Debug, Clone, Default)]
pub struct DistortionStage;

impl DistortionStage {
    pub fn new() -> Self {
        Self
    }

    /// Shape a single sample
    #[inline]
    pub fn shape(sample: f32, drive: f32) -> f32 {
        (sample * drive).tanh()
    }
}

impl Stage for DistortionStage {
    type Params = DistortionParams;

    fn name(&self) -> &'static str {
        "distortion"
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_len: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, params: &DistortionParams, channels: &mut [Vec<f32>], len: usize) {
        let drive = db_to_linear(params.drive_db);
        for samples in channels.iter_mut() {
            for sample in &mut samples[..len] {
                *sample = Self::shape(*sample, drive);
            }
        }
    }
}

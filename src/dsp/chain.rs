//! Effect Chain
//!
//! Runs the six stages in fixed order over one block, blending each stage's
//! wet output back into the running signal, then applies the global dry blend
//! and gain staging. Scratch buffers are sized in `prepare`; `process` never
//! allocates.
//!
//! Order:
//! 1. Filter
//! 2. Distortion
//! 3. Chorus
//! 4. Flanger
//! 5. Delay
//! 6. Reverb

use log::debug;

use super::stage::{mix_into, Stage, StageControls, GLOBAL_MIX_BYPASS};
use super::{
    db_to_linear, ChorusStage, DelayStage, DistortionStage, FilterStage, FlangerStage,
    ReverbStage, DEFAULT_SAMPLE_RATE,
};
use crate::meter::block_rms;
use crate::params::ParamSnapshot;

/// Channels the effect stages process; further channels only see gain staging
pub const MAX_EFFECT_CHANNELS: usize = 2;

/// Stage names in processing order
pub const STAGE_ORDER: [&str; 6] = ["filter", "distortion", "chorus", "flanger", "delay", "reverb"];

/// RMS readings taken while processing one block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockLevels {
    /// Dry input, before input gain
    pub input: f32,
    /// Final output, after output gain
    pub output: f32,
}

/// Fixed six-stage chain with its scratch buffers
#[derive(Debug, Clone)]
pub struct EffectChain {
    filter: FilterStage,
    distortion: DistortionStage,
    chorus: ChorusStage,
    flanger: FlangerStage,
    delay: DelayStage,
    reverb: ReverbStage,
    /// Input captured before any processing
    dry: Vec<Vec<f32>>,
    /// Shared wet buffer each stage renders into
    wet: Vec<Vec<f32>>,
    sample_rate: f32,
    max_block_len: usize,
}

impl EffectChain {
    /// Create an unprepared chain; `process` is a no-op until `prepare`
    pub fn new() -> Self {
        Self {
            filter: FilterStage::new(),
            distortion: DistortionStage::new(),
            chorus: ChorusStage::new(),
            flanger: FlangerStage::new(),
            delay: DelayStage::new(),
            reverb: ReverbStage::new(),
            dry: Vec::new(),
            wet: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_len: 0,
        }
    }

    /// Allocate scratch buffers and reset every stage
    pub fn prepare(&mut self, sample_rate: f32, max_block_len: usize, channels: usize) {
        let effect_channels = channels.min(MAX_EFFECT_CHANNELS);

        self.sample_rate = sample_rate;
        self.max_block_len = max_block_len;
        self.dry = vec![vec![0.0; max_block_len]; effect_channels];
        self.wet = vec![vec![0.0; max_block_len]; effect_channels];

        self.filter.prepare(sample_rate, max_block_len);
        self.distortion.prepare(sample_rate, max_block_len);
        self.chorus.prepare(sample_rate, max_block_len);
        self.flanger.prepare(sample_rate, max_block_len);
        self.delay.prepare(sample_rate, max_block_len);
        self.reverb.prepare(sample_rate, max_block_len);

        debug!(
            "Chain prepared at {} Hz: {} on {} channel(s)",
            sample_rate,
            self.stage_names().join(" -> "),
            effect_channels
        );
    }

    /// Stage names in the order they run
    pub fn stage_names(&self) -> [&'static str; 6] {
        [
            self.filter.name(),
            self.distortion.name(),
            self.chorus.name(),
            self.flanger.name(),
            self.delay.name(),
            self.reverb.name(),
        ]
    }

    /// Clear all stage state without reallocating
    pub fn reset(&mut self) {
        self.filter.reset();
        self.distortion.reset();
        self.chorus.reset();
        self.flanger.reset();
        self.delay.reset();
        self.reverb.reset();
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of channels the stages run on
    pub fn effect_channels(&self) -> usize {
        self.dry.len()
    }

    pub fn is_prepared(&self) -> bool {
        self.max_block_len > 0
    }

    /// Process `channels[..][offset..offset + len]` in place
    ///
    /// `len` must not exceed the prepared block length; callers split longer
    /// blocks. Gain staging applies to every channel, the stages only to the
    /// first [`MAX_EFFECT_CHANNELS`].
    pub fn process<C>(
        &mut self,
        params: &ParamSnapshot,
        channels: &mut [C],
        offset: usize,
        len: usize,
    ) -> BlockLevels
    where
        C: AsRef<[f32]> + AsMut<[f32]>,
    {
        let len = len.min(self.max_block_len);
        if len == 0 {
            return BlockLevels::default();
        }
        let fx_channels = channels.len().min(self.dry.len());
        let range = offset..offset + len;

        for (dry, channel) in self.dry.iter_mut().zip(channels.iter()) {
            dry[..len].copy_from_slice(&channel.as_ref()[range.clone()]);
        }
        let input = block_rms(&self.dry[..fx_channels], 0..len);

        apply_gain(channels, range.clone(), db_to_linear(params.input_gain_db));

        let (main, wet) = (&mut channels[..fx_channels], &mut self.wet[..fx_channels]);
        run_stage(&mut self.filter, &params.filter, main, wet, offset, len);
        run_stage(&mut self.distortion, &params.distortion, main, wet, offset, len);
        run_stage(&mut self.chorus, &params.chorus, main, wet, offset, len);
        run_stage(&mut self.flanger, &params.flanger, main, wet, offset, len);
        run_stage(&mut self.delay, &params.delay, main, wet, offset, len);
        run_stage(&mut self.reverb, &params.reverb, main, wet, offset, len);

        // main * gm + dry * (1 - gm)
        let global_mix = params.global_mix.clamp(0.0, 1.0);
        if global_mix < GLOBAL_MIX_BYPASS {
            mix_into(main, offset, &self.dry[..fx_channels], len, 1.0 - global_mix);
        }

        apply_gain(channels, range.clone(), db_to_linear(params.output_gain_db));
        let output = block_rms(&channels[..fx_channels], range);

        BlockLevels { input, output }
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one stage into the wet buffer and blend it back at its mix
fn run_stage<S, C>(
    stage: &mut S,
    params: &S::Params,
    main: &mut [C],
    wet: &mut [Vec<f32>],
    offset: usize,
    len: usize,
) where
    S: Stage,
    C: AsRef<[f32]> + AsMut<[f32]>,
{
    if !params.is_active() {
        return;
    }

    for (scratch, channel) in wet.iter_mut().zip(main.iter()) {
        scratch[..len].copy_from_slice(&channel.as_ref()[offset..offset + len]);
    }
    stage.process(params, wet, len);
    mix_into(main, offset, wet, len, params.mix());
}

fn apply_gain<C: AsMut<[f32]>>(channels: &mut [C], range: std::ops::Range<usize>, gain: f32) {
    if gain == 1.0 {
        return;
    }
    for channel in channels.iter_mut() {
        for sample in &mut channel.as_mut()[range.clone()] {
            *sample *= gain;
        }
    }
}

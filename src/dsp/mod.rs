//! DSP Effects Library
//!
//! The six stages of the chain plus the chain itself. Every stage implements
//! [`Stage`] and produces a fully-wet signal; blending against the dry signal
//! is done by the chain, never inside a stage.
//!
//! Fixed order: Filter → Distortion → Chorus → Flanger → Delay → Reverb

mod chain;
mod chorus;
mod delay;
mod delay_line;
mod distortion;
mod filter;
mod flanger;
mod reverb;
mod stage;

pub use chain::{BlockLevels, EffectChain, MAX_EFFECT_CHANNELS, STAGE_ORDER};
pub use chorus::{ChorusParams, ChorusStage};
pub use delay::{DelayParams, DelayStage};
pub use delay_line::DelayLine;
pub use distortion::{DistortionParams, DistortionStage};
pub use filter::{clamp_cutoff, FilterKind, FilterParams, FilterStage};
pub use flanger::{FlangerParams, FlangerStage};
pub use reverb::{ReverbParams, ReverbStage};
pub use stage::{mix_into, Stage, StageControls, GLOBAL_MIX_BYPASS, MIX_EPSILON};

/// Sample rate stages are built for before the first `prepare`
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Threshold for flushing denormal numbers to zero
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Flush values too small to matter to zero in recursive state
#[inline]
pub(crate) fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Get default order index for a stage name (lower = earlier in chain)
pub fn stage_order(name: &str) -> Option<usize> {
    match name {
        "filter" => Some(0),
        "distortion" => Some(1),
        "chorus" => Some(2),
        "flanger" => Some(3),
        "delay" => Some(4),
        "reverb" => Some(5),
        _ => None,
    }
}

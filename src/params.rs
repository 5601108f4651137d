//! Parameter definitions and lock-free storage
//!
//! Every control value lives in an `AtomicU32` holding the bits of an `f32`,
//! so the control thread can write while the audio thread reads without a
//! lock. The audio thread takes one [`ParamSnapshot`] per block and never
//! re-reads mid-block.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use log::warn;
use serde::Serialize;

use crate::dsp::{
    ChorusParams, DelayParams, DistortionParams, FilterParams, FlangerParams, ReverbParams,
};
use crate::error::{FxError, Result};

/// Skew used by frequency and time controls for normalized mapping
pub const LOG_SKEW: f32 = 0.5;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of every automatable control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamId {
    InputGain,
    OutputGain,
    GlobalMix,
    FilterEnabled,
    HpfCutoff,
    LpfCutoff,
    FilterMix,
    DistortionEnabled,
    Drive,
    DistortionMix,
    ChorusEnabled,
    ChorusRate,
    ChorusDepth,
    ChorusMix,
    FlangerEnabled,
    FlangerRate,
    FlangerDepth,
    FlangerFeedback,
    FlangerMix,
    DelayEnabled,
    DelayTime,
    DelayFeedback,
    DelayMix,
    ReverbEnabled,
    RoomSize,
    Damping,
    ReverbMix,
}

impl ParamId {
    /// Number of parameters
    pub const COUNT: usize = 27;

    /// All parameters in declaration order
    pub const ALL: [ParamId; ParamId::COUNT] = [
        ParamId::InputGain,
        ParamId::OutputGain,
        ParamId::GlobalMix,
        ParamId::FilterEnabled,
        ParamId::HpfCutoff,
        ParamId::LpfCutoff,
        ParamId::FilterMix,
        ParamId::DistortionEnabled,
        ParamId::Drive,
        ParamId::DistortionMix,
        ParamId::ChorusEnabled,
        ParamId::ChorusRate,
        ParamId::ChorusDepth,
        ParamId::ChorusMix,
        ParamId::FlangerEnabled,
        ParamId::FlangerRate,
        ParamId::FlangerDepth,
        ParamId::FlangerFeedback,
        ParamId::FlangerMix,
        ParamId::DelayEnabled,
        ParamId::DelayTime,
        ParamId::DelayFeedback,
        ParamId::DelayMix,
        ParamId::ReverbEnabled,
        ParamId::RoomSize,
        ParamId::Damping,
        ParamId::ReverbMix,
    ];

    /// Slot index in the atomic store
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable string identifier used by hosts and the CLI
    pub fn as_str(self) -> &'static str {
        match self {
            ParamId::InputGain => "input_gain",
            ParamId::OutputGain => "output_gain",
            ParamId::GlobalMix => "global_mix",
            ParamId::FilterEnabled => "filter_enabled",
            ParamId::HpfCutoff => "hpf_cutoff",
            ParamId::LpfCutoff => "lpf_cutoff",
            ParamId::FilterMix => "filter_mix",
            ParamId::DistortionEnabled => "distortion_enabled",
            ParamId::Drive => "drive",
            ParamId::DistortionMix => "distortion_mix",
            ParamId::ChorusEnabled => "chorus_enabled",
            ParamId::ChorusRate => "chorus_rate",
            ParamId::ChorusDepth => "chorus_depth",
            ParamId::ChorusMix => "chorus_mix",
            ParamId::FlangerEnabled => "flanger_enabled",
            ParamId::FlangerRate => "flanger_rate",
            ParamId::FlangerDepth => "flanger_depth",
            ParamId::FlangerFeedback => "flanger_feedback",
            ParamId::FlangerMix => "flanger_mix",
            ParamId::DelayEnabled => "delay_enabled",
            ParamId::DelayTime => "delay_time",
            ParamId::DelayFeedback => "delay_feedback",
            ParamId::DelayMix => "delay_mix",
            ParamId::ReverbEnabled => "reverb_enabled",
            ParamId::RoomSize => "room_size",
            ParamId::Damping => "damping",
            ParamId::ReverbMix => "reverb_mix",
        }
    }

    /// Full descriptor: display name, unit and range
    pub fn info(self) -> ParamInfo {
        let (name, unit, range) = match self {
            ParamId::InputGain => ("Input Gain", "dB", ParamRange::linear(-24.0, 24.0, 0.0)),
            ParamId::OutputGain => ("Output Gain", "dB", ParamRange::linear(-24.0, 24.0, 0.0)),
            ParamId::GlobalMix => ("Global Mix", "%", ParamRange::percent(100.0)),
            ParamId::FilterEnabled => ("Filters On", "", ParamRange::toggle(true)),
            ParamId::HpfCutoff => ("HPF", "Hz", ParamRange::skewed(20.0, 20000.0, 120.0)),
            ParamId::LpfCutoff => ("LPF", "Hz", ParamRange::skewed(20.0, 20000.0, 16000.0)),
            ParamId::FilterMix => ("Filters Mix", "%", ParamRange::percent(100.0)),
            ParamId::DistortionEnabled => ("Dist On", "", ParamRange::toggle(true)),
            ParamId::Drive => ("Drive", "dB", ParamRange::linear(0.0, 24.0, 6.0)),
            ParamId::DistortionMix => ("Dist Mix", "%", ParamRange::percent(30.0)),
            ParamId::ChorusEnabled => ("Chorus On", "", ParamRange::toggle(true)),
            ParamId::ChorusRate => ("Chorus Rate", "Hz", ParamRange::skewed(0.05, 8.0, 0.8)),
            ParamId::ChorusDepth => ("Chorus Depth", "", ParamRange::linear(0.0, 1.0, 0.25)),
            ParamId::ChorusMix => ("Chorus Mix", "%", ParamRange::percent(25.0)),
            ParamId::FlangerEnabled => ("Flanger On", "", ParamRange::toggle(true)),
            ParamId::FlangerRate => ("Flanger Rate", "Hz", ParamRange::skewed(0.05, 5.0, 0.35)),
            ParamId::FlangerDepth => ("Flanger Depth", "", ParamRange::linear(0.0, 1.0, 0.6)),
            ParamId::FlangerFeedback => {
                ("Flanger FB", "", ParamRange::linear(-0.95, 0.95, 0.2))
            }
            ParamId::FlangerMix => ("Flanger Mix", "%", ParamRange::percent(20.0)),
            ParamId::DelayEnabled => ("Delay On", "", ParamRange::toggle(true)),
            ParamId::DelayTime => ("Delay Time", "ms", ParamRange::skewed(1.0, 1200.0, 220.0)),
            ParamId::DelayFeedback => ("Delay Feedback", "", ParamRange::linear(0.0, 0.95, 0.35)),
            ParamId::DelayMix => ("Delay Mix", "%", ParamRange::percent(22.0)),
            ParamId::ReverbEnabled => ("Reverb On", "", ParamRange::toggle(true)),
            ParamId::RoomSize => ("Room Size", "", ParamRange::linear(0.0, 1.0, 0.35)),
            ParamId::Damping => ("Damping", "", ParamRange::linear(0.0, 1.0, 0.5)),
            ParamId::ReverbMix => ("Reverb Mix", "%", ParamRange::percent(18.0)),
        };

        ParamInfo {
            id: self,
            name,
            unit,
            range,
        }
    }

    /// Shorthand for `self.info().range`
    pub fn range(self) -> ParamRange {
        self.info().range
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamId {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ParamId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| FxError::UnknownParameter {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Ranges
// ============================================================================

/// Whether a parameter is continuous or a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Float,
    Bool,
}

/// Valid range, default and normalized-mapping skew of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    /// 1.0 is linear; below 1.0 spends more of the normalized travel near `min`
    pub skew: f32,
    pub kind: ParamKind,
}

impl ParamRange {
    pub const fn linear(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            skew: 1.0,
            kind: ParamKind::Float,
        }
    }

    pub const fn skewed(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            skew: LOG_SKEW,
            kind: ParamKind::Float,
        }
    }

    pub const fn percent(default: f32) -> Self {
        Self::linear(0.0, 100.0, default)
    }

    pub const fn toggle(default: bool) -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            skew: 1.0,
            kind: ParamKind::Bool,
        }
    }

    /// Clamp into range; switches snap to 0.0 or 1.0
    pub fn clamp(&self, value: f32) -> f32 {
        match self.kind {
            ParamKind::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Float => value.clamp(self.min, self.max),
        }
    }

    /// Map a plain value into [0, 1]
    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = ((self.clamp(value) - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// Map a [0, 1] value back to the plain range
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let proportion = if self.skew == 1.0 || normalized <= 0.0 {
            normalized
        } else {
            (normalized.ln() / self.skew).exp()
        };
        self.clamp(self.min + (self.max - self.min) * proportion)
    }
}

/// Descriptor of one parameter, for hosts and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamInfo {
    pub id: ParamId,
    pub name: &'static str,
    pub unit: &'static str,
    pub range: ParamRange,
}

// ============================================================================
// Atomic Store
// ============================================================================

/// Lock-free parameter store shared between control and audio threads
#[derive(Debug)]
pub struct Parameters {
    values: [AtomicU32; ParamId::COUNT],
}

impl Parameters {
    /// Create a store holding every default
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| {
                AtomicU32::new(ParamId::ALL[i].range().default.to_bits())
            }),
        }
    }

    /// Current plain value
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Store a plain value, clamped to its range. Returns the stored value.
    ///
    /// NaN is ignored and the previous value kept.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        if value.is_nan() {
            warn!("Ignoring NaN write to parameter '{}'", id);
            return self.get(id);
        }
        let clamped = id.range().clamp(value);
        self.values[id.index()].store(clamped.to_bits(), Ordering::Relaxed);
        clamped
    }

    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    pub fn set_bool(&self, id: ParamId, on: bool) {
        self.set(id, if on { 1.0 } else { 0.0 });
    }

    /// Current value mapped into [0, 1]
    pub fn get_normalized(&self, id: ParamId) -> f32 {
        id.range().to_normalized(self.get(id))
    }

    /// Store a value given in [0, 1]
    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        if normalized.is_nan() {
            warn!("Ignoring NaN normalized write to parameter '{}'", id);
            return self.get(id);
        }
        self.set(id, id.range().from_normalized(normalized))
    }

    /// Store a value by string identifier
    pub fn set_by_name(&self, name: &str, value: f32) -> Result<f32> {
        let id: ParamId = name.parse()?;
        Ok(self.set(id, value))
    }

    /// Read a value by string identifier
    pub fn get_by_name(&self, name: &str) -> Result<f32> {
        let id: ParamId = name.parse()?;
        Ok(self.get(id))
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.set(id, id.range().default);
        }
    }

    /// Read every value once, producing the typed per-block view
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot::from_values(|id| self.get(id))
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable, typed view of all controls for one block
///
/// Mix values are fractions in [0, 1] (the store keeps percent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSnapshot {
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub global_mix: f32,
    pub filter: FilterParams,
    pub distortion: DistortionParams,
    pub chorus: ChorusParams,
    pub flanger: FlangerParams,
    pub delay: DelayParams,
    pub reverb: ReverbParams,
}

impl ParamSnapshot {
    fn from_values(value: impl Fn(ParamId) -> f32) -> Self {
        let on = |id: ParamId| value(id) >= 0.5;
        let fraction = |id: ParamId| value(id) / 100.0;

        Self {
            input_gain_db: value(ParamId::InputGain),
            output_gain_db: value(ParamId::OutputGain),
            global_mix: fraction(ParamId::GlobalMix),
            filter: FilterParams {
                enabled: on(ParamId::FilterEnabled),
                hpf_hz: value(ParamId::HpfCutoff),
                lpf_hz: value(ParamId::LpfCutoff),
                mix: fraction(ParamId::FilterMix),
            },
            distortion: DistortionParams {
                enabled: on(ParamId::DistortionEnabled),
                drive_db: value(ParamId::Drive),
                mix: fraction(ParamId::DistortionMix),
            },
            chorus: ChorusParams {
                enabled: on(ParamId::ChorusEnabled),
                rate_hz: value(ParamId::ChorusRate),
                depth: value(ParamId::ChorusDepth),
                mix: fraction(ParamId::ChorusMix),
            },
            flanger: FlangerParams {
                enabled: on(ParamId::FlangerEnabled),
                rate_hz: value(ParamId::FlangerRate),
                depth: value(ParamId::FlangerDepth),
                feedback: value(ParamId::FlangerFeedback),
                mix: fraction(ParamId::FlangerMix),
            },
            delay: DelayParams {
                enabled: on(ParamId::DelayEnabled),
                time_ms: value(ParamId::DelayTime),
                feedback: value(ParamId::DelayFeedback),
                mix: fraction(ParamId::DelayMix),
            },
            reverb: ReverbParams {
                enabled: on(ParamId::ReverbEnabled),
                room_size: value(ParamId::RoomSize),
                damping: value(ParamId::Damping),
                mix: fraction(ParamId::ReverbMix),
            },
        }
    }

    /// Snapshot with every stage switched off
    pub fn bypassed() -> Self {
        let mut snapshot = Self::default();
        snapshot.filter.enabled = false;
        snapshot.distortion.enabled = false;
        snapshot.chorus.enabled = false;
        snapshot.flanger.enabled = false;
        snapshot.delay.enabled = false;
        snapshot.reverb.enabled = false;
        snapshot
    }
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self::from_values(|id| id.range().default)
    }
}

//! Level metering
//!
//! One RMS reading per block, smoothed with a decay-hold: the stored value
//! jumps up to any louder reading and otherwise falls by a fixed factor per
//! block. Written by the audio thread, read at will by the control thread.

use std::sync::atomic::{AtomicU32, Ordering};

/// Per-block decay factor applied to the held level
pub const METER_DECAY_PER_BLOCK: f32 = 0.92;

/// Decay-hold level meter backed by an atomic `f32`
#[derive(Debug)]
pub struct LevelMeter {
    value: AtomicU32,
    decay: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::with_decay(METER_DECAY_PER_BLOCK)
    }

    pub fn with_decay(decay: f32) -> Self {
        Self {
            value: AtomicU32::new(0.0_f32.to_bits()),
            decay: decay.clamp(0.0, 1.0),
        }
    }

    /// Most recent held level (linear, non-negative)
    #[inline]
    pub fn level(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Fold a new block reading into the held value and return it
    pub fn update(&self, reading: f32) -> f32 {
        let reading = if reading.is_finite() { reading.max(0.0) } else { 0.0 };
        let decayed = self.level() * self.decay;
        let held = if reading > decayed { reading } else { decayed };
        self.value.store(held.to_bits(), Ordering::Relaxed);
        held
    }

    pub fn reset(&self) {
        self.value.store(0.0_f32.to_bits(), Ordering::Relaxed);
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS over `range` of every channel in `channels`, pooled together
///
/// Accumulates in `f64`. Returns 0.0 when there is nothing to measure.
pub fn block_rms<C: AsRef<[f32]>>(channels: &[C], range: std::ops::Range<usize>) -> f32 {
    let mut sum = 0.0_f64;
    let mut count = 0_usize;

    for channel in channels {
        let Some(samples) = channel.as_ref().get(range.clone()) else {
            continue;
        };
        sum += samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
        count += samples.len();
    }

    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt() as f32
}

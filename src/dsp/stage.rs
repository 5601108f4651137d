//! Stage trait and the wet/dry blend primitive

/// Mix fractions at or below this are treated as zero and the stage skipped
pub const MIX_EPSILON: f32 = 1e-4;

/// Global mix at or above this skips the final dry blend
pub const GLOBAL_MIX_BYPASS: f32 = 0.9999;

/// Enable flag and mix fraction carried by every stage's parameters
pub trait StageControls {
    fn enabled(&self) -> bool;

    /// Wet/dry fraction in [0, 1]
    fn mix(&self) -> f32;

    /// Whether the stage should run at all for this block
    fn is_active(&self) -> bool {
        self.enabled() && self.mix() > MIX_EPSILON
    }
}

/// One effect unit of the chain
///
/// `process` replaces the first `len` samples of each channel with the
/// stage's fully-wet output. Internal state (history, delay lines, LFO
/// phase) persists across calls and is cleared only by `prepare`/`reset`.
pub trait Stage: Send {
    type Params: StageControls;

    /// Stage name as used for ordering and logging
    fn name(&self) -> &'static str;

    /// (Re)allocate for a sample rate and clear all state
    ///
    /// Called when sample rate or block size changes.
    fn prepare(&mut self, sample_rate: f32, max_block_len: usize);

    /// Clear internal state without reallocating
    fn reset(&mut self);

    /// Transform `channels[..][..len]` in place into the wet signal
    fn process(&mut self, params: &Self::Params, channels: &mut [Vec<f32>], len: usize);
}

/// Crossfade `other` into `main` in place: `main * (1 - m) + other * m`
///
/// `main` is read from `offset`, `other` from 0, for `len` samples of each
/// channel both have. Fractions at or below [`MIX_EPSILON`] leave `main`
/// untouched.
pub fn mix_into<C: AsMut<[f32]>>(
    main: &mut [C],
    offset: usize,
    other: &[Vec<f32>],
    len: usize,
    mix: f32,
) {
    let mix = mix.clamp(0.0, 1.0);
    if mix <= MIX_EPSILON {
        return;
    }
    let keep = 1.0 - mix;

    for (main_ch, other_ch) in main.iter_mut().zip(other.iter()) {
        let main_ch = &mut main_ch.as_mut()[offset..offset + len];
        for (m, &o) in main_ch.iter_mut().zip(&other_ch[..len]) {
            *m = *m * keep + o * mix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Controls(bool, f32);

    impl StageControls for Controls {
        fn enabled(&self) -> bool {
            self.0
        }
        fn mix(&self) -> f32 {
            self.1
        }
    }

    #[test]
    fn test_is_active() {
        assert!(Controls(true, 0.5).is_active());
        assert!(!Controls(false, 0.5).is_active());
        assert!(!Controls(true, 0.0).is_active());
        assert!(!Controls(true, 0.00005).is_active());
    }

    #[test]
    fn test_mix_into_half() {
        let mut main = vec![vec![1.0_f32; 8]];
        let other = vec![vec![0.0_f32; 8]];
        mix_into(&mut main, 0, &other, 8, 0.5);
        assert!(main[0].iter().all(|&s| (s - 0.5).abs() < 1e-7));
    }

    #[test]
    fn test_mix_into_full_replaces() {
        let mut main = vec![vec![0.25_f32; 4], vec![-0.25_f32; 4]];
        let other = vec![vec![0.75_f32; 4], vec![0.5_f32; 4]];
        mix_into(&mut main, 0, &other, 4, 1.0);
        assert_eq!(main, other);
    }

    #[test]
    fn test_mix_into_below_epsilon_is_noop() {
        let mut main = vec![vec![0.3_f32; 4]];
        let other = vec![vec![100.0_f32; 4]];
        mix_into(&mut main, 0, &other, 4, MIX_EPSILON * 0.5);
        assert_eq!(main[0], vec![0.3_f32; 4]);
    }

    #[test]
    fn test_mix_into_respects_offset() {
        let mut main = vec![vec![1.0_f32; 8]];
        let other = vec![vec![0.0_f32; 8]];
        mix_into(&mut main, 4, &other, 2, 1.0);
        assert_eq!(main[0], vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_mix_into_clamps_fraction() {
        let mut main = vec![vec![1.0_f32; 2]];
        let other = vec![vec![3.0_f32; 2]];
        mix_into(&mut main, 0, &other, 2, 7.0);
        assert_relative_eq!(main[0][0], 3.0);
    }
}

//! Fractional delay line
//!
//! Ring buffer with linear interpolation between neighbouring taps. Reads
//! are taken before the current sample is written, so a delay of `d`
//! returns the sample pushed `d` pushes ago.

/// Circular delay buffer with linearly interpolated reads
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a line able to delay by up to `max_delay_samples`
    pub fn new(max_delay_samples: usize) -> Self {
        // Two extra slots: one for the interpolation neighbour, one so the
        // longest tap never aliases the slot about to be written
        Self {
            buffer: vec![0.0; max_delay_samples.max(1) + 2],
            write_pos: 0,
        }
    }

    /// Longest delay that can be read, in samples
    #[inline]
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 2) as f32
    }

    /// Number of slots in the ring
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Read the signal `delay` samples in the past
    ///
    /// Delays are clamped to `1..=max_delay()`.
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let delay = delay.clamp(1.0, self.max_delay());
        let whole = delay.floor();
        let frac = delay - whole;

        let len = self.buffer.len();
        let whole = whole as usize;
        let newer = self.buffer[(self.write_pos + len - whole) % len];
        let older = self.buffer[(self.write_pos + len - whole - 1) % len];

        newer + frac * (older - newer)
    }

    /// Write the next sample
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Clear the buffer
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

//! Turns raw quadrature-encoder detents into a clamped octave shift.

use heapless::spsc::Consumer;

use crate::config::{ENCODER_CLICKS_PER_STEP, MAX_OCTAVE_OFFSET, MIN_OCTAVE_OFFSET};

/// Accumulates raw encoder deltas and derives the current octave shift.
///
/// Each full step's worth of clicks is consumed from the accumulator and applied to the running
/// total unconditionally, before the total is clamped to the visible range. A step spent sitting
/// at a limit is therefore never "wasted": reversing direction costs exactly one step's clicks to
/// start moving back, the same as any other step, rather than first needing to pay down clicks
/// that were silently dropped while saturated.
pub struct EncoderEngine {
    raw_total: i32,
    accumulated_delta: i32,
}

impl EncoderEngine {
    pub const fn new() -> Self {
        Self {
            raw_total: 0,
            accumulated_delta: 0,
        }
    }

    /// The current octave shift, clamped to the configured range.
    pub fn octave_offset(&self) -> i8 {
        self.raw_total as i8
    }

    /// Drains every queued detent delta and updates the octave shift.
    pub fn process<const N: usize>(&mut self, deltas: &mut Consumer<i8, N>) {
        while let Some(delta) = deltas.dequeue() {
            self.apply_delta(delta as i32);
        }
    }

    fn apply_delta(&mut self, delta: i32) {
        self.accumulated_delta += delta;

        while self.accumulated_delta >= ENCODER_CLICKS_PER_STEP {
            self.accumulated_delta -= ENCODER_CLICKS_PER_STEP;
            self.raw_total =
                (self.raw_total + 1).clamp(MIN_OCTAVE_OFFSET as i32, MAX_OCTAVE_OFFSET as i32);
        }
        while self.accumulated_delta <= -ENCODER_CLICKS_PER_STEP {
            self.accumulated_delta += ENCODER_CLICKS_PER_STEP;
            self.raw_total =
                (self.raw_total - 1).clamp(MIN_OCTAVE_OFFSET as i32, MAX_OCTAVE_OFFSET as i32);
        }
    }
}

impl Default for EncoderEngine {
    fn default() -> Self {
        Self::new()
    }
}

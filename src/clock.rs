//! Monotonic time, out of scope for this crate beyond a one-method contract.
//!
//! `MainLoop` computes a next-deadline and waits for it rather than sleeping a fixed duration, to
//! bound scheduling drift. All it needs from the board-support layer is a free-running
//! millisecond counter.

/// A monotonic millisecond clock. Wraps after `u32::MAX` ms (about 49.7 days); `MainLoop`'s
/// deadline arithmetic uses wrapping subtraction so a single wraparound does not cause a missed
/// or doubled tick.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

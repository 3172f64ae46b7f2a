//! Per-key state for the dual-phase pressure state machine.

/// The phase of a single key's dual-phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum KeyPhase {
    Idle,
    Rising,
    Held,
    Releasing,
}

/// One key's full state. `NUM_KEYS` instances are owned by `KeyEngine`, statically allocated for
/// the program's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub phase: KeyPhase,

    /// Most recent raw reading at pressure point A (rest-break).
    pub sample_a: u16,
    /// Most recent raw reading at pressure point B (bottom-out).
    pub sample_b: u16,

    /// 7-bit velocity latched at note-on.
    pub velocity: u8,
    /// 7-bit pressure, updated while Held.
    pub pressure: u8,
    /// 7-bit MIDI note number, computed at note-on from key index + octave offset.
    pub note_number: u8,
    /// MPE member channel this key is sounding on, or `None` when not Held.
    pub assigned_channel: Option<u8>,

    /// Timestamp (ms) of the first (point A) threshold crossing, used to derive velocity from the
    /// interval until the point B crossing.
    pub t_rising_start: u32,

    /// Number of consecutive scans the current pending transition's condition has held.
    ///
    /// Filters single-sample ADC glitches; reset whenever the condition stops holding or a
    /// transition fires.
    pub(crate) debounce: u8,

    /// Last pressure value a ChannelPressure message was emitted for, or `None` if none has been
    /// sent since the current note-on.
    pub(crate) last_emitted_pressure: Option<u8>,
}

impl Key {
    pub const fn new() -> Self {
        Self {
            phase: KeyPhase::Idle,
            sample_a: 0,
            sample_b: 0,
            velocity: 0,
            pressure: 0,
            note_number: 0,
            assigned_channel: None,
            t_rising_start: 0,
            debounce: 0,
            last_emitted_pressure: None,
        }
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::new()
    }
}

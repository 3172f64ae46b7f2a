//! Per-pot state for the exponential-moving-average filter pipeline.

/// One continuous controller's full state. `NUM_POTS` instances are owned by `PotEngine`.
#[derive(Debug, Clone, Copy)]
pub struct Pot {
    /// Smoothed reading, in raw ADC units. Updated every scan by the EMA filter regardless of
    /// whether a message is emitted.
    pub smoothed: f32,

    /// Last 7-bit CC value emitted, or `None` before the first emission.
    pub(crate) last_emitted: Option<u8>,

    /// MIDI CC number this pot currently maps to. Defaults from `config::DEFAULT_POT_CC`, and can
    /// be remapped at runtime by an ASCII `cc` command.
    pub cc_number: u8,

    /// Number of consecutive scans the pending 7-bit value has agreed with the previous scan's
    /// pending value. A new value is emitted only once this reaches `config::DEBOUNCE_SCANS`.
    pub(crate) debounce: u8,

    /// The pending 7-bit value the debounce counter is tracking agreement for.
    pub(crate) pending_value: u8,
}

impl Pot {
    pub const fn new(cc_number: u8) -> Self {
        Self {
            smoothed: 0.0,
            last_emitted: None,
            cc_number,
            debounce: 0,
            pending_value: 0,
        }
    }
}

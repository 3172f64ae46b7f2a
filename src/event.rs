//! Tagged events produced by the input engines and the MPE allocator, consumed by the MIDI
//! encoding stage.
//!
//! A single sum type dispatched at one site, rather than a trait object per input source.

/// An event produced by one of the input engines, or by the MPE allocator's own side effects
/// (channel-reset messages, forced note-offs from stealing), in a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Event {
    /// A key crossed into Held. `channel` is the MPE member channel assigned to it.
    NoteOn {
        key_index: u8,
        channel: u8,
        note_number: u8,
        velocity: u8,
    },
    /// A key left Held, either by release or by being stolen for another note.
    NoteOff {
        key_index: u8,
        channel: u8,
        note_number: u8,
    },
    /// A Held key's pressure crossed the dead-band, or a channel was reset to zero pressure.
    ChannelPressure { channel: u8, pressure: u8 },
    /// A control change on the given channel: a pot's value crossing the dead-band (always on
    /// the manager channel) or a timbre/RPN reset emitted by the MPE allocator on a member
    /// channel.
    ControlChange {
        channel: u8,
        cc_number: u8,
        value: u8,
    },
    /// A 14-bit pitch-bend, centred at 8192. Only ever emitted by the MPE allocator resetting a
    /// channel; nothing in this crate bends pitch in response to a live input.
    PitchBend { channel: u8, value: u16 },
}

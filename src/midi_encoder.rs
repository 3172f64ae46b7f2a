//! Stateless translation from `Event`s to MIDI byte chunks.
//!
//! Every function here is a pure formatter: given the data a message needs, it returns the exact
//! bytes, with no knowledge of queues, channels-in-use, or timing. `TransportMux` owns the bytes
//! once they are produced.

use heapless::Vec;

/// A complete MIDI message, 1-5 bytes, depending on message type (RPN sequences are longer
/// multi-message bundles handled by `mpe_configuration_message` and `pitch_bend_range_rpn`, which
/// return several chunks rather than pretending to be a single status byte).
pub type Chunk = Vec<u8, 3>;

fn status(kind: u8, channel: u8) -> u8 {
    debug_assert!((1..=16).contains(&channel));
    kind | (channel - 1)
}

pub fn note_on(channel: u8, note_number: u8, velocity: u8) -> Chunk {
    let mut chunk = Chunk::new();
    let _ = chunk.push(status(0x90, channel));
    let _ = chunk.push(note_number & 0x7F);
    let _ = chunk.push(velocity & 0x7F);
    chunk
}

pub fn note_off(channel: u8, note_number: u8) -> Chunk {
    let mut chunk = Chunk::new();
    let _ = chunk.push(status(0x80, channel));
    let _ = chunk.push(note_number & 0x7F);
    let _ = chunk.push(0);
    chunk
}

pub fn channel_pressure(channel: u8, pressure: u8) -> Chunk {
    let mut chunk = Chunk::new();
    let _ = chunk.push(status(0xD0, channel));
    let _ = chunk.push(pressure & 0x7F);
    chunk
}

pub fn control_change(channel: u8, cc_number: u8, value: u8) -> Chunk {
    let mut chunk = Chunk::new();
    let _ = chunk.push(status(0xB0, channel));
    let _ = chunk.push(cc_number & 0x7F);
    let _ = chunk.push(value & 0x7F);
    chunk
}

/// 14-bit pitch-bend, LSB-first as the MIDI wire format requires, centred at `value == 8192`.
pub fn pitch_bend(channel: u8, value: u16) -> Chunk {
    let value = value & 0x3FFF;
    let mut chunk = Chunk::new();
    let _ = chunk.push(status(0xE0, channel));
    let _ = chunk.push((value & 0x7F) as u8);
    let _ = chunk.push((value >> 7) as u8);
    chunk
}

/// RPN 0 (pitch-bend sensitivity) for `channel`, declaring `semitones` (cents always 0).
///
/// Six CC messages: RPN MSB/LSB select, data-entry MSB/LSB, then the null-RPN deselect pair
/// (101=127, 100=127) so the RPN pointer does not linger active and catch a later, unrelated
/// CC 6/38 pair.
pub fn pitch_bend_range_rpn(channel: u8, semitones: u8) -> [Chunk; 6] {
    [
        control_change(channel, 101, 0),
        control_change(channel, 100, 0),
        control_change(channel, 6, semitones & 0x7F),
        control_change(channel, 38, 0),
        control_change(channel, 101, 127),
        control_change(channel, 100, 127),
    ]
}

/// RPN 6 (MPE Configuration Message), declaring the manager channel as the zone master of a lower
/// zone spanning `member_count` member channels.
///
/// Four CC messages on the manager channel: RPN MSB/LSB select, then data-entry MSB (member
/// count) and LSB (always 0).
pub fn mpe_configuration_message(manager_channel: u8, member_count: u8) -> [Chunk; 4] {
    [
        control_change(manager_channel, 101, 0),
        control_change(manager_channel, 100, 6),
        control_change(manager_channel, 6, member_count & 0x7F),
        control_change(manager_channel, 38, 0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_status_byte_encodes_zero_indexed_channel() {
        let chunk = note_on(1, 60, 100);
        assert_eq!(chunk[0], 0x90);
        let chunk = note_on(16, 60, 100);
        assert_eq!(chunk[0], 0x9F);
    }

    #[test]
    fn pitch_bend_splits_fourteen_bits_lsb_first() {
        let chunk = pitch_bend(2, 8192);
        assert_eq!(chunk[1], 0x00);
        assert_eq!(chunk[2], 0x40);
    }

    #[test]
    fn mpe_configuration_message_declares_member_count_in_data_entry_msb() {
        let chunks = mpe_configuration_message(1, 15);
        assert_eq!(chunks[2][1], 6);
        assert_eq!(chunks[2][2], 15);
    }

    #[test]
    fn pitch_bend_range_rpn_deselects_the_rpn_pointer_after_data_entry() {
        let chunks = pitch_bend_range_rpn(2, 48);
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks[2][1], 6);
        assert_eq!(chunks[2][2], 48);
        assert_eq!((chunks[4][1], chunks[4][2]), (101, 127));
        assert_eq!((chunks[5][1], chunks[5][2]), (100, 127));
    }
}

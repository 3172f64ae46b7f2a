//! Multiplexes MIDI bytes and line-terminated ASCII text over one shared UART.
//!
//! Outbound: two independent queues, MIDI strictly ahead of ASCII. Continuous-controller updates
//! (pressure, CC, pitch-bend) coalesce in place, so a burst of the same control only ever holds
//! one slot; note-on/note-off never coalesce and are only ever dropped if the queue is genuinely
//! exhausted of everything else to evict, which `MIDI_QUEUE_CAPACITY` is sized well past any
//! single tick's worth of traffic to avoid.
//!
//! Inbound: a byte-level classifier tracks how many data bytes the current MIDI status byte
//! still owns, so ASCII text interleaved between MIDI messages is never mistaken for MIDI data
//! and vice versa. Classified MIDI bytes are discarded; classified ASCII bytes accumulate into a
//! line, completed on `\n`.

use heapless::{String, Vec};

use crate::config::{
    ASCII_LINE_CAPACITY, ASCII_QUEUE_CAPACITY, ASCII_RX_QUEUE_CAPACITY, MAX_FRAMES_PER_TICK,
    MIDI_QUEUE_CAPACITY,
};
use crate::event::Event;
use crate::midi_encoder::{channel_pressure, control_change, note_off, note_on, pitch_bend, Chunk};
use crate::uart::Uart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoalesceKey {
    Pressure(u8),
    Cc(u8, u8),
    Bend(u8),
}

struct QueuedMidi {
    key: Option<CoalesceKey>,
    chunk: Chunk,
}

/// One frame in flight on the wire: either MIDI bytes as-is, or an ASCII line with its
/// terminating newline appended.
enum InFlight {
    Midi(Chunk, usize),
    Ascii(String<ASCII_LINE_CAPACITY>, usize),
}

pub struct TransportMux {
    midi_out: Vec<QueuedMidi, MIDI_QUEUE_CAPACITY>,
    ascii_out: Vec<String<ASCII_LINE_CAPACITY>, ASCII_QUEUE_CAPACITY>,
    in_flight: Option<InFlight>,

    rx_line: String<ASCII_LINE_CAPACITY>,
    rx_queue: Vec<String<ASCII_LINE_CAPACITY>, ASCII_RX_QUEUE_CAPACITY>,
    midi_data_bytes_remaining: u8,
}

impl TransportMux {
    pub fn new() -> Self {
        Self {
            midi_out: Vec::new(),
            ascii_out: Vec::new(),
            in_flight: None,
            rx_line: String::new(),
            rx_queue: Vec::new(),
            midi_data_bytes_remaining: 0,
        }
    }

    /// Converts an `Event` to its MIDI chunk and queues it, coalescing continuous-controller
    /// events in place.
    pub fn enqueue_event(&mut self, event: Event) {
        match event {
            Event::NoteOn {
                channel,
                note_number,
                velocity,
                ..
            } => self.enqueue_priority(note_on(channel, note_number, velocity)),
            Event::NoteOff {
                channel,
                note_number,
                ..
            } => self.enqueue_priority(note_off(channel, note_number)),
            Event::ChannelPressure { channel, pressure } => self.enqueue_coalesced(
                CoalesceKey::Pressure(channel),
                channel_pressure(channel, pressure),
            ),
            Event::ControlChange {
                channel,
                cc_number,
                value,
            } => self.enqueue_coalesced(
                CoalesceKey::Cc(channel, cc_number),
                control_change(channel, cc_number, value),
            ),
            Event::PitchBend { channel, value } => {
                self.enqueue_coalesced(CoalesceKey::Bend(channel), pitch_bend(channel, value))
            }
        }
    }

    /// Queues a raw chunk (used for multi-message bundles like RPN sequences) without
    /// coalescing.
    pub fn enqueue_raw_midi(&mut self, chunk: Chunk) {
        self.enqueue_priority(chunk);
    }

    fn enqueue_coalesced(&mut self, key: CoalesceKey, chunk: Chunk) {
        if let Some(existing) = self
            .midi_out
            .iter_mut()
            .find(|queued| queued.key == Some(key))
        {
            existing.chunk = chunk;
            return;
        }
        if self.midi_out.is_full() {
            // nothing coalescable to evict and no note events in a purely continuous-controller
            // burst; drop the oldest coalescable entry if one exists, else drop this update.
            if let Some(pos) = self.midi_out.iter().position(|q| q.key.is_some()) {
                self.midi_out.remove(pos);
            } else {
                return;
            }
        }
        let _ = self.midi_out.push(QueuedMidi {
            key: Some(key),
            chunk,
        });
    }

    fn enqueue_priority(&mut self, chunk: Chunk) {
        if self.midi_out.is_full() {
            if let Some(pos) = self.midi_out.iter().position(|q| q.key.is_some()) {
                self.midi_out.remove(pos);
            } else {
                // every slot holds an undelivered note event; nothing safe to evict.
                return;
            }
        }
        let _ = self.midi_out.push(QueuedMidi { key: None, chunk });
    }

    /// Queues an outbound ASCII line (without its trailing `\n`, which is added at send time).
    /// Drops the oldest queued line if the ASCII queue is full; ASCII replies are advisory and
    /// never block MIDI delivery.
    pub fn enqueue_ascii(&mut self, line: &str) {
        let mut framed: String<ASCII_LINE_CAPACITY> = String::new();
        let _ = framed.push_str(line);
        let _ = framed.push('\n');
        if self.ascii_out.is_full() {
            self.ascii_out.remove(0);
        }
        let _ = self.ascii_out.push(framed);
    }

    /// Sends up to `MAX_FRAMES_PER_TICK` frames' worth of bytes, MIDI before ASCII, stopping
    /// early if the UART would block. Resumes a partially sent frame on the next call.
    pub fn service(&mut self, uart: &mut impl Uart) {
        let mut frames_sent = 0;
        while frames_sent < MAX_FRAMES_PER_TICK {
            if self.in_flight.is_none() {
                self.in_flight = self.next_frame();
            }
            let Some(frame) = self.in_flight.as_mut() else {
                break;
            };

            let (bytes, pos): (&[u8], &mut usize) = match frame {
                InFlight::Midi(chunk, pos) => (chunk.as_slice(), pos),
                InFlight::Ascii(line, pos) => (line.as_bytes(), pos),
            };

            loop {
                if *pos >= bytes.len() {
                    break;
                }
                match uart.write(bytes[*pos]) {
                    Ok(()) => *pos += 1,
                    Err(nb::Error::WouldBlock) => return,
                    Err(nb::Error::Other(())) => return,
                }
            }

            self.in_flight = None;
            frames_sent += 1;
        }
    }

    fn next_frame(&mut self) -> Option<InFlight> {
        if !self.midi_out.is_empty() {
            let queued = self.midi_out.remove(0);
            return Some(InFlight::Midi(queued.chunk, 0));
        }
        if !self.ascii_out.is_empty() {
            let line = self.ascii_out.remove(0);
            return Some(InFlight::Ascii(line, 0));
        }
        None
    }

    /// Polls the UART for inbound bytes, classifying each as MIDI (discarded) or ASCII
    /// (accumulated into a line, queued on `\n`). Call once per tick.
    pub fn poll_rx(&mut self, uart: &mut impl Uart) {
        while let Ok(byte) = uart.read() {
            if self.classify(byte) {
                self.push_rx_byte(byte);
            }
        }
    }

    /// Returns `true` if `byte` is ASCII text, `false` if it was consumed as part of a MIDI
    /// message.
    fn classify(&mut self, byte: u8) -> bool {
        if byte >= 0xF8 {
            // system realtime: one byte, doesn't disturb an in-progress message
            return false;
        }
        if byte & 0x80 != 0 {
            self.midi_data_bytes_remaining = data_bytes_for_status(byte);
            return false;
        }
        if self.midi_data_bytes_remaining > 0 {
            self.midi_data_bytes_remaining -= 1;
            return false;
        }
        true
    }

    fn push_rx_byte(&mut self, byte: u8) {
        if byte == b'\n' {
            if !self.rx_line.is_empty() {
                if self.rx_queue.is_full() {
                    self.rx_queue.remove(0);
                }
                let mut completed = String::new();
                core::mem::swap(&mut completed, &mut self.rx_line);
                let _ = self.rx_queue.push(completed);
            }
            return;
        }
        if byte == b'\r' {
            return;
        }
        // a line longer than the buffer is truncated rather than panicking or blocking
        let _ = self.rx_line.push(byte as char);
    }

    /// Takes the oldest complete inbound ASCII line, if any.
    pub fn take_ascii_line(&mut self) -> Option<String<ASCII_LINE_CAPACITY>> {
        if self.rx_queue.is_empty() {
            None
        } else {
            Some(self.rx_queue.remove(0))
        }
    }
}

impl Default for TransportMux {
    fn default() -> Self {
        Self::new()
    }
}

fn data_bytes_for_status(status: u8) -> u8 {
    match status & 0xF0 {
        0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => 2,
        0xC0 | 0xD0 => 1,
        0xF0 => match status {
            0xF1 | 0xF3 => 1,
            0xF2 => 2,
            _ => 0,
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LoopbackUart {
        tx: Vec<u8, 256>,
        rx: Vec<u8, 256>,
    }

    impl Uart for LoopbackUart {
        fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
            self.tx.push(byte).map_err(|_| nb::Error::Other(()))
        }
        fn read(&mut self) -> nb::Result<u8, ()> {
            if self.rx.is_empty() {
                Err(nb::Error::WouldBlock)
            } else {
                Ok(self.rx.remove(0))
            }
        }
    }

    #[test]
    fn note_events_take_priority_over_queued_ascii() {
        let mut mux = TransportMux::new();
        mux.enqueue_ascii("hello");
        mux.enqueue_event(Event::NoteOn {
            key_index: 0,
            channel: 2,
            note_number: 60,
            velocity: 100,
        });

        let mut uart = LoopbackUart {
            tx: Vec::new(),
            rx: Vec::new(),
        };
        mux.service(&mut uart);
        assert_eq!(uart.tx[0], 0x91);
    }

    #[test]
    fn repeated_pressure_coalesces_to_one_frame() {
        let mut mux = TransportMux::new();
        for pressure in 0..10u8 {
            mux.enqueue_event(Event::ChannelPressure {
                channel: 2,
                pressure,
            });
        }
        assert_eq!(mux.midi_out.len(), 1);
        assert_eq!(mux.midi_out[0].chunk[1], 9);
    }

    #[test]
    fn inbound_ascii_interleaved_with_midi_is_recovered_whole() {
        let mut mux = TransportMux::new();
        let mut uart = LoopbackUart {
            tx: Vec::new(),
            rx: Vec::new(),
        };
        for byte in [0x90, 0x3C, 0x64] {
            let _ = uart.rx.push(byte);
        }
        for byte in b"hello\n" {
            let _ = uart.rx.push(*byte);
        }
        mux.poll_rx(&mut uart);
        assert_eq!(mux.take_ascii_line().as_deref(), Some("hello"));
    }
}

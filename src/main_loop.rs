//! Ties the input engines, the MPE allocator, and the shared transport into one cooperative
//! scheduler.
//!
//! Each call to `run_once` computes "has this deadline passed" with wrapping subtraction rather
//! than comparing elapsed time against a fixed sleep duration, so a late call (one tick took
//! longer than its interval) does not compound into permanent drift: the next deadline is always
//! `previous deadline + interval`, never `now + interval`.

use core::fmt::Write as _;

use heapless::spsc::Consumer;
use heapless::{String, Vec};

use crate::ascii::{self, Command};
use crate::clock::Clock;
use crate::config::{
    ASCII_LINE_CAPACITY, BARTLEBY_VERSION, COMM_TIMEOUT_MS, FIRST_MEMBER_CHANNEL,
    KEY_SCAN_INTERVAL_MS, LAST_MEMBER_CHANNEL, MANAGER_CHANNEL, MASTER_BEND_RANGE_SEMITONES,
    MAX_EVENTS_PER_TICK, MEMBER_BEND_RANGE_SEMITONES, NUM_KEYS, NUM_MEMBER_CHANNELS, NUM_POTS,
    POT_SCAN_INTERVAL_MS,
};
use crate::encoder_engine::EncoderEngine;
use crate::event::Event;
use crate::key_engine::KeyEngine;
use crate::midi_encoder::{mpe_configuration_message, pitch_bend_range_rpn};
use crate::mpe_allocator::MpeAllocator;
use crate::pot_engine::PotEngine;
use crate::sampler::{KeyDescriptor, PotDescriptor, Sampler};
use crate::transport::TransportMux;
use crate::uart::Uart;

/// Returns whether `deadline` is due at `now`, correct across a single `u32` wraparound.
fn deadline_elapsed(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) < u32::MAX / 2
}

pub struct MainLoop<S, U, C> {
    sampler: S,
    uart: U,
    clock: C,

    key_engine: KeyEngine,
    pot_engine: PotEngine,
    encoder_engine: EncoderEngine,
    allocator: MpeAllocator,
    transport: TransportMux,

    tick: u32,
    next_key_deadline: u32,
    next_pot_deadline: u32,

    announced: bool,
    last_rx_activity_ms: u32,
}

impl<S, U, C> MainLoop<S, U, C>
where
    S: Sampler,
    U: Uart,
    C: Clock,
{
    pub fn new(
        sampler: S,
        uart: U,
        clock: C,
        key_point_a: [KeyDescriptor; NUM_KEYS],
        key_point_b: [KeyDescriptor; NUM_KEYS],
        pot_descriptors: [PotDescriptor; NUM_POTS],
        pot_cc_numbers: [u8; NUM_POTS],
    ) -> Self {
        let now = clock.now_ms();
        Self {
            sampler,
            uart,
            clock,
            key_engine: KeyEngine::new(key_point_a, key_point_b),
            pot_engine: PotEngine::new(pot_descriptors, pot_cc_numbers),
            encoder_engine: EncoderEngine::new(),
            allocator: MpeAllocator::new(),
            transport: TransportMux::new(),
            tick: 0,
            next_key_deadline: now.wrapping_add(KEY_SCAN_INTERVAL_MS),
            next_pot_deadline: now.wrapping_add(POT_SCAN_INTERVAL_MS),
            announced: false,
            last_rx_activity_ms: now,
        }
    }

    pub fn key_engine(&self) -> &KeyEngine {
        &self.key_engine
    }

    /// Runs one scheduling pass: inbound ASCII, encoder deltas, any scans whose deadlines have
    /// elapsed, and outbound transport service. Call this in a tight loop; it does not block.
    pub fn run_once<const N: usize>(&mut self, encoder_deltas: &mut Consumer<i8, N>) {
        let now = self.clock.now_ms();

        self.transport.poll_rx(&mut self.uart);
        while let Some(line) = self.transport.take_ascii_line() {
            self.handle_ascii_line(&line);
            self.last_rx_activity_ms = now;
        }

        self.encoder_engine.process(encoder_deltas);

        if !self.announced {
            self.announce();
            self.announced = true;
            self.last_rx_activity_ms = now;
        } else if now.wrapping_sub(self.last_rx_activity_ms) >= COMM_TIMEOUT_MS {
            self.announce();
            self.last_rx_activity_ms = now;
        }

        if deadline_elapsed(now, self.next_key_deadline) {
            self.tick = self.tick.wrapping_add(1);
            let octave_offset = self.encoder_engine.octave_offset();
            let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
            self.key_engine.scan(
                &mut self.sampler,
                &mut self.allocator,
                octave_offset,
                self.tick,
                now,
                &mut events,
            );
            for event in events {
                self.transport.enqueue_event(event);
            }
            self.next_key_deadline = self.next_key_deadline.wrapping_add(KEY_SCAN_INTERVAL_MS);
        }

        if deadline_elapsed(now, self.next_pot_deadline) {
            let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
            self.pot_engine.scan(&mut self.sampler, &mut events);
            for event in events {
                self.transport.enqueue_event(event);
            }
            self.next_pot_deadline = self.next_pot_deadline.wrapping_add(POT_SCAN_INTERVAL_MS);
        }

        self.transport.service(&mut self.uart);
    }

    fn handle_ascii_line(&mut self, line: &str) {
        match ascii::parse(line) {
            Ok(Command::Hello) => self.announce(),
            Ok(Command::Reset) => {
                let mut events: Vec<Event, NUM_KEYS> = Vec::new();
                self.key_engine.reset_all(&mut self.allocator, &mut events);
                for event in events {
                    self.transport.enqueue_event(event);
                }
                self.announce();
            }
            Ok(Command::Ping) => self.transport.enqueue_ascii("pong"),
            Ok(Command::Version) => {
                let mut reply: String<ASCII_LINE_CAPACITY> = String::new();
                let _ = write!(reply, "v {}", BARTLEBY_VERSION);
                self.transport.enqueue_ascii(&reply);
            }
            Ok(Command::SetCc {
                pot_index,
                cc_number,
            }) => self
                .pot_engine
                .set_cc_number(pot_index as usize, cc_number),
            Err(err) => {
                let mut reply: String<ASCII_LINE_CAPACITY> = String::new();
                let _ = write!(reply, "err {}", err.echo);
                self.transport.enqueue_ascii(&reply);
            }
        }
    }

    /// Emits the ASCII handshake line and the full MPE configuration / pitch-bend-range RPN
    /// bundle for the manager channel and every member channel. This is both the reply to an
    /// inbound `hello` and the unsolicited announcement sent at boot and after `COMM_TIMEOUT_MS`
    /// of inbound silence, so a host that connects late still converges on the same line.
    fn announce(&mut self) {
        let mut greeting: String<ASCII_LINE_CAPACITY> = String::new();
        let _ = write!(greeting, "bartleby v{}", BARTLEBY_VERSION);
        self.transport.enqueue_ascii(&greeting);

        for chunk in mpe_configuration_message(MANAGER_CHANNEL, NUM_MEMBER_CHANNELS as u8) {
            self.transport.enqueue_raw_midi(chunk);
        }
        for chunk in pitch_bend_range_rpn(MANAGER_CHANNEL, MASTER_BEND_RANGE_SEMITONES) {
            self.transport.enqueue_raw_midi(chunk);
        }
        for channel in FIRST_MEMBER_CHANNEL..=LAST_MEMBER_CHANNEL {
            for chunk in pitch_bend_range_rpn(channel, MEMBER_BEND_RANGE_SEMITONES) {
                self.transport.enqueue_raw_midi(chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::KeyPoint;
    use heapless::spsc::Queue;

    struct SilentSampler;
    impl Sampler for SilentSampler {
        fn read_channel(&mut self, _mux_id: u8, _channel: u8) -> u16 {
            0
        }
    }

    struct NullUart;
    impl Uart for NullUart {
        fn write(&mut self, _byte: u8) -> nb::Result<(), ()> {
            Ok(())
        }
        fn read(&mut self) -> nb::Result<u8, ()> {
            Err(nb::Error::WouldBlock)
        }
    }

    struct SteppedClock {
        now: u32,
    }
    impl Clock for SteppedClock {
        fn now_ms(&self) -> u32 {
            self.now
        }
    }

    fn key_descriptors() -> ([KeyDescriptor; NUM_KEYS], [KeyDescriptor; NUM_KEYS]) {
        let mut a = [KeyDescriptor {
            mux_id: 0,
            channel: 0,
            point: KeyPoint::A,
        }; NUM_KEYS];
        let mut b = a;
        for i in 0..NUM_KEYS {
            a[i].channel = i as u8;
            b[i] = KeyDescriptor {
                mux_id: 0,
                channel: i as u8,
                point: KeyPoint::B,
            };
        }
        (a, b)
    }

    fn pot_descriptors() -> [PotDescriptor; NUM_POTS] {
        let mut d = [PotDescriptor {
            mux_id: 1,
            channel: 0,
        }; NUM_POTS];
        for (i, desc) in d.iter_mut().enumerate() {
            desc.channel = i as u8;
        }
        d
    }

    #[test]
    fn first_run_once_announces_itself() {
        let (a, b) = key_descriptors();
        let mut main_loop = MainLoop::new(
            SilentSampler,
            NullUart,
            SteppedClock { now: 0 },
            a,
            b,
            pot_descriptors(),
            [20; NUM_POTS],
        );
        let mut queue: Queue<i8, 2> = Queue::new();
        let (_producer, mut consumer) = queue.split();

        main_loop.run_once(&mut consumer);
        assert!(main_loop.announced);
    }
}

//! Scans the keybed: dual-phase pressure detection, velocity derivation, channel allocation, and
//! live pressure (aftertouch) tracking.
//!
//! A key's two pressure points are crossed in opposite order on press and release: point A (the
//! shallow rest-break) engages first going down and disengages last coming up; point B (the deep
//! bottom-out) engages second going down and disengages first coming up. The phase machine below
//! follows that mechanical ordering: `Idle -> Rising` on A engaging, `Rising -> Held` on B
//! engaging (latching velocity), `Held -> Releasing` on B disengaging, `Releasing -> Idle` on A
//! disengaging (emitting the note-off). `Rising -> Idle` covers an aborted press that never
//! reaches point B. A key that re-engages point B while still `Releasing` is not specially
//! handled: it simply continues toward `Idle`, matching the six-row state table exactly; a full
//! release is required before the next press starts a new `Rising` phase.
//!
//! Within one scan, note-offs are collected before note-ons, which are collected before pressure
//! updates, so a channel freed this tick is available for a note-on this same tick and nothing
//! downstream ever sees a pressure update for a channel that has not yet been assigned. A steal
//! forces the evicted key's own phase to `Idle` immediately rather than waiting for its own
//! release to be sampled, since its channel has already been handed to someone else.

use heapless::Vec;

use crate::config::{
    BASE_NOTE_NUMBER, DEBOUNCE_SCANS, MAX_EVENTS_PER_TICK, MAX_NOTE_ON_EVENTS_PER_SCAN, NUM_KEYS,
    PRESSURE_DEADBAND, TH_OFF, TH_ON, VELOCITY_CEILING_DEFAULT, VELOCITY_CEILING_MS, VELOCITY_K,
};
use crate::event::Event;
use crate::key::{Key, KeyPhase};
use crate::mpe_allocator::MpeAllocator;
use crate::sampler::{KeyDescriptor, Sampler};

/// Owns every key's state and the multiplexer wiring needed to read its two pressure points.
pub struct KeyEngine {
    keys: [Key; NUM_KEYS],
    point_a: [KeyDescriptor; NUM_KEYS],
    point_b: [KeyDescriptor; NUM_KEYS],
}

impl KeyEngine {
    pub fn new(point_a: [KeyDescriptor; NUM_KEYS], point_b: [KeyDescriptor; NUM_KEYS]) -> Self {
        Self {
            keys: [Key::new(); NUM_KEYS],
            point_a,
            point_b,
        }
    }

    pub fn key(&self, index: usize) -> &Key {
        &self.keys[index]
    }

    /// Forces every key that is Held, Rising, or Releasing back to Idle, releasing its channel
    /// and emitting a Note-Off for any key that had actually sounded. Used by the ASCII `reset`
    /// command, which must leave no note stuck on.
    pub fn reset_all(&mut self, allocator: &mut MpeAllocator, events: &mut Vec<Event, NUM_KEYS>) {
        for i in 0..NUM_KEYS {
            let key = &mut self.keys[i];
            if key.phase == KeyPhase::Held || key.phase == KeyPhase::Releasing {
                if let Some(channel) = key.assigned_channel {
                    let _ = events.push(Event::NoteOff {
                        key_index: i as u8,
                        channel,
                        note_number: key.note_number,
                    });
                    allocator.release(channel);
                }
            }
            key.phase = KeyPhase::Idle;
            key.assigned_channel = None;
            key.debounce = 0;
            key.last_emitted_pressure = None;
        }
    }

    /// Samples every key's two pressure points, advances its phase machine, and appends the
    /// resulting events: all note-offs, then all note-ons, then all pressure updates.
    pub fn scan(
        &mut self,
        sampler: &mut impl Sampler,
        allocator: &mut MpeAllocator,
        octave_offset: i8,
        tick: u32,
        now_ms: u32,
        events: &mut Vec<Event, MAX_EVENTS_PER_TICK>,
    ) {
        let mut note_offs: Vec<Event, NUM_KEYS> = Vec::new();
        // worst case: every key transitions Rising -> Held in the same scan, each contributing
        // two channel-reset messages plus its own NoteOn.
        let mut note_ons: Vec<Event, MAX_NOTE_ON_EVENTS_PER_SCAN> = Vec::new();
        let mut pressures: Vec<Event, NUM_KEYS> = Vec::new();

        for i in 0..NUM_KEYS {
            self.keys[i].sample_a = sampler.read_key(self.point_a[i]);
            self.keys[i].sample_b = sampler.read_key(self.point_b[i]);

            self.step_key(
                i as u8,
                allocator,
                octave_offset,
                tick,
                now_ms,
                &mut note_offs,
                &mut note_ons,
                &mut pressures,
            );
        }

        for event in note_offs {
            let _ = events.push(event);
        }
        for event in note_ons {
            let _ = events.push(event);
        }
        for event in pressures {
            let _ = events.push(event);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_key(
        &mut self,
        key_index: u8,
        allocator: &mut MpeAllocator,
        octave_offset: i8,
        tick: u32,
        now_ms: u32,
        note_offs: &mut Vec<Event, NUM_KEYS>,
        note_ons: &mut Vec<Event, MAX_NOTE_ON_EVENTS_PER_SCAN>,
        pressures: &mut Vec<Event, NUM_KEYS>,
    ) {
        let phase = self.keys[key_index as usize].phase;
        match phase {
            KeyPhase::Idle => {
                let key = &mut self.keys[key_index as usize];
                let condition = key.sample_a >= TH_ON;
                if debounced(key, condition) {
                    key.phase = KeyPhase::Rising;
                    key.t_rising_start = now_ms;
                    key.debounce = 0;
                }
            }
            KeyPhase::Rising => {
                let condition = self.keys[key_index as usize].sample_b >= TH_ON;
                let crossed_b = debounced(&mut self.keys[key_index as usize], condition);
                if crossed_b {
                    let key = &mut self.keys[key_index as usize];
                    let dt_ms = now_ms.wrapping_sub(key.t_rising_start) as f32;
                    key.velocity = velocity_from_dt(dt_ms);
                    key.note_number = note_number_for(key_index, octave_offset);

                    let result = allocator.allocate(key_index, tick);
                    if let Some(evicted_index) = result.evicted_key_index {
                        let evicted = &mut self.keys[evicted_index as usize];
                        let _ = note_offs.push(Event::NoteOff {
                            key_index: evicted_index,
                            channel: result.channel,
                            note_number: evicted.note_number,
                        });
                        evicted.assigned_channel = None;
                        evicted.phase = KeyPhase::Idle;
                        evicted.debounce = 0;
                    }
                    for reset_event in allocator.reset_messages(result.channel) {
                        let _ = note_ons.push(reset_event);
                    }

                    let key = &mut self.keys[key_index as usize];
                    key.assigned_channel = Some(result.channel);
                    key.last_emitted_pressure = None;
                    key.phase = KeyPhase::Held;
                    key.debounce = 0;

                    let _ = note_ons.push(Event::NoteOn {
                        key_index,
                        channel: result.channel,
                        note_number: key.note_number,
                        velocity: key.velocity,
                    });
                } else {
                    let key = &mut self.keys[key_index as usize];
                    let condition = key.sample_a < TH_OFF;
                    if debounced(key, condition) {
                        key.phase = KeyPhase::Idle;
                        key.debounce = 0;
                    }
                }
            }
            KeyPhase::Held => {
                let key = &mut self.keys[key_index as usize];
                let pressure = pressure_from_sample(key.sample_b);
                let moved_enough = match key.last_emitted_pressure {
                    None => true,
                    Some(last) => last.abs_diff(pressure) >= PRESSURE_DEADBAND,
                };
                if moved_enough {
                    if let Some(channel) = key.assigned_channel {
                        key.last_emitted_pressure = Some(pressure);
                        key.pressure = pressure;
                        allocator.set_pressure(channel, pressure);
                        let _ = pressures.push(Event::ChannelPressure { channel, pressure });
                    }
                }

                let key = &mut self.keys[key_index as usize];
                let condition = key.sample_b < TH_OFF;
                if debounced(key, condition) {
                    key.phase = KeyPhase::Releasing;
                    key.debounce = 0;
                }
            }
            KeyPhase::Releasing => {
                let key = &mut self.keys[key_index as usize];
                let condition = key.sample_a < TH_OFF;
                if debounced(key, condition) {
                    if let Some(channel) = key.assigned_channel {
                        let note_number = key.note_number;
                        let _ = note_offs.push(Event::NoteOff {
                            key_index,
                            channel,
                            note_number,
                        });
                        allocator.release(channel);
                    }
                    key.assigned_channel = None;
                    key.phase = KeyPhase::Idle;
                    key.debounce = 0;
                }
            }
        }
    }
}

/// Tracks agreement of `condition` across consecutive scans, firing once it has held for
/// `DEBOUNCE_SCANS` scans in a row. Resets whenever the condition does not hold.
fn debounced(key: &mut Key, condition: bool) -> bool {
    if !condition {
        key.debounce = 0;
        return false;
    }
    key.debounce = key.debounce.saturating_add(1);
    key.debounce >= DEBOUNCE_SCANS
}

fn velocity_from_dt(dt_ms: f32) -> u8 {
    if dt_ms >= VELOCITY_CEILING_MS || dt_ms <= 0.0 {
        return VELOCITY_CEILING_DEFAULT;
    }
    let raw = (VELOCITY_K / dt_ms).round();
    raw.clamp(1.0, 127.0) as u8
}

fn note_number_for(key_index: u8, octave_offset: i8) -> u8 {
    let note = BASE_NOTE_NUMBER + key_index as i16 + octave_offset as i16 * 12;
    note.clamp(0, 127) as u8
}

fn pressure_from_sample(sample_b: u16) -> u8 {
    let span = crate::config::ADC_MAX.saturating_sub(TH_ON).max(1);
    let above = sample_b.saturating_sub(TH_ON);
    ((above as u32 * 127 / span as u32).min(127)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{KeyPoint, PotDescriptor};

    struct ScriptedSampler {
        a: u16,
        b: u16,
    }

    impl Sampler for ScriptedSampler {
        fn read_channel(&mut self, _mux_id: u8, _channel: u8) -> u16 {
            0
        }
        fn read_key(&mut self, descriptor: KeyDescriptor) -> u16 {
            match descriptor.point {
                KeyPoint::A => self.a,
                KeyPoint::B => self.b,
            }
        }
        fn read_pot(&mut self, _descriptor: PotDescriptor) -> u16 {
            0
        }
    }

    fn descriptors() -> ([KeyDescriptor; NUM_KEYS], [KeyDescriptor; NUM_KEYS]) {
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

    #[test]
    fn full_press_produces_note_on_then_release_produces_note_off() {
        let (a, b) = descriptors();
        let mut engine = KeyEngine::new(a, b);
        let mut allocator = MpeAllocator::new();
        let mut sampler = ScriptedSampler { a: 0, b: 0 };
        let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
        let mut now = 0u32;

        sampler.a = 4095;
        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }
        assert_eq!(engine.key(0).phase, KeyPhase::Rising);

        now += 40;
        sampler.b = 4095;
        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::NoteOn { key_index: 0, .. })));
        assert_eq!(engine.key(0).phase, KeyPhase::Held);

        sampler.b = 0;
        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }
        assert_eq!(engine.key(0).phase, KeyPhase::Releasing);

        sampler.a = 0;
        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::NoteOff { key_index: 0, .. })));
        assert_eq!(engine.key(0).phase, KeyPhase::Idle);
    }

    #[test]
    fn fast_press_yields_higher_velocity_than_slow_press() {
        assert!(velocity_from_dt(5.0) > velocity_from_dt(200.0));
    }

    #[test]
    fn slow_press_uses_ceiling_default() {
        assert_eq!(
            velocity_from_dt(VELOCITY_CEILING_MS + 1.0),
            VELOCITY_CEILING_DEFAULT
        );
    }

    #[test]
    fn reset_all_emits_note_off_for_every_held_key_and_frees_its_channel() {
        let (a, b) = descriptors();
        let mut engine = KeyEngine::new(a, b);
        let mut allocator = MpeAllocator::new();
        let mut sampler = ScriptedSampler { a: 4095, b: 4095 };
        let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
        let mut now = 0u32;

        for _ in 0..(DEBOUNCE_SCANS * 2 + 1) {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }
        assert_eq!(engine.key(0).phase, KeyPhase::Held);
        let channel = engine.key(0).assigned_channel.expect("key 0 should be held");

        let mut reset_events: Vec<Event, NUM_KEYS> = Vec::new();
        engine.reset_all(&mut allocator, &mut reset_events);

        assert!(reset_events.iter().any(
            |e| matches!(e, Event::NoteOff { key_index: 0, channel: c, .. } if *c == channel)
        ));
        assert_eq!(engine.key(0).phase, KeyPhase::Idle);
        assert_eq!(engine.key(0).assigned_channel, None);

        // the freed channel must be immediately reusable
        let mut sampler2 = ScriptedSampler { a: 4095, b: 4095 };
        let mut events2: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
        for _ in 0..(DEBOUNCE_SCANS * 2 + 1) {
            now += 1;
            events2.clear();
            engine.scan(&mut sampler2, &mut allocator, 0, now, now, &mut events2);
        }
        assert_eq!(engine.key(0).phase, KeyPhase::Held);
    }

    #[test]
    fn simultaneous_chord_strike_drops_no_note_on_events() {
        // all 25 keys cross point A together, then point B together: a worst-case scan where
        // every key transitions Rising -> Held in the same tick and each contributes two
        // channel-reset messages plus its own NoteOn into the same scratch buffer.
        let (a, b) = descriptors();
        let mut engine = KeyEngine::new(a, b);
        let mut allocator = MpeAllocator::new();
        let mut sampler = ScriptedSampler { a: 4095, b: 0 };
        let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();
        let mut now = 0u32;

        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }

        sampler.b = 4095;
        for _ in 0..DEBOUNCE_SCANS {
            now += 1;
            events.clear();
            engine.scan(&mut sampler, &mut allocator, 0, now, now, &mut events);
        }

        let note_on_count = events
            .iter()
            .filter(|e| matches!(e, Event::NoteOn { .. }))
            .count();
        assert_eq!(note_on_count, NUM_KEYS);
        for i in 0..NUM_KEYS as u8 {
            assert!(events
                .iter()
                .any(|e| matches!(e, Event::NoteOn { key_index, .. } if *key_index == i)));
        }
    }
}

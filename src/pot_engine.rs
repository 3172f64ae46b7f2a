//! Scans the pot bank: exponential smoothing, 7-bit quantization, dead-band and debounce
//! suppression, CC emission on the manager channel.

use heapless::Vec;

use crate::config::{
    DEBOUNCE_SCANS, MANAGER_CHANNEL, MAX_EVENTS_PER_TICK, NUM_POTS, POT_DEADBAND, POT_EMA_ALPHA,
};
use crate::event::Event;
use crate::pot::Pot;
use crate::sampler::{PotDescriptor, Sampler};

/// Owns every pot's filter state and the multiplexer wiring needed to read it.
pub struct PotEngine {
    pots: [Pot; NUM_POTS],
    descriptors: [PotDescriptor; NUM_POTS],
}

impl PotEngine {
    pub fn new(descriptors: [PotDescriptor; NUM_POTS], cc_numbers: [u8; NUM_POTS]) -> Self {
        let mut pots = [Pot::new(0); NUM_POTS];
        for i in 0..NUM_POTS {
            pots[i] = Pot::new(cc_numbers[i]);
        }
        Self { pots, descriptors }
    }

    /// Remaps pot `index`'s CC number. Out-of-range indices are ignored.
    pub fn set_cc_number(&mut self, index: usize, cc_number: u8) {
        if let Some(pot) = self.pots.get_mut(index) {
            pot.cc_number = cc_number;
        }
    }

    /// Samples every pot once, advances its EMA filter, and appends a `ControlChange` event for
    /// each pot whose debounced value has moved by at least the dead-band since it last emitted.
    pub fn scan(
        &mut self,
        sampler: &mut impl Sampler,
        events: &mut Vec<Event, MAX_EVENTS_PER_TICK>,
    ) {
        for i in 0..NUM_POTS {
            let raw = sampler.read_pot(self.descriptors[i]);
            let pot = &mut self.pots[i];

            pot.smoothed += POT_EMA_ALPHA * (raw as f32 - pot.smoothed);
            let quantized = to_seven_bit(pot.smoothed);

            if quantized == pot.pending_value {
                if pot.debounce < DEBOUNCE_SCANS {
                    pot.debounce += 1;
                }
            } else {
                pot.pending_value = quantized;
                pot.debounce = 1;
            }

            if pot.debounce < DEBOUNCE_SCANS {
                continue;
            }

            let moved_enough = match pot.last_emitted {
                None => true,
                Some(last) => last.abs_diff(quantized) >= POT_DEADBAND,
            };
            if !moved_enough {
                continue;
            }

            pot.last_emitted = Some(quantized);
            let _ = events.push(Event::ControlChange {
                channel: MANAGER_CHANNEL,
                cc_number: pot.cc_number,
                value: quantized,
            });
        }
    }
}

/// Maps a raw ADC reading (0..=4095 nominal) to a 7-bit MIDI value, clamped against the actual
/// full-scale range rather than hardcoding it, so a board with a narrower ADC still saturates
/// correctly at both ends.
fn to_seven_bit(smoothed: f32) -> u8 {
    let clamped = smoothed.clamp(0.0, crate::config::ADC_MAX as f32);
    ((clamped / crate::config::ADC_MAX as f32) * 127.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSampler {
        value: u16,
    }

    impl Sampler for FixedSampler {
        fn read_channel(&mut self, _mux_id: u8, _channel: u8) -> u16 {
            self.value
        }
    }

    fn descriptors() -> [PotDescriptor; NUM_POTS] {
        let mut d = [PotDescriptor {
            mux_id: 0,
            channel: 0,
        }; NUM_POTS];
        for (i, desc) in d.iter_mut().enumerate() {
            desc.channel = i as u8;
        }
        d
    }

    #[test]
    fn settles_and_emits_once_past_deadband_and_debounce() {
        let mut engine = PotEngine::new(descriptors(), [20; NUM_POTS]);
        let mut sampler = FixedSampler { value: 4095 };
        let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();

        for _ in 0..50 {
            events.clear();
            engine.scan(&mut sampler, &mut events);
        }

        assert!(events.iter().any(|e| matches!(
            e,
            Event::ControlChange {
                channel: MANAGER_CHANNEL,
                cc_number: 20,
                value: 127,
            }
        )));
    }

    #[test]
    fn small_jitter_does_not_re_emit() {
        let mut engine = PotEngine::new(descriptors(), [20; NUM_POTS]);
        let mut sampler = FixedSampler { value: 2048 };
        let mut events: Vec<Event, MAX_EVENTS_PER_TICK> = Vec::new();

        for _ in 0..20 {
            events.clear();
            engine.scan(&mut sampler, &mut events);
        }
        assert!(!events.is_empty());

        sampler.value = 2049;
        events.clear();
        engine.scan(&mut sampler, &mut events);
        assert!(events.is_empty());
    }
}

//! Assigns member channels to keys, stealing the oldest assignment when the zone is full.
//!
//! Exhaustion is not an error: a full zone degrades gracefully by reclaiming the longest-held
//! channel rather than refusing the new note, so the caller never has to handle an allocation
//! failure.

use heapless::Deque;

use crate::config::{NUM_MEMBER_CHANNELS, PITCH_BEND_CENTRE};
use crate::event::Event;
use crate::mpe_zone::MpeZone;

/// The outcome of assigning a channel to a key. `evicted_key_index` is set when the zone was full
/// and an existing note had to be cut off; the caller is responsible for emitting that key's
/// `NoteOff` (it alone knows the evicted key's note number) before consuming `MpeAllocator`'s own
/// reset messages for the reused channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationResult {
    pub channel: u8,
    pub evicted_key_index: Option<u8>,
}

pub struct MpeAllocator {
    zone: MpeZone,
    /// Round-robin free list: a channel is taken from the front and returned to the back, so the
    /// least-recently-freed channel is always handed out first.
    free: Deque<u8, NUM_MEMBER_CHANNELS>,
}

impl MpeAllocator {
    pub fn new() -> Self {
        let zone = MpeZone::new();
        let mut free = Deque::new();
        for member in zone.members.iter() {
            // capacity matches NUM_MEMBER_CHANNELS so this never fails
            let _ = free.push_back(member.channel);
        }
        Self { zone, free }
    }

    pub fn zone(&self) -> &MpeZone {
        &self.zone
    }

    /// Assigns a channel to `key_index`, preferring a free channel and otherwise stealing the
    /// member channel that has been assigned the longest.
    pub fn allocate(&mut self, key_index: u8, tick: u32) -> AllocationResult {
        if let Some(channel) = self.free.pop_front() {
            let idx = self
                .zone
                .member_index(channel)
                .expect("free list only ever holds real member channels");
            let member = &mut self.zone.members[idx];
            member.occupant = Some(key_index);
            member.assigned_at_tick = tick;
            member.pitch_bend = PITCH_BEND_CENTRE;
            member.pressure = 0;
            member.timbre = crate::config::DEFAULT_TIMBRE;
            return AllocationResult {
                channel,
                evicted_key_index: None,
            };
        }

        let oldest_idx = self
            .zone
            .members
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.assigned_at_tick)
            .map(|(i, _)| i)
            .expect("NUM_MEMBER_CHANNELS is nonzero");

        let member = &mut self.zone.members[oldest_idx];
        let evicted_key_index = member.occupant;
        member.occupant = Some(key_index);
        member.assigned_at_tick = tick;
        member.pitch_bend = PITCH_BEND_CENTRE;
        member.pressure = 0;
        member.timbre = crate::config::DEFAULT_TIMBRE;

        AllocationResult {
            channel: member.channel,
            evicted_key_index,
        }
    }

    /// Frees `channel` back to the pool. Idempotent: releasing an already-free channel is a
    /// no-op.
    pub fn release(&mut self, channel: u8) {
        if let Some(idx) = self.zone.member_index(channel) {
            if self.zone.members[idx].occupant.take().is_some() {
                // capacity matches NUM_MEMBER_CHANNELS so this never fails
                let _ = self.free.push_back(channel);
            }
        }
    }

    /// The pitch-bend-centre and timbre-default messages a freshly (re)assigned channel emits
    /// before its `NoteOn`.
    pub fn reset_messages(&self, channel: u8) -> [Event; 2] {
        [
            Event::PitchBend {
                channel,
                value: PITCH_BEND_CENTRE,
            },
            Event::ControlChange {
                channel,
                cc_number: 74,
                value: crate::config::DEFAULT_TIMBRE,
            },
        ]
    }

    /// Updates the live pressure value tracked for `channel`, used so a later steal knows what
    /// state it is displacing. Does not by itself decide whether to emit a message.
    pub fn set_pressure(&mut self, channel: u8, pressure: u8) {
        if let Some(idx) = self.zone.member_index(channel) {
            self.zone.members[idx].pressure = pressure;
        }
    }
}

impl Default for MpeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NUM_MEMBER_CHANNELS as N;
    use heapless::Vec;

    #[test]
    fn allocates_distinct_channels_until_exhausted() {
        let mut allocator = MpeAllocator::new();
        let mut seen: Vec<u8, N> = Vec::new();
        for key in 0..N as u8 {
            let result = allocator.allocate(key, key as u32);
            assert!(result.evicted_key_index.is_none());
            assert!(!seen.contains(&result.channel));
            let _ = seen.push(result.channel);
        }
    }

    #[test]
    fn full_zone_steals_oldest_assignment() {
        let mut allocator = MpeAllocator::new();
        for key in 0..N as u8 {
            allocator.allocate(key, key as u32);
        }
        // zone now full with keys 0..N assigned in tick order, key 0 is oldest
        let result = allocator.allocate(99, 1_000);
        assert_eq!(result.evicted_key_index, Some(0));
    }

    #[test]
    fn release_then_allocate_reuses_freed_channel() {
        let mut allocator = MpeAllocator::new();
        let first = allocator.allocate(0, 0);
        allocator.release(first.channel);
        let second = allocator.allocate(1, 1);
        assert_eq!(second.channel, first.channel);
        assert!(second.evicted_key_index.is_none());
    }

    #[test]
    fn free_list_is_round_robin_so_first_allocation_is_the_first_member_channel() {
        let mut allocator = MpeAllocator::new();
        let result = allocator.allocate(0, 0);
        assert_eq!(result.channel, crate::config::FIRST_MEMBER_CHANNEL);
    }

    #[test]
    fn released_channel_goes_to_the_back_of_the_queue_not_the_front() {
        let mut allocator = MpeAllocator::new();
        let first = allocator.allocate(0, 0);
        let second = allocator.allocate(1, 1);
        allocator.release(first.channel);
        // the channel freed by key 0 must not jump the queue ahead of channels never yet handed
        // out; the next allocation should still take the next untouched channel in order.
        let third = allocator.allocate(2, 2);
        assert_ne!(third.channel, first.channel);
        assert_ne!(third.channel, second.channel);
    }
}

//! The MPE lower zone's per-channel state.
//!
//! This is pure data: every mutation is driven by `MpeAllocator`, which is the only thing that
//! decides when a channel changes owner.

use crate::config::{
    DEFAULT_TIMBRE, FIRST_MEMBER_CHANNEL, MANAGER_CHANNEL, MASTER_BEND_RANGE_SEMITONES,
    MEMBER_BEND_RANGE_SEMITONES, NUM_MEMBER_CHANNELS, PITCH_BEND_CENTRE,
};

/// One member channel's last-known state, tracked so the allocator can reset it cleanly when
/// reassigning the channel to a new key.
#[derive(Debug, Clone, Copy)]
pub struct MemberChannel {
    pub channel: u8,
    /// Key index currently sounding on this channel, or `None` if free.
    pub occupant: Option<u8>,
    pub pitch_bend: u16,
    pub pressure: u8,
    pub timbre: u8,
    /// Scheduler tick at which this channel was last assigned, used as the steal-oldest
    /// tiebreaker.
    pub assigned_at_tick: u32,
}

impl MemberChannel {
    const fn new(channel: u8) -> Self {
        Self {
            channel,
            occupant: None,
            pitch_bend: PITCH_BEND_CENTRE,
            pressure: 0,
            timbre: DEFAULT_TIMBRE,
            assigned_at_tick: 0,
        }
    }
}

/// The MPE lower zone: one manager channel plus `NUM_MEMBER_CHANNELS` member channels, each
/// individually pitch-bendable and channel-pressure-able.
pub struct MpeZone {
    pub manager_channel: u8,
    pub member_bend_range_semitones: u8,
    pub master_bend_range_semitones: u8,
    pub members: [MemberChannel; NUM_MEMBER_CHANNELS],
}

impl MpeZone {
    pub fn new() -> Self {
        let mut members = [MemberChannel::new(FIRST_MEMBER_CHANNEL); NUM_MEMBER_CHANNELS];
        for (i, member) in members.iter_mut().enumerate() {
            member.channel = FIRST_MEMBER_CHANNEL + i as u8;
        }
        Self {
            manager_channel: MANAGER_CHANNEL,
            member_bend_range_semitones: MEMBER_BEND_RANGE_SEMITONES,
            master_bend_range_semitones: MASTER_BEND_RANGE_SEMITONES,
            members,
        }
    }

    pub fn member_index(&self, channel: u8) -> Option<usize> {
        self.members.iter().position(|m| m.channel == channel)
    }
}

impl Default for MpeZone {
    fn default() -> Self {
        Self::new()
    }
}

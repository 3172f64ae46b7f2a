//! The analog sampling boundary.
//!
//! The ADC driver and multiplexer select lines are out of scope for this crate; all the engines
//! need is a synchronous read of the latest reading for a named channel. A board-support crate
//! implements this trait over its own multiplexer tree and is responsible for the settling delay
//! between selecting a multiplexer channel and reading it.

/// One of the two pressure points on a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPoint {
    /// The rest-break position, crossed first on a press.
    A,
    /// The bottom-out position, crossed second on a press.
    B,
}

/// Names a single analog input: which multiplexer, which channel on it, and (for keys) which of
/// the two pressure points is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub mux_id: u8,
    pub channel: u8,
    pub point: KeyPoint,
}

/// Names a single pot input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotDescriptor {
    pub mux_id: u8,
    pub channel: u8,
}

/// Synchronous analog sampling contract. `read_channel` returns the latest 10-12 bit ADC reading
/// for the given multiplexer/channel pair.
pub trait Sampler {
    fn read_channel(&mut self, mux_id: u8, channel: u8) -> u16;

    /// Convenience wrapper reading a `KeyDescriptor`.
    fn read_key(&mut self, descriptor: KeyDescriptor) -> u16 {
        self.read_channel(descriptor.mux_id, descriptor.channel)
    }

    /// Convenience wrapper reading a `PotDescriptor`.
    fn read_pot(&mut self, descriptor: PotDescriptor) -> u16 {
        self.read_channel(descriptor.mux_id, descriptor.channel)
    }
}

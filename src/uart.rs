//! The serial transport boundary.
//!
//! The UART peripheral itself is out of scope for this crate; `TransportMux` only needs a
//! non-blocking byte-at-a-time read/write contract, in the style of `embedded-hal`'s serial
//! traits.

/// Non-blocking single-byte serial I/O.
pub trait Uart {
    /// Write one byte. Returns `nb::Error::WouldBlock` if the hardware TX buffer is full.
    fn write(&mut self, byte: u8) -> nb::Result<(), ()>;

    /// Read one byte. Returns `nb::Error::WouldBlock` if no byte is available.
    fn read(&mut self) -> nb::Result<u8, ()>;
}

//! Error types surfaced by the engines.
//!
//! Most failure kinds here (sampling glitches, allocator exhaustion, transport backpressure,
//! clock overrun) are handled entirely by policy inside the component that owns them and never
//! become a `Result::Err` at all. The one kind that genuinely needs to report outward to a caller
//! is a malformed inbound ASCII line.

use heapless::String;

use crate::config::ASCII_LINE_CAPACITY;

/// An inbound ASCII control line failed to parse.
///
/// Carries the offending line so the caller can echo it back in an `err <echo>` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiParseError {
    pub echo: String<ASCII_LINE_CAPACITY>,
}

impl AsciiParseError {
    pub fn new(line: &str) -> Self {
        let mut echo = String::new();
        // best-effort copy; a line longer than the buffer is truncated rather than panicking
        let _ = echo.push_str(line);
        Self { echo }
    }
}

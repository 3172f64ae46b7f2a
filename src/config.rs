//! Tunable constants for the realtime engines.
//!
//! The exact ADC range, threshold values, and velocity curve coefficient are hardware-dependent.
//! The values below are plausible defaults for a 12-bit ADC; a board-support crate that has
//! measured its own keybed should treat these as a starting point, not gospel.

/// Number of keys on the keybed.
pub const NUM_KEYS: usize = 25;

/// Number of continuous-controller pots.
pub const NUM_POTS: usize = 14;

/// Full-scale ADC reading. 12-bit ADC assumed; a 10-bit board should rescale at the `Sampler`.
pub const ADC_MAX: u16 = 4095;

/// Rising-edge threshold, roughly 10% of full scale, with hysteresis against `TH_OFF`.
pub const TH_ON: u16 = (ADC_MAX as u32 * 10 / 100) as u16;

/// Falling-edge threshold, roughly 5% of full scale.
pub const TH_OFF: u16 = (ADC_MAX as u32 * 5 / 100) as u16;

/// Number of consecutive scans a threshold-crossing condition must hold before a key or pot acts
/// on it. Filters single-sample ADC glitches per the two-sample agreement rule.
pub const DEBOUNCE_SCANS: u8 = 2;

/// Coefficient in the velocity curve `v = clamp(round(K / dt_ms), 1, 127)`.
///
/// Calibration by measurement against real hardware is assumed. This default makes a ~47ms
/// rising interval land near maximum velocity.
pub const VELOCITY_K: f32 = 6_000.0;

/// If the rising-to-held interval exceeds this, velocity defaults to `VELOCITY_CEILING_DEFAULT`
/// rather than the (very low) value the curve would otherwise produce, so slow presses still
/// sound.
pub const VELOCITY_CEILING_MS: f32 = 500.0;

/// Velocity used for presses slower than `VELOCITY_CEILING_MS`.
pub const VELOCITY_CEILING_DEFAULT: u8 = 64;

/// Minimum change in 7-bit pressure required to emit a new ChannelPressure message.
pub const PRESSURE_DEADBAND: u8 = 2;

/// Minimum change in 7-bit CC value required to emit a new pot CC message.
pub const POT_DEADBAND: u8 = 1;

/// EMA smoothing coefficient for pot readings. Chosen so the step response settles within about
/// 50ms at the 20ms pot scan rate.
pub const POT_EMA_ALPHA: f32 = 0.5;

/// Default MIDI CC number for pot `i`, used until remapped by an ASCII `cc` command.
///
/// General-purpose controller numbers 20..33, clear of the reserved/standard CCs this crate
/// itself emits (1, 6, 7, 38, 64, 65, 74, 100, 101, 121, 123).
pub const DEFAULT_POT_CC: [u8; NUM_POTS] = [20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 12, 13];

/// Minimum octave shift.
pub const MIN_OCTAVE_OFFSET: i8 = -3;

/// Maximum octave shift.
pub const MAX_OCTAVE_OFFSET: i8 = 3;

/// Raw encoder detents needed to move the octave shift by one step.
pub const ENCODER_CLICKS_PER_STEP: i32 = 4;

/// Capacity of the SPSC queue carrying raw per-detent encoder deltas from the interrupt handler
/// to the main loop.
pub const ENCODER_QUEUE_CAPACITY: usize = 16;

/// MIDI note number for key index 0 at octave offset 0. Key index + `(octave_offset * 12)` gives
/// the final note number, clamped to the valid 7-bit MIDI note range.
pub const BASE_NOTE_NUMBER: i16 = 60; // middle C

/// The MPE manager (zone master) channel, 1-indexed as MIDI channels are conventionally written,
/// i.e. this is MIDI channel 1.
pub const MANAGER_CHANNEL: u8 = 1;

/// Number of MPE member channels (2..=16).
pub const NUM_MEMBER_CHANNELS: usize = 15;

/// First member channel number.
pub const FIRST_MEMBER_CHANNEL: u8 = 2;

/// Last member channel number.
pub const LAST_MEMBER_CHANNEL: u8 = 16;

/// Pitch-bend range declared for each member channel, in semitones.
pub const MEMBER_BEND_RANGE_SEMITONES: u8 = 48;

/// Pitch-bend range declared for the manager channel, in semitones.
pub const MASTER_BEND_RANGE_SEMITONES: u8 = 2;

/// Centre (no-bend) value of a 14-bit pitch-bend.
pub const PITCH_BEND_CENTRE: u16 = 8192;

/// Default timbre (CC 74) value a freshly (re)allocated channel starts with.
pub const DEFAULT_TIMBRE: u8 = 64;

/// Pot scan interval.
pub const POT_SCAN_INTERVAL_MS: u32 = 20;

/// Key scan interval; the realtime scan rate the whole scheduler is built around.
pub const KEY_SCAN_INTERVAL_MS: u32 = 1;

/// Serial baud rate for the shared MIDI/ASCII transport.
pub const BAUD_RATE: u32 = 31_250;

/// Capacity of the outbound MIDI frame queue.
pub const MIDI_QUEUE_CAPACITY: usize = 48;

/// Capacity of the outbound ASCII frame queue.
pub const ASCII_QUEUE_CAPACITY: usize = 8;

/// Maximum length of a single outbound or inbound ASCII line, including the terminating `\n`.
pub const ASCII_LINE_CAPACITY: usize = 64;

/// Maximum number of complete inbound ASCII lines buffered awaiting the consumer.
pub const ASCII_RX_QUEUE_CAPACITY: usize = 8;

/// Maximum number of frames pumped to the transport in a single tick, bounding worst-case tick
/// latency when the queues are deep.
pub const MAX_FRAMES_PER_TICK: usize = 8;

/// Firmware version reported by the ASCII `hello` and `v` commands.
pub const BARTLEBY_VERSION: u8 = 1;

/// How long the controller waits for inbound ASCII activity after it has announced itself before
/// re-emitting the announcement frame.
pub const COMM_TIMEOUT_MS: u32 = 2_000;

/// Maximum number of note-on-side events a single key scan can produce: every key transitioning
/// `Rising -> Held` in the same scan contributes its two channel-reset messages plus its own
/// `NoteOn`, and the spec's 1ms scan loop does not forbid every key striking in the same tick.
pub const MAX_NOTE_ON_EVENTS_PER_SCAN: usize = NUM_KEYS * 3;

/// Maximum number of events a single key/pot/encoder scan pass can enqueue for the encoding
/// stage. Sized for the true worst case of one scan: up to `NUM_KEYS` note-offs, up to
/// `MAX_NOTE_ON_EVENTS_PER_SCAN` note-on-side events, and up to `NUM_KEYS` pressure updates, all
/// in the same tick, so a simultaneous chord strike is never silently truncated — note-on/off
/// must never be dropped.
pub const MAX_EVENTS_PER_TICK: usize = NUM_KEYS + MAX_NOTE_ON_EVENTS_PER_SCAN + NUM_KEYS;

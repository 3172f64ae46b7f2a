//! Realtime input-to-MPE translation core for a pressure-sensitive 25-key MIDI controller.
//!
//! This crate owns the part of the firmware that has no business knowing about specific GPIO
//! pins or ADC peripherals: key and pot scanning, velocity and pressure curves, MPE channel
//! allocation, MIDI encoding, and the shared MIDI/ASCII transport's framing and backpressure
//! policy. A board-support crate supplies the three boundary traits (`Sampler`, `Uart`, `Clock`)
//! and drives `MainLoop::run_once` from its own timer tick.
#![no_std]

pub mod ascii;
pub mod clock;
pub mod config;
pub mod encoder_engine;
pub mod error;
pub mod event;
pub mod key;
pub mod key_engine;
pub mod main_loop;
pub mod midi_encoder;
pub mod mpe_allocator;
pub mod mpe_zone;
pub mod pot;
pub mod pot_engine;
pub mod sampler;
pub mod transport;
pub mod uart;

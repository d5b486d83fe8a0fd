//! Core utilities for the GSM BTS lower layers
//!
//! This crate provides the fundamental types used across the stack:
//! - GsmTime for TDMA frame timing and hyperframe arithmetic
//! - RSL channel number packing helpers
//! - Burst-level bit constants (dummy burst, FCCH, training sequences)
//! - A5 keystream generation
//! - Common macros and debug utilities

pub mod a5;
pub mod burst;
pub mod chan_nr;
pub mod debug;
pub mod frame;

// Re-export commonly used items
pub use burst::GSM_BURST_LEN;
pub use frame::{GSM_HYPERFRAME, GsmTime};

/// Number of timeslots per TDMA frame.
pub const TRX_NR_TS: usize = 8;

/// Unpacked bit, one symbol per byte, values 0/1.
pub type Ubit = u8;

/// Soft bit as delivered by the demodulator: sign is the bit decision
/// (negative = 1), magnitude is confidence, 0 = no information.
pub type Sbit = i8;

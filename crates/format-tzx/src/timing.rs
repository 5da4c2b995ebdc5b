//! Canonical ROM loader timing (T-states).
//!
//! These are the pulse widths the 48K ROM SAVE routine generates and the
//! LOAD routine locks onto. Standard speed blocks carry no timing of their
//! own; the projector and the save engine fill these in.

/// Pilot pulse width.
pub const PILOT_PL: u32 = 2168;

/// First sync pulse width.
pub const SYNC_1_PL: u32 = 667;

/// Second sync pulse width.
pub const SYNC_2_PL: u32 = 735;

/// Zero-bit half-pulse width.
pub const BIT_0_PL: u32 = 855;

/// One-bit half-pulse width.
pub const BIT_1_PL: u32 = 1710;

/// Terminating sync pulse width.
pub const TERM_SYNC: u32 = 947;

/// Pilot pulses preceding a header block (flag byte $00).
pub const HEADER_PILOT_COUNT: u32 = 8063;

/// Pilot pulses preceding a data block (any other flag byte).
pub const DATA_PILOT_COUNT: u32 = 3223;

/// Default pause after a block, in milliseconds.
pub const PAUSE_MS: u32 = 1000;

//! Pulse-level tape signal engines.
//!
//! `format-tzx` understands the TZX container; this crate turns its
//! data-bearing blocks into the actual cassette signal and back:
//!
//! - [`TapeDataBlock`]: a normalized playable unit (payload plus pulse
//!   widths) projected from a TZX block.
//! - [`PlaybackEngine`]: a pull-based state machine emitting EAR edges with
//!   T-state timestamps.
//! - [`SaveEngine`]: classifies MIC pulse widths and reassembles bytes from
//!   a recorded pulse train; [`TapeRecorder`] collects a whole session.
//! - [`TapeDeck`]: the projected block list and the play cursor.
//!
//! Both engines are advanced only by their caller (`advance` /
//! `feed_pulse`); nothing here owns a thread or a clock. A host emulator
//! calls into the engines once per emulated slice and wires the returned
//! edges to its EAR line.

mod block;
mod deck;
mod play;
mod save;

pub use block::TapeDataBlock;
pub use deck::TapeDeck;
pub use play::{EdgeEvent, PlayPhase, PlaybackEngine};
pub use save::{MicPulseType, SaveEngine, SavePhase, TapeRecorder, classify_pulse};

/// CPU clock of the 48K Spectrum, the default for ms → T-state conversion.
pub const CPU_FREQ_48K: u32 = 3_500_000;

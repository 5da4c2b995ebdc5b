//! Tape save: MIC pulse classification and byte reassembly.
//!
//! The ROM SAVE routine drives the MIC line as a long pilot tone, two sync
//! pulses, then two equal pulses per data bit. The save engine runs the
//! inverse of playback: the host measures the width of each MIC pulse
//! (T-states between level changes) and feeds it in; the engine classifies
//! each width against the canonical ROM timing and reassembles bytes
//! MSB-first.

use tracing::debug;

use crate::TapeDataBlock;
use format_tzx::timing::{
    BIT_0_PL, BIT_1_PL, DATA_PILOT_COUNT, HEADER_PILOT_COUNT, PAUSE_MS, PILOT_PL, SYNC_1_PL,
    SYNC_2_PL, TERM_SYNC,
};
use format_tzx::{TzxBlock, TzxError, TzxFile};

/// Half-width of the acceptance window around each canonical pulse width.
const SAVE_PULSE_TOLERANCE: u32 = 24;

/// Minimum pilot pulses before SYNC1 is accepted.
const MIN_PILOT_PULSE_COUNT: u32 = 3000;

/// Length of a Spectrum header block (flag + type + name + params + checksum).
const HEADER_BLOCK_LEN: usize = 0x13;

/// Classification of a single MIC pulse by its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicPulseType {
    /// Inside none of the acceptance windows.
    None,
    /// Below the lowest acceptance window.
    TooShort,
    /// Above the pilot acceptance window.
    TooLong,
    Pilot,
    Sync1,
    Sync2,
    Bit0,
    Bit1,
    TermSync,
}

/// Phase of the save decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// Waiting for a pilot tone; noise is ignored.
    None,
    /// Counting pilot pulses.
    Pilot,
    /// First sync pulse seen.
    Sync1,
    /// Second sync pulse seen; data follows.
    Sync2,
    /// Decoding bit pulse pairs.
    Data,
    /// The pulse train broke the protocol. Terminal for this block attempt;
    /// [`SaveEngine::reset`] recovers.
    Error,
}

/// Classify a MIC pulse width in T-states.
///
/// Each canonical width accepts ±[`SAVE_PULSE_TOLERANCE`] T-states. Widths
/// below the lowest window are `TooShort`, widths above the pilot window
/// `TooLong`, and anything falling between two windows is `None`.
#[must_use]
pub fn classify_pulse(t_states: u32) -> MicPulseType {
    let near = |target: u32| {
        t_states >= target - SAVE_PULSE_TOLERANCE && t_states <= target + SAVE_PULSE_TOLERANCE
    };
    if near(BIT_0_PL) {
        MicPulseType::Bit0
    } else if near(BIT_1_PL) {
        MicPulseType::Bit1
    } else if near(PILOT_PL) {
        MicPulseType::Pilot
    } else if near(SYNC_1_PL) {
        MicPulseType::Sync1
    } else if near(SYNC_2_PL) {
        MicPulseType::Sync2
    } else if near(TERM_SYNC) {
        MicPulseType::TermSync
    } else if t_states < SYNC_1_PL - SAVE_PULSE_TOLERANCE {
        MicPulseType::TooShort
    } else if t_states > PILOT_PL + 2 * SAVE_PULSE_TOLERANCE {
        MicPulseType::TooLong
    } else {
        MicPulseType::None
    }
}

/// Pulse-train decoder for one block at a time.
///
/// Feed measured MIC pulse widths with [`feed_pulse`](Self::feed_pulse);
/// a terminating sync completes the block and yields a [`TapeDataBlock`]
/// carrying the decoded bytes and the canonical ROM pulse parameters,
/// ready to re-encode as a TZX standard speed block.
pub struct SaveEngine {
    phase: SavePhase,
    pilot_pulse_count: u32,
    /// First half of the bit pulse pair currently in flight.
    prev_data_pulse: Option<bool>,
    bit_offset: u8,
    data_byte: u8,
    buffer: Vec<u8>,
}

impl SaveEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SavePhase::None,
            pilot_pulse_count: 0,
            prev_data_pulse: None,
            bit_offset: 0,
            data_byte: 0,
            buffer: Vec::new(),
        }
    }

    /// Current save phase.
    #[must_use]
    pub fn phase(&self) -> SavePhase {
        self.phase
    }

    /// Pilot pulses counted so far in the current attempt.
    #[must_use]
    pub fn pilot_pulse_count(&self) -> u32 {
        self.pilot_pulse_count
    }

    /// Bytes decoded so far in the in-flight block.
    #[must_use]
    pub fn bytes_decoded(&self) -> usize {
        self.buffer.len()
    }

    /// Abandon the in-flight block attempt. The engine itself survives any
    /// number of failed attempts.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one measured MIC pulse width. Returns the finished block when a
    /// terminating sync completes it.
    pub fn feed_pulse(&mut self, t_states: u32) -> Option<TapeDataBlock> {
        let pulse = classify_pulse(t_states);
        let mut completed = None;

        self.phase = match self.phase {
            SavePhase::None => match pulse {
                // Noise before the pilot tone is ignored.
                MicPulseType::TooShort | MicPulseType::TooLong => SavePhase::None,
                MicPulseType::Pilot => {
                    self.pilot_pulse_count = 1;
                    SavePhase::Pilot
                }
                _ => SavePhase::Error,
            },
            SavePhase::Pilot => match pulse {
                MicPulseType::Pilot => {
                    self.pilot_pulse_count += 1;
                    SavePhase::Pilot
                }
                MicPulseType::Sync1 if self.pilot_pulse_count >= MIN_PILOT_PULSE_COUNT => {
                    SavePhase::Sync1
                }
                _ => SavePhase::Error,
            },
            SavePhase::Sync1 => match pulse {
                MicPulseType::Sync2 => SavePhase::Sync2,
                _ => SavePhase::Error,
            },
            SavePhase::Sync2 => match pulse {
                MicPulseType::Bit0 | MicPulseType::Bit1 => {
                    // First half of the first data bit.
                    self.prev_data_pulse = Some(pulse == MicPulseType::Bit1);
                    self.bit_offset = 0;
                    self.data_byte = 0;
                    self.buffer.clear();
                    SavePhase::Data
                }
                _ => SavePhase::Error,
            },
            SavePhase::Data => match pulse {
                MicPulseType::Bit0 | MicPulseType::Bit1 => {
                    let bit = pulse == MicPulseType::Bit1;
                    match self.prev_data_pulse.take() {
                        None => {
                            self.prev_data_pulse = Some(bit);
                            SavePhase::Data
                        }
                        Some(first) if first == bit => {
                            self.push_bit(bit);
                            SavePhase::Data
                        }
                        // The two halves of a bit must have equal width.
                        Some(_) => SavePhase::Error,
                    }
                }
                MicPulseType::TermSync => {
                    completed = Some(self.finish_block());
                    SavePhase::None
                }
                _ => SavePhase::Error,
            },
            SavePhase::Error => SavePhase::Error,
        };

        completed
    }

    /// Shift one decoded bit in, MSB first.
    fn push_bit(&mut self, bit: bool) {
        self.data_byte = (self.data_byte << 1) | u8::from(bit);
        self.bit_offset += 1;
        if self.bit_offset == 8 {
            self.buffer.push(self.data_byte);
            self.data_byte = 0;
            self.bit_offset = 0;
        }
    }

    /// Package the decoded bytes as a standard speed block. A trailing
    /// partial byte is dropped; the ROM never saves one.
    fn finish_block(&mut self) -> TapeDataBlock {
        let data = std::mem::take(&mut self.buffer);
        debug!(bytes = data.len(), "save block complete");
        let pilot_count = if data.first() == Some(&0x00) {
            HEADER_PILOT_COUNT
        } else {
            DATA_PILOT_COUNT
        };
        self.pilot_pulse_count = 0;
        self.prev_data_pulse = None;
        self.bit_offset = 0;
        self.data_byte = 0;

        TapeDataBlock {
            data,
            pause_ms: PAUSE_MS,
            pilot_pulse: PILOT_PL,
            pilot_count,
            sync1: SYNC_1_PL,
            sync2: SYNC_2_PL,
            zero_pulse: BIT_0_PL,
            one_pulse: BIT_1_PL,
            end_sync: TERM_SYNC,
            used_bits: 8,
        }
    }
}

impl Default for SaveEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the blocks of one SAVE session and serializes them as TZX.
///
/// The Spectrum ROM saves a program as a 19-byte header block (flag $00)
/// followed by a data block (flag $FF). The recorder picks the file name
/// out of the header (bytes 2-11, right-trimmed) and can write the whole
/// session as a TZX stream of standard speed blocks.
pub struct TapeRecorder {
    engine: SaveEngine,
    blocks: Vec<TapeDataBlock>,
    name: Option<String>,
}

impl TapeRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: SaveEngine::new(),
            blocks: Vec::new(),
            name: None,
        }
    }

    /// Feed one measured MIC pulse width; completed blocks accumulate. A
    /// broken pulse train only loses the in-flight block.
    pub fn feed_pulse(&mut self, t_states: u32) {
        if let Some(block) = self.engine.feed_pulse(t_states) {
            if self.blocks.is_empty()
                && block.data.len() == HEADER_BLOCK_LEN
                && block.data[0] == 0x00
            {
                let name: String = block.data[2..12].iter().map(|&b| char::from(b)).collect();
                self.name = Some(name.trim_end().to_string());
            }
            self.blocks.push(block);
        }
        if self.engine.phase() == SavePhase::Error {
            self.engine.reset();
        }
    }

    /// File name from the session's header block, if one was saved.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Blocks completed so far.
    #[must_use]
    pub fn blocks(&self) -> &[TapeDataBlock] {
        &self.blocks
    }

    /// Serialize the session as a TZX stream: a header plus one standard
    /// speed block per saved block.
    pub fn write_tzx(&self) -> Result<Vec<u8>, TzxError> {
        let mut file = TzxFile::new();
        for block in &self.blocks {
            file.blocks.push(TzxBlock::standard_speed(
                block.data.clone(),
                block.pause_ms as u16,
            ));
        }
        file.write()
    }
}

impl Default for TapeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

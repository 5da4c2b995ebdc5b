//! The TZX block family as a closed tagged union.
//!
//! Every block starts with an id byte; the variant determines the payload
//! layout. Declared length fields are retained alongside the materialized
//! payloads so [`TzxBlock::is_valid`] can check them on blocks built by
//! authoring tools (freshly decoded blocks always pass: the decoder reads
//! exactly the declared number of bytes or fails).

/// Fixed part of a CSW recording block counted by its declared length
/// (pause + sampling rate + compression type + pulse count).
pub(crate) const CSW_FIXED_LEN: usize = 12;

/// A single TZX block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TzxBlock {
    /// Block $10: Standard speed data (ROM timing).
    StandardSpeed {
        pause_ms: u16,
        data_length: u16,
        data: Vec<u8>,
    },
    /// Block $11: Turbo speed data (custom timing).
    TurboSpeed {
        pilot_pulse: u16,
        sync1: u16,
        sync2: u16,
        zero_pulse: u16,
        one_pulse: u16,
        pilot_count: u16,
        used_bits: u8,
        pause_ms: u16,
        data_length: u32,
        data: Vec<u8>,
    },
    /// Block $12: Pure tone (repeated single pulse).
    PureTone { pulse_len: u16, pulse_count: u16 },
    /// Block $13: Pulse sequence (arbitrary pulse lengths).
    PulseSequence { pulse_count: u8, pulses: Vec<u16> },
    /// Block $14: Pure data (no pilot or sync, just data bits).
    PureData {
        zero_pulse: u16,
        one_pulse: u16,
        used_bits: u8,
        pause_ms: u16,
        data_length: u32,
        data: Vec<u8>,
    },
    /// Block $15: Direct recording (signal sampled at a fixed T-state rate).
    DirectRecording {
        tstates_per_sample: u16,
        pause_ms: u16,
        used_bits: u8,
        data_length: u32,
        data: Vec<u8>,
    },
    /// Block $16: C64 ROM type data. Deprecated: read through and kept
    /// opaque, never written back.
    C64RomType { raw: Vec<u8> },
    /// Block $17: C64 turbo tape data. Deprecated, as $16.
    C64TurboTape { raw: Vec<u8> },
    /// Block $18: CSW recording. The sample data stays opaque; decompression
    /// belongs to a CSW codec, not the tape core.
    CswRecording {
        block_length: u32,
        pause_ms: u16,
        sampling_rate: [u8; 3],
        compression_type: u8,
        pulse_count: u32,
        data: Vec<u8>,
    },
    /// Block $19: Generalized data. Kept as an opaque body: the reference
    /// symbol-table decoders disagree with files in the wild, so the payload
    /// is preserved verbatim rather than interpreted.
    GeneralizedData { body: Vec<u8> },
    /// Block $20: Silence, or stop the tape when the duration is zero.
    Silence { duration_ms: u16 },
    /// Block $21: Group start.
    GroupStart { name: String },
    /// Block $22: Group end.
    GroupEnd,
    /// Block $23: Relative jump within the block list.
    Jump { offset: i16 },
    /// Block $24: Loop start.
    LoopStart { repetitions: u16 },
    /// Block $25: Loop end.
    LoopEnd,
    /// Block $26: Call sequence (relative offsets of the called blocks).
    CallSequence { offsets: Vec<u16> },
    /// Block $27: Return from call sequence.
    ReturnFromSequence,
    /// Block $28: Select (menu of jump targets).
    Select {
        length: u16,
        selections: Vec<Selection>,
    },
    /// Block $2A: Stop the tape if in 48K mode.
    StopIf48K,
    /// Block $2B: Set signal level.
    SetSignalLevel { level: bool },
    /// Block $30: Text description.
    TextDescription { text: String },
    /// Block $31: Message to display for a number of seconds.
    Message { display_secs: u8, text: String },
    /// Block $32: Archive info.
    ArchiveInfo {
        length: u16,
        entries: Vec<TextEntry>,
    },
    /// Block $33: Hardware info.
    HardwareInfo { entries: Vec<HwEntry> },
    /// Block $34: Emulation info. Deprecated, as $16.
    EmulationInfo { raw: Vec<u8> },
    /// Block $35: Custom info.
    CustomInfo { id: [u8; 10], info: Vec<u8> },
    /// Block $40: Snapshot reference. Deprecated, as $16.
    Snapshot { raw: Vec<u8> },
    /// Block $5A: Glue block left by concatenating two tape files.
    Glue { bytes: [u8; 9] },
}

/// A typed text entry in an archive info block ($32).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    /// $00 title, $01 publisher, $02 author, $03 year, $04 language,
    /// $05 type, $06 price, $07 loader, $08 origin, $FF comment.
    pub kind: u8,
    pub text: String,
}

/// One machine/hardware record in a hardware info block ($33).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwEntry {
    pub hw_type: u8,
    pub hw_id: u8,
    /// $00 runs, $01 uses the hardware, $02 runs without it, $03 doesn't run.
    pub tape_info: u8,
}

/// One selectable entry in a select block ($28).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub block_offset: u16,
    pub description: String,
}

impl TzxBlock {
    /// The id byte identifying this block on disk.
    #[must_use]
    pub fn block_id(&self) -> u8 {
        match self {
            Self::StandardSpeed { .. } => 0x10,
            Self::TurboSpeed { .. } => 0x11,
            Self::PureTone { .. } => 0x12,
            Self::PulseSequence { .. } => 0x13,
            Self::PureData { .. } => 0x14,
            Self::DirectRecording { .. } => 0x15,
            Self::C64RomType { .. } => 0x16,
            Self::C64TurboTape { .. } => 0x17,
            Self::CswRecording { .. } => 0x18,
            Self::GeneralizedData { .. } => 0x19,
            Self::Silence { .. } => 0x20,
            Self::GroupStart { .. } => 0x21,
            Self::GroupEnd => 0x22,
            Self::Jump { .. } => 0x23,
            Self::LoopStart { .. } => 0x24,
            Self::LoopEnd => 0x25,
            Self::CallSequence { .. } => 0x26,
            Self::ReturnFromSequence => 0x27,
            Self::Select { .. } => 0x28,
            Self::StopIf48K => 0x2A,
            Self::SetSignalLevel { .. } => 0x2B,
            Self::TextDescription { .. } => 0x30,
            Self::Message { .. } => 0x31,
            Self::ArchiveInfo { .. } => 0x32,
            Self::HardwareInfo { .. } => 0x33,
            Self::EmulationInfo { .. } => 0x34,
            Self::CustomInfo { .. } => 0x35,
            Self::Snapshot { .. } => 0x40,
            Self::Glue { .. } => 0x5A,
        }
    }

    /// Whether this is a deprecated read-through variant that cannot be
    /// written back.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        matches!(
            self,
            Self::C64RomType { .. }
                | Self::C64TurboTape { .. }
                | Self::EmulationInfo { .. }
                | Self::Snapshot { .. }
        )
    }

    /// Advisory structural check: declared length fields must match the
    /// materialized payload. Freshly decoded blocks always pass; blocks
    /// assembled by hand may not.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::StandardSpeed {
                data_length, data, ..
            } => *data_length as usize == data.len(),
            Self::TurboSpeed {
                data_length, data, ..
            }
            | Self::PureData {
                data_length, data, ..
            }
            | Self::DirectRecording {
                data_length, data, ..
            } => *data_length as usize == data.len(),
            Self::PulseSequence {
                pulse_count,
                pulses,
            } => *pulse_count as usize == pulses.len(),
            Self::CswRecording {
                block_length, data, ..
            } => *block_length as usize == CSW_FIXED_LEN + data.len(),
            _ => true,
        }
    }

    /// Build a standard speed block with a consistent declared length.
    #[must_use]
    pub fn standard_speed(data: Vec<u8>, pause_ms: u16) -> Self {
        Self::StandardSpeed {
            pause_ms,
            data_length: data.len() as u16,
            data,
        }
    }

    /// Build a turbo speed block around explicit timing, with a consistent
    /// declared length.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn turbo_speed(
        pilot_pulse: u16,
        sync1: u16,
        sync2: u16,
        zero_pulse: u16,
        one_pulse: u16,
        pilot_count: u16,
        used_bits: u8,
        pause_ms: u16,
        data: Vec<u8>,
    ) -> Self {
        Self::TurboSpeed {
            pilot_pulse,
            sync1,
            sync2,
            zero_pulse,
            one_pulse,
            pilot_count,
            used_bits,
            pause_ms,
            data_length: data.len() as u32,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_speed_constructor_is_consistent() {
        let block = TzxBlock::standard_speed(vec![0xFF, 0x01, 0x02], 1000);
        assert_eq!(block.block_id(), 0x10);
        assert!(block.is_valid());
    }

    #[test]
    fn length_mismatch_is_invalid() {
        let block = TzxBlock::StandardSpeed {
            pause_ms: 1000,
            data_length: 5,
            data: vec![0xFF],
        };
        assert!(!block.is_valid());

        let block = TzxBlock::PulseSequence {
            pulse_count: 3,
            pulses: vec![100, 200],
        };
        assert!(!block.is_valid());
    }

    #[test]
    fn csw_length_counts_fixed_fields() {
        let block = TzxBlock::CswRecording {
            block_length: 12 + 2,
            pause_ms: 0,
            sampling_rate: [0x44, 0xAC, 0x00],
            compression_type: 0x01,
            pulse_count: 2,
            data: vec![0xAB, 0xCD],
        };
        assert!(block.is_valid());
    }

    #[test]
    fn deprecated_variants() {
        assert!(TzxBlock::C64RomType { raw: vec![] }.is_deprecated());
        assert!(TzxBlock::Snapshot { raw: vec![] }.is_deprecated());
        assert!(!TzxBlock::GroupEnd.is_deprecated());
    }
}

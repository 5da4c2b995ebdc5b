//! TZX block encoding: the write half of the codec.
//!
//! Encoders write the stored declared-length fields verbatim rather than
//! recomputing them, so decode → encode reproduces the input bytes and
//! [`TzxBlock::is_valid`] stays meaningful for hand-assembled blocks.

use crate::TzxError;
use crate::block::TzxBlock;
use crate::cursor::ByteWriter;

impl TzxBlock {
    /// Encode this block, including its leading id byte.
    ///
    /// # Errors
    ///
    /// Deprecated read-through variants ($16, $17, $34, $40) cannot be
    /// written back.
    pub fn encode(&self, w: &mut ByteWriter) -> Result<(), TzxError> {
        if self.is_deprecated() {
            return Err(TzxError::DeprecatedWrite {
                id: self.block_id(),
            });
        }
        w.write_byte(self.block_id());

        match self {
            Self::StandardSpeed {
                pause_ms,
                data_length,
                data,
            } => {
                w.write_u16(*pause_ms);
                w.write_u16(*data_length);
                w.write_bytes(data);
            }
            Self::TurboSpeed {
                pilot_pulse,
                sync1,
                sync2,
                zero_pulse,
                one_pulse,
                pilot_count,
                used_bits,
                pause_ms,
                data_length,
                data,
            } => {
                w.write_u16(*pilot_pulse);
                w.write_u16(*sync1);
                w.write_u16(*sync2);
                w.write_u16(*zero_pulse);
                w.write_u16(*one_pulse);
                w.write_u16(*pilot_count);
                w.write_byte(*used_bits);
                w.write_u16(*pause_ms);
                w.write_u24(*data_length);
                w.write_bytes(data);
            }
            Self::PureTone {
                pulse_len,
                pulse_count,
            } => {
                w.write_u16(*pulse_len);
                w.write_u16(*pulse_count);
            }
            Self::PulseSequence {
                pulse_count,
                pulses,
            } => {
                w.write_byte(*pulse_count);
                w.write_words(pulses);
            }
            Self::PureData {
                zero_pulse,
                one_pulse,
                used_bits,
                pause_ms,
                data_length,
                data,
            } => {
                w.write_u16(*zero_pulse);
                w.write_u16(*one_pulse);
                w.write_byte(*used_bits);
                w.write_u16(*pause_ms);
                w.write_u24(*data_length);
                w.write_bytes(data);
            }
            Self::DirectRecording {
                tstates_per_sample,
                pause_ms,
                used_bits,
                data_length,
                data,
            } => {
                w.write_u16(*tstates_per_sample);
                w.write_u16(*pause_ms);
                w.write_byte(*used_bits);
                w.write_u24(*data_length);
                w.write_bytes(data);
            }
            Self::CswRecording {
                block_length,
                pause_ms,
                sampling_rate,
                compression_type,
                pulse_count,
                data,
            } => {
                w.write_u32(*block_length);
                w.write_u16(*pause_ms);
                w.write_bytes(sampling_rate);
                w.write_byte(*compression_type);
                w.write_u32(*pulse_count);
                w.write_bytes(data);
            }
            Self::GeneralizedData { body } => {
                w.write_u32(body.len() as u32);
                w.write_bytes(body);
            }
            Self::Silence { duration_ms } => {
                w.write_u16(*duration_ms);
            }
            Self::GroupStart { name } => {
                w.write_byte(name.len() as u8);
                w.write_bytes(name.as_bytes());
            }
            Self::GroupEnd | Self::LoopEnd | Self::ReturnFromSequence => {}
            Self::Jump { offset } => {
                w.write_u16(*offset as u16);
            }
            Self::LoopStart { repetitions } => {
                w.write_u16(*repetitions);
            }
            Self::CallSequence { offsets } => {
                w.write_byte(offsets.len() as u8);
                w.write_words(offsets);
            }
            Self::Select { length, selections } => {
                w.write_u16(*length);
                w.write_byte(selections.len() as u8);
                for selection in selections {
                    w.write_u16(selection.block_offset);
                    w.write_byte(selection.description.len() as u8);
                    w.write_bytes(selection.description.as_bytes());
                }
            }
            Self::StopIf48K => {
                w.write_u32(0);
            }
            Self::SetSignalLevel { level } => {
                w.write_u32(1);
                w.write_byte(u8::from(*level));
            }
            Self::TextDescription { text } => {
                w.write_byte(text.len() as u8);
                w.write_bytes(text.as_bytes());
            }
            Self::Message { display_secs, text } => {
                w.write_byte(*display_secs);
                w.write_byte(text.len() as u8);
                w.write_bytes(text.as_bytes());
            }
            Self::ArchiveInfo { length, entries } => {
                w.write_u16(*length);
                w.write_byte(entries.len() as u8);
                for entry in entries {
                    w.write_byte(entry.kind);
                    w.write_byte(entry.text.len() as u8);
                    w.write_bytes(entry.text.as_bytes());
                }
            }
            Self::HardwareInfo { entries } => {
                w.write_byte(entries.len() as u8);
                for entry in entries {
                    w.write_byte(entry.hw_type);
                    w.write_byte(entry.hw_id);
                    w.write_byte(entry.tape_info);
                }
            }
            Self::CustomInfo { id, info } => {
                w.write_bytes(id);
                w.write_u32(info.len() as u32);
                w.write_bytes(info);
            }
            Self::Glue { bytes } => {
                w.write_bytes(bytes);
            }
            // Rejected above; the early return keeps this arm unreachable.
            Self::C64RomType { .. }
            | Self::C64TurboTape { .. }
            | Self::EmulationInfo { .. }
            | Self::Snapshot { .. } => {}
        }
        Ok(())
    }
}

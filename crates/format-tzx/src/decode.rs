//! TZX block decoding: dispatch on the leading block id byte.
//!
//! Every decoder validates declared lengths against the remaining input
//! before materializing buffers; a malformed block yields an error and no
//! partial block is ever produced.

use crate::TzxError;
use crate::block::{CSW_FIXED_LEN, HwEntry, Selection, TextEntry, TzxBlock};
use crate::cursor::ByteReader;

impl TzxBlock {
    /// Decode one block, including its leading id byte.
    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self, TzxError> {
        let offset = r.position();
        let id = r.read_byte("block id")?;
        match id {
            0x10 => decode_standard_speed(r),
            0x11 => decode_turbo_speed(r),
            0x12 => decode_pure_tone(r),
            0x13 => decode_pulse_sequence(r),
            0x14 => decode_pure_data(r),
            0x15 => decode_direct_recording(r),
            0x16 => decode_c64_rom_type(r),
            0x17 => decode_c64_turbo_tape(r),
            0x18 => decode_csw_recording(r),
            0x19 => decode_generalized_data(r),
            0x20 => decode_silence(r),
            0x21 => decode_group_start(r),
            0x22 => Ok(Self::GroupEnd),
            0x23 => decode_jump(r),
            0x24 => decode_loop_start(r),
            0x25 => Ok(Self::LoopEnd),
            0x26 => decode_call_sequence(r),
            0x27 => Ok(Self::ReturnFromSequence),
            0x28 => decode_select(r),
            0x2A => decode_stop_if_48k(r),
            0x2B => decode_set_signal_level(r),
            0x30 => decode_text_description(r),
            0x31 => decode_message(r),
            0x32 => decode_archive_info(r),
            0x33 => decode_hardware_info(r),
            0x34 => decode_emulation_info(r),
            0x35 => decode_custom_info(r),
            0x40 => decode_snapshot(r),
            0x5A => decode_glue(r),
            other => Err(TzxError::UnknownBlockId { id: other, offset }),
        }
    }
}

/// ASCII text as stored on tape; anything outside ASCII is replaced.
fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

/// Block $10: Standard speed data block.
fn decode_standard_speed(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let pause_ms = r.read_u16("Standard Speed pause")?;
    let data_length = r.read_u16("Standard Speed length")?;
    let data = r
        .read_bytes(data_length as usize, "Standard Speed data")?
        .to_vec();
    Ok(TzxBlock::StandardSpeed {
        pause_ms,
        data_length,
        data,
    })
}

/// Block $11: Turbo speed data block. The data length is a 3-byte field.
fn decode_turbo_speed(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let pilot_pulse = r.read_u16("Turbo Speed pilot pulse")?;
    let sync1 = r.read_u16("Turbo Speed sync1")?;
    let sync2 = r.read_u16("Turbo Speed sync2")?;
    let zero_pulse = r.read_u16("Turbo Speed zero pulse")?;
    let one_pulse = r.read_u16("Turbo Speed one pulse")?;
    let pilot_count = r.read_u16("Turbo Speed pilot count")?;
    let used_bits = r.read_byte("Turbo Speed used bits")?;
    let pause_ms = r.read_u16("Turbo Speed pause")?;
    let data_length = r.read_u24("Turbo Speed length")?;
    let data = r
        .read_bytes(data_length as usize, "Turbo Speed data")?
        .to_vec();
    Ok(TzxBlock::TurboSpeed {
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
    })
}

/// Block $12: Pure tone.
fn decode_pure_tone(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let pulse_len = r.read_u16("Pure Tone pulse length")?;
    let pulse_count = r.read_u16("Pure Tone pulse count")?;
    Ok(TzxBlock::PureTone {
        pulse_len,
        pulse_count,
    })
}

/// Block $13: Pulse sequence.
fn decode_pulse_sequence(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let pulse_count = r.read_byte("Pulse Sequence count")?;
    let pulses = r.read_words(pulse_count as usize, "Pulse Sequence data")?;
    Ok(TzxBlock::PulseSequence {
        pulse_count,
        pulses,
    })
}

/// Block $14: Pure data block. The data length is a 3-byte field.
fn decode_pure_data(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let zero_pulse = r.read_u16("Pure Data zero pulse")?;
    let one_pulse = r.read_u16("Pure Data one pulse")?;
    let used_bits = r.read_byte("Pure Data used bits")?;
    let pause_ms = r.read_u16("Pure Data pause")?;
    let data_length = r.read_u24("Pure Data length")?;
    let data = r
        .read_bytes(data_length as usize, "Pure Data data")?
        .to_vec();
    Ok(TzxBlock::PureData {
        zero_pulse,
        one_pulse,
        used_bits,
        pause_ms,
        data_length,
        data,
    })
}

/// Block $15: Direct recording. The data length is a 3-byte field.
fn decode_direct_recording(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let tstates_per_sample = r.read_u16("Direct Recording sample rate")?;
    let pause_ms = r.read_u16("Direct Recording pause")?;
    let used_bits = r.read_byte("Direct Recording used bits")?;
    let data_length = r.read_u24("Direct Recording length")?;
    let data = r
        .read_bytes(data_length as usize, "Direct Recording data")?
        .to_vec();
    Ok(TzxBlock::DirectRecording {
        tstates_per_sample,
        pause_ms,
        used_bits,
        data_length,
        data,
    })
}

/// Block $16: deprecated C64 ROM type block. The 4-byte length counts
/// itself; the body is read through and kept opaque.
fn decode_c64_rom_type(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let offset = r.position();
    let length = r.read_u32("C64 ROM Type length")? as usize;
    let Some(body_len) = length.checked_sub(4) else {
        return Err(TzxError::BadLength {
            offset,
            context: "C64 ROM Type length",
        });
    };
    let raw = r.read_bytes(body_len, "C64 ROM Type data")?.to_vec();
    Ok(TzxBlock::C64RomType { raw })
}

/// Block $17: deprecated C64 turbo tape block. The 2-byte length counts
/// a 4-byte prefix; the body is read through and kept opaque.
fn decode_c64_turbo_tape(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let offset = r.position();
    let length = r.read_u16("C64 Turbo Tape length")? as usize;
    let Some(body_len) = length.checked_sub(4) else {
        return Err(TzxError::BadLength {
            offset,
            context: "C64 Turbo Tape length",
        });
    };
    let raw = r.read_bytes(body_len, "C64 Turbo Tape data")?.to_vec();
    Ok(TzxBlock::C64TurboTape { raw })
}

/// Block $18: CSW recording.
fn decode_csw_recording(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let offset = r.position();
    let block_length = r.read_u32("CSW Recording length")?;
    let pause_ms = r.read_u16("CSW Recording pause")?;
    let rate = r.read_bytes(3, "CSW Recording sampling rate")?;
    let sampling_rate = [rate[0], rate[1], rate[2]];
    let compression_type = r.read_byte("CSW Recording compression")?;
    let pulse_count = r.read_u32("CSW Recording pulse count")?;
    let Some(data_len) = (block_length as usize).checked_sub(CSW_FIXED_LEN) else {
        return Err(TzxError::BadLength {
            offset,
            context: "CSW Recording length",
        });
    };
    let data = r.read_bytes(data_len, "CSW Recording data")?.to_vec();
    Ok(TzxBlock::CswRecording {
        block_length,
        pause_ms,
        sampling_rate,
        compression_type,
        pulse_count,
        data,
    })
}

/// Block $19: Generalized data, preserved as an opaque body.
fn decode_generalized_data(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let length = r.read_u32("Generalized Data length")? as usize;
    let body = r.read_bytes(length, "Generalized Data body")?.to_vec();
    Ok(TzxBlock::GeneralizedData { body })
}

/// Block $20: Silence / stop the tape.
fn decode_silence(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let duration_ms = r.read_u16("Silence duration")?;
    Ok(TzxBlock::Silence { duration_ms })
}

/// Block $21: Group start.
fn decode_group_start(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let len = r.read_byte("Group Start length")?;
    let name = ascii(r.read_bytes(len as usize, "Group Start name")?);
    Ok(TzxBlock::GroupStart { name })
}

/// Block $23: Relative jump.
fn decode_jump(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let offset = r.read_u16("Jump offset")? as i16;
    Ok(TzxBlock::Jump { offset })
}

/// Block $24: Loop start.
fn decode_loop_start(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let repetitions = r.read_u16("Loop Start repetitions")?;
    Ok(TzxBlock::LoopStart { repetitions })
}

/// Block $26: Call sequence.
fn decode_call_sequence(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let count = r.read_byte("Call Sequence count")?;
    let offsets = r.read_words(count as usize, "Call Sequence offsets")?;
    Ok(TzxBlock::CallSequence { offsets })
}

/// Block $28: Select. Entries beyond the declared block length are dropped
/// and any declared bytes the entries don't cover are skipped.
fn decode_select(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let length = r.read_u16("Select length")?;
    r.need(length as usize, "Select body")?;
    let end = r.position() + length as usize;

    let count = r.read_byte("Select count")?;
    let mut selections = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if r.position() + 3 > end {
            break;
        }
        let block_offset = r.read_u16("Select entry offset")?;
        let len = r.read_byte("Select entry length")? as usize;
        let take = len.min(end - r.position());
        let description = ascii(r.read_bytes(take, "Select entry text")?);
        selections.push(Selection {
            block_offset,
            description,
        });
    }
    r.seek_to(end);

    Ok(TzxBlock::Select { length, selections })
}

/// Block $2A: Stop the tape if 48K. Carries only its (zero) length field.
fn decode_stop_if_48k(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let _ = r.read_u32("Stop If 48K length")?;
    Ok(TzxBlock::StopIf48K)
}

/// Block $2B: Set signal level.
fn decode_set_signal_level(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let _ = r.read_u32("Set Signal Level length")?;
    let level = r.read_byte("Set Signal Level value")? != 0;
    Ok(TzxBlock::SetSignalLevel { level })
}

/// Block $30: Text description.
fn decode_text_description(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let len = r.read_byte("Text Description length")?;
    let text = ascii(r.read_bytes(len as usize, "Text Description text")?);
    Ok(TzxBlock::TextDescription { text })
}

/// Block $31: Message.
fn decode_message(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let display_secs = r.read_byte("Message time")?;
    let len = r.read_byte("Message length")?;
    let text = ascii(r.read_bytes(len as usize, "Message text")?);
    Ok(TzxBlock::Message { display_secs, text })
}

/// Block $32: Archive info. Entries are clamped to the declared block
/// length; trailing declared bytes are skipped.
fn decode_archive_info(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let offset = r.position();
    let length = r.read_u16("Archive Info length")?;
    if length == 0 {
        return Err(TzxError::BadLength {
            offset,
            context: "Archive Info length",
        });
    }
    r.need(length as usize, "Archive Info body")?;
    let end = r.position() + length as usize;

    let count = r.read_byte("Archive Info count")?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if r.position() + 2 > end {
            break;
        }
        let kind = r.read_byte("Archive Info entry id")?;
        let len = r.read_byte("Archive Info entry length")? as usize;
        let take = len.min(end - r.position());
        let text = ascii(r.read_bytes(take, "Archive Info entry text")?);
        entries.push(TextEntry { kind, text });
    }
    r.seek_to(end);

    Ok(TzxBlock::ArchiveInfo { length, entries })
}

/// Block $33: Hardware info.
fn decode_hardware_info(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let count = r.read_byte("Hardware Info count")?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let hw_type = r.read_byte("Hardware Info type")?;
        let hw_id = r.read_byte("Hardware Info id")?;
        let tape_info = r.read_byte("Hardware Info tape info")?;
        entries.push(HwEntry {
            hw_type,
            hw_id,
            tape_info,
        });
    }
    Ok(TzxBlock::HardwareInfo { entries })
}

/// Block $34: deprecated emulation info block, a fixed 8-byte body.
fn decode_emulation_info(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let raw = r.read_bytes(8, "Emulation Info body")?.to_vec();
    Ok(TzxBlock::EmulationInfo { raw })
}

/// Block $35: Custom info.
fn decode_custom_info(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let id_bytes = r.read_bytes(10, "Custom Info id")?;
    let mut id = [0u8; 10];
    id.copy_from_slice(id_bytes);
    let length = r.read_u32("Custom Info length")? as usize;
    let info = r.read_bytes(length, "Custom Info body")?.to_vec();
    Ok(TzxBlock::CustomInfo { id, info })
}

/// Block $40: deprecated snapshot block. The top byte of the length field
/// is a snapshot type and is masked off.
fn decode_snapshot(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let length = (r.read_u32("Snapshot length")? & 0x00FF_FFFF) as usize;
    let raw = r.read_bytes(length, "Snapshot body")?.to_vec();
    Ok(TzxBlock::Snapshot { raw })
}

/// Block $5A: Glue block, 9 fixed bytes (a truncated TZX header).
fn decode_glue(r: &mut ByteReader<'_>) -> Result<TzxBlock, TzxError> {
    let glue = r.read_bytes(9, "Glue body")?;
    let mut bytes = [0u8; 9];
    bytes.copy_from_slice(glue);
    Ok(TzxBlock::Glue { bytes })
}

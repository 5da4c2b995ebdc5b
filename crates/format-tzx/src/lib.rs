//! TZX tape image codec for the ZX Spectrum family.
//!
//! TZX encodes tape signals as T-state-accurate pulse descriptions. Unlike
//! TAP (a plain block dump that relies on a ROM trap for instant loading),
//! TZX captures the actual cassette waveform (pilot tones, sync pulses,
//! per-bit timing, pauses), supporting turbo loaders, custom protection,
//! and any non-ROM loading routine.
//!
//! # Format
//!
//! A TZX file starts with a 10-byte header (`"ZXTape!" + 0x1A + major +
//! minor`) followed by a sequence of blocks. Each block starts with an id
//! byte that determines its structure; payload sizes come from 1-, 2-, 3-
//! or 4-byte little-endian length fields depending on the block.
//!
//! Reference: <https://worldofspectrum.net/TZXformat.html>

mod block;
mod cursor;
mod decode;
mod encode;
pub mod timing;

pub use block::{HwEntry, Selection, TextEntry, TzxBlock};
pub use cursor::{ByteReader, ByteWriter};

use thiserror::Error;
use tracing::{debug, warn};

/// TZX signature: "ZXTape!".
pub const SIGNATURE: &[u8; 7] = b"ZXTape!";

/// End-of-text marker following the signature.
const EOT: u8 = 0x1A;

/// Errors raised by the TZX codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TzxError {
    /// The stream ended before a declared field or payload.
    #[error("truncated TZX {context} at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        offset: usize,
        context: &'static str,
        needed: usize,
        remaining: usize,
    },
    /// A declared length field is inconsistent with its block layout.
    #[error("malformed TZX {context} at offset {offset}")]
    BadLength {
        offset: usize,
        context: &'static str,
    },
    /// The file does not start with `"ZXTape!" + $1A`.
    #[error("invalid TZX signature (expected \"ZXTape!\" + $1A)")]
    BadSignature,
    /// Only major version 1 streams are understood.
    #[error("unsupported TZX major version {major} (expected 1)")]
    BadVersion { major: u8 },
    /// An id byte outside the known block family.
    #[error("unknown TZX block id ${id:02X} at offset {offset}")]
    UnknownBlockId { id: u8, offset: usize },
    /// Deprecated read-through blocks cannot be written.
    #[error("TZX block ${id:02X} is deprecated and cannot be written")]
    DeprecatedWrite { id: u8 },
}

/// The 10-byte header at the start of every TZX file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzxHeader {
    pub major: u8,
    pub minor: u8,
}

impl TzxHeader {
    /// A header for the TZX revision this codec writes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            major: 1,
            minor: 20,
        }
    }

    /// Read and validate the header. A bad signature or an unsupported
    /// major version is a hard error; nothing is decoded past a broken
    /// header.
    pub fn read_from(r: &mut ByteReader<'_>) -> Result<Self, TzxError> {
        let signature = r.read_bytes(7, "header signature")?;
        let eot = r.read_byte("header EOT byte")?;
        if signature != SIGNATURE || eot != EOT {
            return Err(TzxError::BadSignature);
        }
        let major = r.read_byte("header major version")?;
        let minor = r.read_byte("header minor version")?;
        if major != 1 {
            return Err(TzxError::BadVersion { major });
        }
        Ok(Self { major, minor })
    }

    pub fn write_to(self, w: &mut ByteWriter) {
        w.write_bytes(SIGNATURE);
        w.write_byte(EOT);
        w.write_byte(self.major);
        w.write_byte(self.minor);
    }
}

impl Default for TzxHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed TZX file: header version plus the ordered block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TzxFile {
    pub major: u8,
    pub minor: u8,
    pub blocks: Vec<TzxBlock>,
}

impl TzxFile {
    /// An empty tape at the current TZX revision.
    #[must_use]
    pub fn new() -> Self {
        let header = TzxHeader::new();
        Self {
            major: header.major,
            minor: header.minor,
            blocks: Vec::new(),
        }
    }

    /// Parse a TZX file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid or any block is malformed;
    /// no partial tape is ever returned.
    pub fn parse(data: &[u8]) -> Result<Self, TzxError> {
        let mut r = ByteReader::new(data);
        let header = TzxHeader::read_from(&mut r)?;

        let mut blocks = Vec::new();
        while !r.is_at_end() {
            blocks.push(TzxBlock::decode(&mut r)?);
        }
        debug!(
            blocks = blocks.len(),
            major = header.major,
            minor = header.minor,
            "parsed TZX stream"
        );

        Ok(Self {
            major: header.major,
            minor: header.minor,
            blocks,
        })
    }

    /// Serialize the tape as TZX bytes.
    ///
    /// # Errors
    ///
    /// Fails if any block is a deprecated variant that cannot be written.
    pub fn write(&self) -> Result<Vec<u8>, TzxError> {
        let mut w = ByteWriter::new();
        TzxHeader {
            major: self.major,
            minor: self.minor,
        }
        .write_to(&mut w);

        for block in &self.blocks {
            if !block.is_valid() {
                warn!(
                    id = block.block_id(),
                    "writing a TZX block whose declared length disagrees with its payload"
                );
            }
            block.encode(&mut w)?;
        }
        Ok(w.into_bytes())
    }
}

impl Default for TzxFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tzx_header() -> Vec<u8> {
        let mut h = SIGNATURE.to_vec();
        h.push(0x1A);
        h.push(1); // major
        h.push(20); // minor
        h
    }

    #[test]
    fn parse_valid_header_empty() {
        let tzx = TzxFile::parse(&tzx_header()).expect("valid empty TZX");
        assert_eq!(tzx.major, 1);
        assert_eq!(tzx.minor, 20);
        assert!(tzx.blocks.is_empty());
    }

    #[test]
    fn parse_too_short() {
        assert!(TzxFile::parse(&[]).is_err());
        assert!(TzxFile::parse(&[0; 9]).is_err());
    }

    #[test]
    fn parse_bad_magic() {
        let mut data = tzx_header();
        data[0] = b'X';
        assert_eq!(TzxFile::parse(&data), Err(TzxError::BadSignature));
    }

    #[test]
    fn parse_bad_eot() {
        let mut data = tzx_header();
        data[7] = 0x00;
        assert_eq!(TzxFile::parse(&data), Err(TzxError::BadSignature));
    }

    #[test]
    fn parse_wrong_major_version() {
        let mut data = tzx_header();
        data[8] = 2;
        assert_eq!(TzxFile::parse(&data), Err(TzxError::BadVersion { major: 2 }));
    }

    #[test]
    fn minor_version_is_not_checked() {
        let mut data = tzx_header();
        data[9] = 99;
        let tzx = TzxFile::parse(&data).expect("minor revisions are compatible");
        assert_eq!(tzx.minor, 99);
    }

    /// The concrete end-to-end codec scenario: a standard speed block with
    /// three payload bytes and a one second pause.
    #[test]
    fn standard_speed_codec_scenario() {
        let mut file = TzxFile::new();
        file.blocks
            .push(TzxBlock::standard_speed(vec![0xFF, 0x01, 0x02], 1000));
        let bytes = file.write().expect("file should encode");

        let parsed = TzxFile::parse(&bytes).expect("file should parse");
        assert_eq!(parsed.blocks.len(), 1);
        match &parsed.blocks[0] {
            TzxBlock::StandardSpeed {
                pause_ms,
                data_length,
                data,
            } => {
                assert_eq!(parsed.blocks[0].block_id(), 0x10);
                assert_eq!(*pause_ms, 1000);
                assert_eq!(*data_length, 3);
                assert_eq!(data, &[0xFF, 0x01, 0x02]);
            }
            other => panic!("expected StandardSpeed, got {other:?}"),
        }
    }

    #[test]
    fn multiple_blocks_in_sequence() {
        let mut data = tzx_header();

        // $30: text description
        data.push(0x30);
        data.push(4);
        data.extend_from_slice(b"Test");

        // $12: pure tone
        data.push(0x12);
        data.extend_from_slice(&1000u16.to_le_bytes());
        data.extend_from_slice(&100u16.to_le_bytes());

        // $20: silence
        data.push(0x20);
        data.extend_from_slice(&500u16.to_le_bytes());

        let tzx = TzxFile::parse(&data).expect("multiple blocks");
        assert_eq!(tzx.blocks.len(), 3);
        assert!(matches!(tzx.blocks[0], TzxBlock::TextDescription { .. }));
        assert!(matches!(tzx.blocks[1], TzxBlock::PureTone { .. }));
        assert!(matches!(tzx.blocks[2], TzxBlock::Silence { .. }));
    }

    #[test]
    fn truncated_block_errors() {
        let mut data = tzx_header();
        data.push(0x10); // standard speed with nothing following
        assert!(matches!(
            TzxFile::parse(&data),
            Err(TzxError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_block_id_errors() {
        let mut data = tzx_header();
        data.push(0x7F);
        assert_eq!(
            TzxFile::parse(&data),
            Err(TzxError::UnknownBlockId {
                id: 0x7F,
                offset: 10
            })
        );
    }

    #[test]
    fn file_write_parse_round_trip() {
        let mut file = TzxFile::new();
        file.blocks.push(TzxBlock::TextDescription {
            text: "Side A".to_string(),
        });
        file.blocks
            .push(TzxBlock::standard_speed(vec![0x00, 0x03, b'R', b'U', b'N'], 1000));
        file.blocks.push(TzxBlock::PureTone {
            pulse_len: 2168,
            pulse_count: 8063,
        });
        file.blocks.push(TzxBlock::Silence { duration_ms: 0 });

        let bytes = file.write().expect("file should encode");
        let parsed = TzxFile::parse(&bytes).expect("file should parse");
        assert_eq!(parsed, file);
    }
}

//! The normalized playable tape block and the TZX projection onto it.

use format_tzx::TzxBlock;
use format_tzx::timing::{
    BIT_0_PL, BIT_1_PL, DATA_PILOT_COUNT, HEADER_PILOT_COUNT, PILOT_PL, SYNC_1_PL, SYNC_2_PL,
    TERM_SYNC,
};

/// A normalized playable unit: payload bytes plus the pulse widths that
/// carry them. Pulse widths are in T-states; a zero width (or a zero pilot
/// count) means the corresponding phase is skipped. `pause_ms` of zero
/// means "stop the tape" after the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeDataBlock {
    pub data: Vec<u8>,
    pub pause_ms: u32,
    pub pilot_pulse: u32,
    pub pilot_count: u32,
    pub sync1: u32,
    pub sync2: u32,
    pub zero_pulse: u32,
    pub one_pulse: u32,
    pub end_sync: u32,
    /// Bits played from the last byte (0 means all 8).
    pub used_bits: u8,
}

impl TapeDataBlock {
    /// Project a TZX block onto a playable block.
    ///
    /// Only Standard Speed, Turbo Speed and Pure Data blocks carry playable
    /// payloads; every other variant is metadata or flow control owned by
    /// the tape sequencer and projects to `None`.
    #[must_use]
    pub fn from_tzx(block: &TzxBlock) -> Option<Self> {
        match block {
            TzxBlock::StandardSpeed { pause_ms, data, .. } => {
                // ROM timing throughout. The flag byte picks the pilot tone:
                // $00 header blocks get the long pilot, data blocks the
                // short one.
                let flag = *data.first()?;
                Some(Self {
                    data: data.clone(),
                    pause_ms: u32::from(*pause_ms),
                    pilot_pulse: PILOT_PL,
                    pilot_count: if flag == 0x00 {
                        HEADER_PILOT_COUNT
                    } else {
                        DATA_PILOT_COUNT
                    },
                    sync1: SYNC_1_PL,
                    sync2: SYNC_2_PL,
                    zero_pulse: BIT_0_PL,
                    one_pulse: BIT_1_PL,
                    end_sync: TERM_SYNC,
                    used_bits: 8,
                })
            }
            TzxBlock::TurboSpeed {
                pilot_pulse,
                sync1,
                sync2,
                zero_pulse,
                one_pulse,
                pilot_count,
                used_bits,
                pause_ms,
                data,
                ..
            } => Some(Self {
                data: data.clone(),
                pause_ms: u32::from(*pause_ms),
                pilot_pulse: u32::from(*pilot_pulse),
                pilot_count: u32::from(*pilot_count),
                sync1: u32::from(*sync1),
                sync2: u32::from(*sync2),
                zero_pulse: u32::from(*zero_pulse),
                one_pulse: u32::from(*one_pulse),
                end_sync: 0,
                used_bits: *used_bits,
            }),
            TzxBlock::PureData {
                zero_pulse,
                one_pulse,
                used_bits,
                pause_ms,
                data,
                ..
            } => Some(Self {
                data: data.clone(),
                pause_ms: u32::from(*pause_ms),
                pilot_pulse: 0,
                pilot_count: 0,
                sync1: 0,
                sync2: 0,
                zero_pulse: u32::from(*zero_pulse),
                one_pulse: u32::from(*one_pulse),
                end_sync: 0,
                used_bits: *used_bits,
            }),
            _ => None,
        }
    }
}

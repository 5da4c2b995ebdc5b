//! Tape deck state machine.
//!
//! Holds the playable blocks projected from a TZX file and tracks which
//! block to deliver next to the playback engine.

use format_tzx::TzxFile;
use tracing::debug;

use crate::TapeDataBlock;

/// Virtual tape deck: projected playable blocks and a block cursor.
pub struct TapeDeck {
    tape: Option<Vec<TapeDataBlock>>,
    block_index: usize,
}

impl TapeDeck {
    /// Create an empty tape deck (no tape inserted).
    #[must_use]
    pub fn new() -> Self {
        Self {
            tape: None,
            block_index: 0,
        }
    }

    /// Insert a TZX tape into the deck. Data-bearing blocks are projected
    /// eagerly; metadata and flow-control blocks are not part of playback.
    pub fn insert(&mut self, tzx: &TzxFile) {
        let blocks: Vec<TapeDataBlock> = tzx
            .blocks
            .iter()
            .filter_map(TapeDataBlock::from_tzx)
            .collect();
        debug!(
            playable = blocks.len(),
            total = tzx.blocks.len(),
            "tape inserted"
        );
        self.tape = Some(blocks);
        self.block_index = 0;
    }

    /// Eject the current tape.
    pub fn eject(&mut self) {
        self.tape = None;
        self.block_index = 0;
    }

    /// Whether a tape is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.tape.is_some()
    }

    /// Return the next playable block and advance the cursor, or `None` if
    /// the tape ran out.
    pub fn next_block(&mut self) -> Option<&TapeDataBlock> {
        let tape = self.tape.as_ref()?;
        let block = tape.get(self.block_index)?;
        self.block_index += 1;
        Some(block)
    }

    /// Rewind the tape to the start.
    pub fn rewind(&mut self) {
        self.block_index = 0;
    }

    /// Current block index (0-based).
    #[must_use]
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    /// Total number of playable blocks on the tape.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.tape.as_ref().map_or(0, Vec::len)
    }
}

impl Default for TapeDeck {
    fn default() -> Self {
        Self::new()
    }
}

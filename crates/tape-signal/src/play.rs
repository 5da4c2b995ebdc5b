//! Tape playback: a data block rendered as EAR edge events.
//!
//! Each data bit is **two** equal-width pulses (one full square-wave
//! cycle); bits go out MSB-first, short pulses for 0 and long for 1. The
//! engine is pull-based: the host reports elapsed T-states through
//! [`PlaybackEngine::advance`] and receives the edges that occurred in that
//! span. It never blocks and never owns a thread, so identical blocks
//! always produce identical edge sequences.

use tracing::debug;

use crate::TapeDataBlock;

/// Playback position within the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPhase {
    /// No block loaded.
    None,
    /// Pilot tone: repeated equal pulses.
    Pilot,
    /// Sync pulses (first, then second).
    Sync,
    /// Data bits.
    Data,
    /// Terminating sync pulse.
    TermSync,
    /// Silence after the data. A zero-length pause holds here until
    /// [`PlaybackEngine::resume`].
    Pause,
    /// Block fully played.
    Completed,
}

/// An EAR line transition: the signal holds `level` from `tstate` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// T-states since the start of the current block.
    pub tstate: u64,
    /// Level after the edge.
    pub level: bool,
}

/// Pull-based playback state machine for one [`TapeDataBlock`] at a time.
///
/// The caller loads a block, then calls [`advance`](Self::advance) as
/// emulated time passes. When the phase reaches [`PlayPhase::Completed`]
/// the caller loads the next block.
pub struct PlaybackEngine {
    phase: PlayPhase,
    level: bool,
    /// T-states elapsed since the block was loaded.
    pos: u64,
    /// Absolute T-state of the next edge or phase boundary.
    next_edge: u64,

    // Parameters of the loaded block.
    data: Vec<u8>,
    pause_ms: u32,
    pilot_pulse: u32,
    sync1: u32,
    sync2: u32,
    zero_pulse: u32,
    one_pulse: u32,
    end_sync: u32,
    used_bits: u8,

    // Progress within the block.
    pilot_remaining: u32,
    sync2_pending: bool,
    byte_index: usize,
    /// Bit position (7 = MSB) currently going out.
    bit_index: u8,
    /// Bits still to send from the current byte, including the current one.
    bits_left: u8,
    second_half: bool,

    cpu_freq: u32,
}

impl PlaybackEngine {
    #[must_use]
    pub fn new(cpu_freq: u32) -> Self {
        Self {
            phase: PlayPhase::None,
            level: false,
            pos: 0,
            next_edge: 0,
            data: Vec::new(),
            pause_ms: 0,
            pilot_pulse: 0,
            sync1: 0,
            sync2: 0,
            zero_pulse: 0,
            one_pulse: 0,
            end_sync: 0,
            used_bits: 0,
            pilot_remaining: 0,
            sync2_pending: false,
            byte_index: 0,
            bit_index: 0,
            bits_left: 0,
            second_half: false,
            cpu_freq,
        }
    }

    /// Current playback phase.
    #[must_use]
    pub fn phase(&self) -> PlayPhase {
        self.phase
    }

    /// Current EAR level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level
    }

    /// T-states since the current block was loaded.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Load a block and arm its first phase. Resets the T-state origin.
    pub fn load(&mut self, block: TapeDataBlock) {
        debug!(
            bytes = block.data.len(),
            pilot_count = block.pilot_count,
            "loading tape block"
        );
        let TapeDataBlock {
            data,
            pause_ms,
            pilot_pulse,
            pilot_count,
            sync1,
            sync2,
            zero_pulse,
            one_pulse,
            end_sync,
            used_bits,
        } = block;
        self.data = data;
        self.pause_ms = pause_ms;
        self.pilot_pulse = pilot_pulse;
        self.sync1 = sync1;
        self.sync2 = sync2;
        self.zero_pulse = zero_pulse;
        self.one_pulse = one_pulse;
        self.end_sync = end_sync;
        self.used_bits = used_bits;

        self.level = false;
        self.pos = 0;
        self.next_edge = 0;
        self.pilot_remaining = pilot_count;

        if self.pilot_pulse > 0 && pilot_count > 0 {
            self.phase = PlayPhase::Pilot;
            self.next_edge = u64::from(self.pilot_pulse);
        } else if self.sync1 > 0 || self.sync2 > 0 {
            self.enter_sync();
        } else {
            self.enter_data();
        }
    }

    /// Eject or swap the tape: drop the block and all in-flight phase state.
    pub fn eject(&mut self) {
        self.phase = PlayPhase::None;
        self.data = Vec::new();
        self.level = false;
        self.pos = 0;
        self.next_edge = 0;
    }

    /// External resume signal for a stop-the-tape pause (`pause_ms == 0`).
    pub fn resume(&mut self) {
        if self.phase == PlayPhase::Pause && self.pause_ms == 0 {
            self.phase = PlayPhase::Completed;
        }
    }

    /// Advance the tape by `t_states` CPU cycles, collecting the edges that
    /// occur in that span.
    pub fn advance(&mut self, t_states: u64) -> Vec<EdgeEvent> {
        let mut edges = Vec::new();
        let target = self.pos + t_states;
        loop {
            match self.phase {
                PlayPhase::None | PlayPhase::Completed => {
                    self.pos = target;
                    break;
                }
                // A zero-length pause has no boundary: hold until resumed.
                PlayPhase::Pause if self.pause_ms == 0 => {
                    self.pos = target;
                    break;
                }
                _ => {}
            }
            if self.next_edge > target {
                self.pos = target;
                break;
            }
            self.pos = self.next_edge;
            self.step(&mut edges);
        }
        edges
    }

    /// Handle the boundary at `self.pos` and arm the next one.
    fn step(&mut self, edges: &mut Vec<EdgeEvent>) {
        match self.phase {
            PlayPhase::None | PlayPhase::Completed => {}
            PlayPhase::Pilot => {
                self.toggle(edges);
                self.pilot_remaining -= 1;
                if self.pilot_remaining == 0 {
                    self.enter_sync();
                } else {
                    self.next_edge = self.pos + u64::from(self.pilot_pulse);
                }
            }
            PlayPhase::Sync => {
                self.toggle(edges);
                if self.sync2_pending {
                    self.sync2_pending = false;
                    self.next_edge = self.pos + u64::from(self.sync2);
                } else {
                    self.enter_data();
                }
            }
            PlayPhase::Data => {
                self.toggle(edges);
                if !self.second_half {
                    self.second_half = true;
                    self.next_edge = self.pos + u64::from(self.current_bit_pulse());
                } else {
                    self.bits_left -= 1;
                    if self.bits_left > 0 {
                        self.bit_index -= 1;
                        self.second_half = false;
                        self.next_edge = self.pos + u64::from(self.current_bit_pulse());
                    } else if self.byte_index + 1 < self.data.len() {
                        self.byte_index += 1;
                        self.bit_index = 7;
                        self.bits_left = self.bits_in_byte(self.byte_index);
                        self.second_half = false;
                        self.next_edge = self.pos + u64::from(self.current_bit_pulse());
                    } else {
                        self.enter_term_sync();
                    }
                }
            }
            PlayPhase::TermSync => {
                self.toggle(edges);
                self.enter_pause();
            }
            PlayPhase::Pause => {
                // Timed pause over; a zero-length pause never reaches here.
                self.phase = PlayPhase::Completed;
                debug!("tape block complete");
            }
        }
    }

    fn toggle(&mut self, edges: &mut Vec<EdgeEvent>) {
        self.level = !self.level;
        edges.push(EdgeEvent {
            tstate: self.pos,
            level: self.level,
        });
    }

    fn enter_sync(&mut self) {
        if self.sync1 > 0 {
            self.phase = PlayPhase::Sync;
            self.sync2_pending = self.sync2 > 0;
            self.next_edge = self.pos + u64::from(self.sync1);
        } else if self.sync2 > 0 {
            self.phase = PlayPhase::Sync;
            self.sync2_pending = false;
            self.next_edge = self.pos + u64::from(self.sync2);
        } else {
            self.enter_data();
        }
    }

    fn enter_data(&mut self) {
        if self.data.is_empty() {
            self.enter_term_sync();
            return;
        }
        self.phase = PlayPhase::Data;
        self.byte_index = 0;
        self.bit_index = 7;
        self.bits_left = self.bits_in_byte(0);
        self.second_half = false;
        self.next_edge = self.pos + u64::from(self.current_bit_pulse());
    }

    fn enter_term_sync(&mut self) {
        if self.end_sync > 0 {
            self.phase = PlayPhase::TermSync;
            self.next_edge = self.pos + u64::from(self.end_sync);
        } else {
            self.enter_pause();
        }
    }

    fn enter_pause(&mut self) {
        // Silence: the EAR line rests low for the duration of the pause.
        // pause_ms == 0 is the stop-the-tape contract: no boundary is
        // armed and the engine holds here until resume().
        self.level = false;
        self.phase = PlayPhase::Pause;
        if self.pause_ms > 0 {
            self.next_edge = self.pos + ms_to_tstates(self.pause_ms, self.cpu_freq);
        }
    }

    /// Bits played from the byte at `index`; only the last byte may be
    /// partial, and its bits come from the top down.
    fn bits_in_byte(&self, index: usize) -> u8 {
        if index + 1 == self.data.len() && (1..8).contains(&self.used_bits) {
            self.used_bits
        } else {
            8
        }
    }

    /// Half-pulse width of the bit currently going out.
    fn current_bit_pulse(&self) -> u32 {
        let bit = (self.data[self.byte_index] >> self.bit_index) & 1;
        if bit == 1 {
            self.one_pulse
        } else {
            self.zero_pulse
        }
    }
}

/// Convert milliseconds to T-states at the given CPU clock.
fn ms_to_tstates(ms: u32, cpu_freq: u32) -> u64 {
    u64::from(ms) * u64::from(cpu_freq) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CPU_FREQ_48K;

    /// A small block with distinctive, fast timing for edge inspection.
    fn test_block(data: Vec<u8>) -> TapeDataBlock {
        TapeDataBlock {
            data,
            pause_ms: 10,
            pilot_pulse: 100,
            pilot_count: 4,
            sync1: 30,
            sync2: 40,
            zero_pulse: 10,
            one_pulse: 20,
            end_sync: 50,
            used_bits: 8,
        }
    }

    /// Run the engine to completion (bounded) and return every edge.
    fn play_to_end(engine: &mut PlaybackEngine) -> Vec<EdgeEvent> {
        let mut edges = Vec::new();
        for _ in 0..10_000 {
            if engine.phase() == PlayPhase::Completed {
                break;
            }
            edges.extend(engine.advance(100_000));
        }
        assert_eq!(engine.phase(), PlayPhase::Completed, "block never finished");
        edges
    }

    #[test]
    fn idle_engine_emits_nothing() {
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        assert_eq!(engine.phase(), PlayPhase::None);
        assert!(engine.advance(1_000_000).is_empty());
    }

    #[test]
    fn phase_sequence_for_full_block() {
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(test_block(vec![0xA5]));
        assert_eq!(engine.phase(), PlayPhase::Pilot);

        // 4 pilot pulses of 100 T-states.
        let edges = engine.advance(400);
        assert_eq!(edges.len(), 4);
        assert_eq!(engine.phase(), PlayPhase::Sync);

        // Sync pulses: 30 + 40 T-states.
        let edges = engine.advance(70);
        assert_eq!(edges.len(), 2);
        assert_eq!(engine.phase(), PlayPhase::Data);

        // $A5 = 1010_0101: four 1-bits (2x20) and four 0-bits (2x10).
        let edges = engine.advance(4 * 40 + 4 * 20);
        assert_eq!(edges.len(), 16);
        assert_eq!(engine.phase(), PlayPhase::TermSync);

        let edges = engine.advance(50);
        assert_eq!(edges.len(), 1);
        assert_eq!(engine.phase(), PlayPhase::Pause);

        // 10 ms at 3.5 MHz.
        let edges = engine.advance(35_000);
        assert!(edges.is_empty());
        assert_eq!(engine.phase(), PlayPhase::Completed);
    }

    #[test]
    fn pilot_edges_are_evenly_spaced() {
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(test_block(vec![0x00]));
        let edges = engine.advance(400);
        let times: Vec<u64> = edges.iter().map(|e| e.tstate).collect();
        assert_eq!(times, vec![100, 200, 300, 400]);
        // Levels alternate starting from low.
        assert!(edges[0].level);
        assert!(!edges[1].level);
        assert!(edges[2].level);
        assert!(!edges[3].level);
    }

    #[test]
    fn data_bits_go_out_msb_first() {
        // $80: one 1-bit then seven 0-bits.
        let mut block = test_block(vec![0x80]);
        block.pilot_pulse = 0;
        block.pilot_count = 0;
        block.sync1 = 0;
        block.sync2 = 0;
        block.end_sync = 0;
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(block);
        assert_eq!(engine.phase(), PlayPhase::Data);

        let edges = play_to_end(&mut engine);
        assert_eq!(edges.len(), 16);
        // First bit: two pulses of one_pulse (20), then 0-bits of 10.
        assert_eq!(edges[0].tstate, 20);
        assert_eq!(edges[1].tstate, 40);
        assert_eq!(edges[2].tstate, 50);
        assert_eq!(edges[3].tstate, 60);
    }

    #[test]
    fn used_bits_limits_the_last_byte() {
        let mut block = test_block(vec![0xFF, 0xFF]);
        block.used_bits = 2;
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(block);
        let edges = play_to_end(&mut engine);
        // 8 bits from the first byte + 2 from the last, 2 edges per bit,
        // plus pilot (4), sync (2) and term sync (1).
        assert_eq!(edges.len(), 4 + 2 + (8 + 2) * 2 + 1);
    }

    #[test]
    fn sync_is_never_skipped_when_lengths_are_positive() {
        let mut block = test_block(vec![0x55]);
        block.pilot_pulse = 0;
        block.pilot_count = 0;
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(block);
        assert_eq!(engine.phase(), PlayPhase::Sync);

        let edges = engine.advance(70);
        assert_eq!(edges.len(), 2);
        assert_eq!(engine.phase(), PlayPhase::Data);
    }

    #[test]
    fn empty_data_block_skips_to_term_sync() {
        let mut block = test_block(vec![]);
        block.pilot_pulse = 0;
        block.pilot_count = 0;
        block.sync1 = 0;
        block.sync2 = 0;
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(block);
        assert_eq!(engine.phase(), PlayPhase::TermSync);
    }

    #[test]
    fn zero_pause_stops_the_tape_until_resumed() {
        let mut block = test_block(vec![0x01]);
        block.pause_ms = 0;
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(block);

        // Far more T-states than the block needs: must still hold in Pause.
        let _ = engine.advance(10_000_000);
        assert_eq!(engine.phase(), PlayPhase::Pause);
        let _ = engine.advance(10_000_000);
        assert_eq!(engine.phase(), PlayPhase::Pause);

        engine.resume();
        assert_eq!(engine.phase(), PlayPhase::Completed);
    }

    #[test]
    fn resume_is_ignored_outside_a_held_pause() {
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(test_block(vec![0x01]));
        engine.resume();
        assert_eq!(engine.phase(), PlayPhase::Pilot);
    }

    #[test]
    fn playback_is_deterministic() {
        let block = test_block(vec![0xDE, 0xAD, 0xBE, 0xEF]);

        let mut first = PlaybackEngine::new(CPU_FREQ_48K);
        first.load(block.clone());
        let a = play_to_end(&mut first);

        let mut second = PlaybackEngine::new(CPU_FREQ_48K);
        second.load(block);
        let b = play_to_end(&mut second);

        assert_eq!(a, b);
    }

    #[test]
    fn advance_chunking_does_not_change_the_edges() {
        let block = test_block(vec![0x5A, 0xC3]);

        let mut coarse = PlaybackEngine::new(CPU_FREQ_48K);
        coarse.load(block.clone());
        let a = play_to_end(&mut coarse);

        // One T-state at a time, like a ticking CPU core.
        let mut fine = PlaybackEngine::new(CPU_FREQ_48K);
        fine.load(block);
        let mut b = Vec::new();
        for _ in 0..200_000 {
            if fine.phase() == PlayPhase::Completed {
                break;
            }
            b.extend(fine.advance(1));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn eject_resets_mid_block() {
        let mut engine = PlaybackEngine::new(CPU_FREQ_48K);
        engine.load(test_block(vec![0x01, 0x02]));
        let _ = engine.advance(250);
        engine.eject();
        assert_eq!(engine.phase(), PlayPhase::None);
        assert!(!engine.level());
        assert_eq!(engine.position(), 0);
        assert!(engine.advance(1_000).is_empty());
    }
}

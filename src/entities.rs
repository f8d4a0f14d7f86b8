//! Game state types: pure data, no logic.
//!
//! Note behaviour lives in `note`, frame logic in `compute`.

use crate::config::Rules;
use crate::note::Note;

// ── Per-frame input ───────────────────────────────────────────────────────────

/// Everything one frame's event drain produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Lanes whose key went down this frame, in arrival order.
    pub presses: Vec<usize>,
    pub quit: bool,
}

#[derive(Clone, Debug)]
pub enum FrameOutcome {
    Continue(GameState),
    Quit,
}

// ── Master game state ─────────────────────────────────────────────────────────

/// The entire game state.  Cloneable so pure update functions can
/// return a new copy without mutating the original.
#[derive(Clone, Debug)]
pub struct GameState {
    pub notes: Vec<Note>,
    pub score: u32,
    /// Notes that fell through, when the miss policy counts them.
    pub misses: u32,
    /// Countdown per lane; the lane is lit while positive.
    pub highlights: Vec<u32>,
    /// Indices into `notes` hit since the last respawn round.
    pub respawn_batch: Vec<usize>,
    /// Frames since the last respawn round.
    pub respawn_counter: u32,
    pub frame: u64,
    pub rules: Rules,
}

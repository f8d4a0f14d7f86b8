//! Pure game-logic functions.
//!
//! Every public function that works on a whole game takes an immutable
//! reference to the current `GameState` (and, where needed, an RNG handle)
//! and returns a brand-new `GameState`.  Side effects are limited to the
//! injected RNG.  `place_notes` and `resolve_overlaps` work on plain note
//! lists so they can be driven on their own.

use std::cmp::Reverse;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::assets::SpriteSize;
use crate::config::{JudgeMode, MissPolicy, OverlapMode, PlacementMode, Rules};
use crate::entities::{FrameInput, FrameOutcome, GameState};
use crate::note::Note;

// ── Constructors ─────────────────────────────────────────────────────────────

/// Build the initial game state: a fresh batch of notes and zeroed counters.
///
/// `sizes` holds one sprite size per lane.
pub fn init_state(rules: Rules, sizes: &[SpriteSize], rng: &mut impl Rng) -> GameState {
    GameState {
        notes: place_notes(&rules, sizes, rng),
        score: 0,
        misses: 0,
        highlights: vec![0; rules.lanes],
        respawn_batch: Vec::new(),
        respawn_counter: 0,
        frame: 0,
        rules,
    }
}

// ── Placement ────────────────────────────────────────────────────────────────

fn lane_sequence(rules: &Rules, rng: &mut impl Rng) -> Vec<usize> {
    let (count, lanes) = (rules.note_count, rules.lanes);
    match rules.placement {
        PlacementMode::Random => (0..count).map(|_| rng.gen_range(0..lanes)).collect(),
        PlacementMode::RoundRobin => (0..count).map(|i| i % lanes).collect(),
        PlacementMode::Shuffle => {
            let mut deck: Vec<usize> = (0..lanes).collect();
            let mut out = Vec::with_capacity(count);
            while out.len() < count {
                deck.shuffle(rng);
                let missing = count - out.len();
                out.extend(deck.iter().copied().take(missing));
            }
            out
        }
    }
}

/// Distance between the tops of two consecutive notes of one lane: at least
/// `min_separation`, and enough that the pair clears `overlap_buffer`.
fn lane_gap(rules: &Rules, size: SpriteSize) -> i32 {
    rules.min_separation.max(size.height + rules.overlap_buffer)
}

/// Create `rules.note_count` notes stacked above the screen.
///
/// Each note starts at least `min_separation` above the previous note of its
/// lane, and far enough above it that the two never overlap.  No note starts
/// lower than `(i + 1) * spawn_step` above the screen, so later notes arrive
/// later.
///
/// # Panics
///
/// If `sizes` does not hold one entry per lane.
pub fn place_notes(rules: &Rules, sizes: &[SpriteSize], rng: &mut impl Rng) -> Vec<Note> {
    assert_eq!(sizes.len(), rules.lanes, "one sprite size per lane");

    let mut last_y: Vec<Option<i32>> = vec![None; rules.lanes];
    lane_sequence(rules, rng)
        .into_iter()
        .enumerate()
        .map(|(i, lane)| {
            let below_previous = match last_y[lane] {
                Some(prev) => prev - lane_gap(rules, sizes[lane]),
                None => -rules.min_separation,
            };
            let stacked = -(i as i32 + 1) * rules.spawn_step;
            let y = below_previous.min(stacked);
            last_y[lane] = Some(y);
            Note::new(lane, y, sizes[lane], rules)
        })
        .collect()
}

// ── Overlap resolution ───────────────────────────────────────────────────────

/// Push overlapping same-lane notes apart.  Notes only ever move up.
pub fn resolve_overlaps(notes: &mut [Note], rules: &Rules) {
    match rules.overlap_mode {
        OverlapMode::SinglePass => single_pass(notes, rules.overlap_buffer),
        OverlapMode::SortAndSweep => sort_and_sweep(notes, rules.overlap_buffer, rules.lanes),
    }
}

/// Every ordered pair once, in index order.  A push that creates a new
/// overlap is left for the next frame.
fn single_pass(notes: &mut [Note], buffer: i32) {
    for a in 0..notes.len() {
        if !notes[a].active {
            continue;
        }
        for b in 0..notes.len() {
            if a != b && notes[a].overlaps_with(&notes[b], buffer) {
                let anchor_y = notes[a].y;
                notes[b].push_above(anchor_y, buffer);
            }
        }
    }
}

/// Per lane, walk the notes from the bottom up and keep each one at least
/// `buffer` above the one before it.  Chains settle within the frame.
fn sort_and_sweep(notes: &mut [Note], buffer: i32, lanes: usize) {
    for lane in 0..lanes {
        let mut order: Vec<usize> = (0..notes.len())
            .filter(|&i| notes[i].lane() == lane && notes[i].active && notes[i].height() > 0)
            .collect();
        order.sort_by_key(|&i| Reverse(notes[i].y));

        // A push can lift a note past the next one in the original order;
        // the ceiling check also covers a note left below its neighbour.
        for pair in order.windows(2) {
            let (below, above) = (pair[0], pair[1]);
            let ceiling = notes[below].y - notes[above].height() - buffer;
            if notes[above].y > ceiling {
                let anchor_y = notes[below].y;
                notes[above].push_above(anchor_y, buffer);
            }
        }
    }
}

// ── Respawn ──────────────────────────────────────────────────────────────────

fn respawn_due(state: &mut GameState, rng: &mut impl Rng) {
    let rules = state.rules;
    state.respawn_counter += 1;
    if state.respawn_counter < rules.respawn_cadence {
        return;
    }
    state.respawn_counter = 0;

    for idx in std::mem::take(&mut state.respawn_batch) {
        state.notes[idx].reset(&rules, rng);
        for other in 0..state.notes.len() {
            if other != idx && state.notes[idx].overlaps_with(&state.notes[other], rules.overlap_buffer)
            {
                let anchor_y = state.notes[other].y;
                state.notes[idx].push_above(anchor_y, rules.overlap_buffer);
            }
        }
    }
}

/// Count one frame towards the next respawn round; on the round's frame,
/// bring every hit note back above the screen clear of its lane mates.
pub fn advance_respawn(state: &GameState, rng: &mut impl Rng) -> GameState {
    let mut next = state.clone();
    respawn_due(&mut next, rng);
    next
}

// ── Judgment ─────────────────────────────────────────────────────────────────

fn judge(state: &mut GameState, lane: usize) {
    let rules = state.rules;
    if lane >= rules.lanes {
        return;
    }
    state.highlights[lane] = rules.highlight_frames;

    let eligible: Vec<usize> = state
        .notes
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            n.lane() == lane && n.is_in_hit_zone(rules.hit_zone_top, rules.hit_zone_height)
        })
        .map(|(i, _)| i)
        .collect();

    let credited: Vec<usize> = match rules.judge_mode {
        JudgeMode::AllInZone => eligible,
        JudgeMode::Nearest => {
            let zone_center = rules.hit_zone_top + rules.hit_zone_height / 2;
            eligible
                .into_iter()
                .min_by_key(|&i| (state.notes[i].center_y() - zone_center).abs())
                .into_iter()
                .collect()
        }
    };

    for idx in credited {
        debug!(lane, note = idx, y = state.notes[idx].y, "Note hit");
        state.notes[idx].hit();
        state.respawn_batch.push(idx);
        state.score = state.score.saturating_add(rules.reward);
    }
}

/// The key of `lane` went down: light the lane and credit what sits in the
/// hit zone.  A press with nothing in the zone only lights the lane.
pub fn press_lane(state: &GameState, lane: usize) -> GameState {
    let mut next = state.clone();
    judge(&mut next, lane);
    next
}

// ── Per-frame tick ───────────────────────────────────────────────────────────

fn apply_misses(state: &mut GameState, missed: u32) {
    if missed == 0 {
        return;
    }
    match state.rules.miss_policy {
        MissPolicy::Silent => {}
        MissPolicy::Count => state.misses += missed,
        MissPolicy::Penalize => {
            state.misses += missed;
            state.score = state
                .score
                .saturating_sub(missed.saturating_mul(state.rules.miss_penalty));
        }
    }
}

/// Advance the simulation by one frame: fall, overlap correction, respawn.
/// All randomness comes through `rng` so callers control determinism.
pub fn tick(state: &GameState, rng: &mut impl Rng) -> GameState {
    let mut next = state.clone();
    next.frame += 1;
    let rules = next.rules;

    let missed = next
        .notes
        .iter_mut()
        .map(|n| n.update(&rules, rng))
        .filter(|&m| m)
        .count() as u32;
    apply_misses(&mut next, missed);

    resolve_overlaps(&mut next.notes, &rules);
    respawn_due(&mut next, rng);
    next
}

/// Run one whole frame.  A quit request ends the game before any judgment
/// or movement happens.
pub fn step(state: &GameState, input: &FrameInput, rng: &mut impl Rng) -> FrameOutcome {
    if input.quit {
        return FrameOutcome::Quit;
    }

    let mut next = state.clone();
    for h in next.highlights.iter_mut() {
        *h = h.saturating_sub(1);
    }
    for &lane in &input.presses {
        judge(&mut next, lane);
    }
    FrameOutcome::Continue(tick(&next, rng))
}

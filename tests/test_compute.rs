use astro_beats::assets::SpriteSize;
use astro_beats::compute::*;
use astro_beats::config::{JudgeMode, MissPolicy, OverlapMode, PlacementMode, Rules};
use astro_beats::entities::*;
use astro_beats::note::Note;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::fmt::MakeWriter;

const SIZE: SpriteSize = SpriteSize { width: 50, height: 50 };

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn note(lane: usize, y: i32) -> Note {
    Note::new(lane, y, SIZE, &Rules::default())
}

fn make_state(notes: Vec<Note>) -> GameState {
    with_rules(notes, Rules::default())
}

fn with_rules(notes: Vec<Note>, rules: Rules) -> GameState {
    GameState {
        notes,
        score: 0,
        misses: 0,
        highlights: vec![0; rules.lanes],
        respawn_batch: Vec::new(),
        respawn_counter: 0,
        frame: 0,
        rules,
    }
}

fn continue_state(outcome: FrameOutcome) -> GameState {
    match outcome {
        FrameOutcome::Continue(s) => s,
        FrameOutcome::Quit => panic!("Expected the frame to continue"),
    }
}

// ── init_state ────────────────────────────────────────────────────────────────

#[test]
fn init_state_counters_start_at_zero() {
    let s = init_state(Rules::default(), &[SIZE; 4], &mut seeded_rng());
    assert_eq!(s.notes.len(), 8);
    assert_eq!(s.score, 0);
    assert_eq!(s.misses, 0);
    assert_eq!(s.frame, 0);
    assert_eq!(s.highlights, vec![0; 4]);
    assert!(s.respawn_batch.is_empty());
    assert!(s.notes.iter().all(|n| n.active));
}

// ── place_notes ───────────────────────────────────────────────────────────────

#[test]
fn placement_keeps_same_lane_separation() {
    let rules = Rules::default();
    for seed in 0..50 {
        let notes = place_notes(&rules, &[SIZE; 4], &mut StdRng::seed_from_u64(seed));
        for (i, a) in notes.iter().enumerate() {
            for b in notes.iter().skip(i + 1) {
                if a.lane() == b.lane() {
                    assert!(
                        (a.y - b.y).abs() >= rules.min_separation,
                        "seed {seed}: {} vs {}",
                        a.y,
                        b.y
                    );
                }
            }
        }
    }
}

#[test]
fn placement_stacks_upward_in_spawn_order() {
    let rules = Rules::default();
    let notes = place_notes(&rules, &[SIZE; 4], &mut seeded_rng());
    for (i, n) in notes.iter().enumerate() {
        assert!(n.y <= -(i as i32 + 1) * rules.spawn_step);
        assert!(n.lane() < 4);
    }
}

#[test]
fn placement_round_robin_positions() {
    let rules = Rules {
        placement: PlacementMode::RoundRobin,
        ..Rules::default()
    };
    let notes = place_notes(&rules, &[SIZE; 4], &mut seeded_rng());
    let lanes: Vec<usize> = notes.iter().map(|n| n.lane()).collect();
    let ys: Vec<i32> = notes.iter().map(|n| n.y).collect();
    assert_eq!(lanes, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    assert_eq!(ys, vec![-150, -150, -150, -200, -300, -300, -350, -400]);
}

#[test]
fn placement_shuffle_deals_every_lane_per_round() {
    let rules = Rules {
        placement: PlacementMode::Shuffle,
        ..Rules::default()
    };
    let notes = place_notes(&rules, &[SIZE; 4], &mut seeded_rng());
    for round in notes.chunks(4) {
        let mut lanes: Vec<usize> = round.iter().map(|n| n.lane()).collect();
        lanes.sort();
        assert_eq!(lanes, vec![0, 1, 2, 3]);
    }
}

#[test]
fn placement_uses_each_lane_sprite_height() {
    let rules = Rules {
        placement: PlacementMode::RoundRobin,
        note_count: 4,
        ..Rules::default()
    };
    let sizes = [
        SpriteSize { width: 50, height: 60 },
        SpriteSize { width: 40, height: 20 },
        SpriteSize { width: 50, height: 60 },
        SpriteSize { width: 50, height: 60 },
    ];
    let notes = place_notes(&rules, &sizes, &mut seeded_rng());
    assert_eq!(notes[1].height(), 20);
    assert_eq!(notes[1].x(), 200 + 100 - 20);
}

#[test]
fn placement_clears_overlap_buffer_for_tall_sprites() {
    // Three-row lane art is 60 px tall: 150 px between tops is not enough
    let tall = SpriteSize { width: 50, height: 60 };
    let round_robin = Rules {
        placement: PlacementMode::RoundRobin,
        ..Rules::default()
    };
    let notes = place_notes(&round_robin, &[tall; 4], &mut seeded_rng());
    let ys: Vec<i32> = notes.iter().map(|n| n.y).collect();
    assert_eq!(ys, vec![-150, -150, -150, -200, -310, -310, -350, -400]);

    for placement in [PlacementMode::Random, PlacementMode::RoundRobin, PlacementMode::Shuffle] {
        let rules = Rules {
            placement,
            note_count: 16,
            ..Rules::default()
        };
        for seed in 0..50 {
            let notes = place_notes(&rules, &[tall; 4], &mut StdRng::seed_from_u64(seed));
            for (i, a) in notes.iter().enumerate() {
                for b in notes.iter().skip(i + 1) {
                    assert!(
                        !a.overlaps_with(b, rules.overlap_buffer),
                        "{placement:?} seed {seed}: lane {} y {} vs {}",
                        a.lane(),
                        a.y,
                        b.y
                    );
                }
            }
        }
    }
}

#[test]
#[should_panic]
fn placement_rejects_missing_sizes() {
    place_notes(&Rules::default(), &[SIZE; 2], &mut seeded_rng());
}

// ── resolve_overlaps ──────────────────────────────────────────────────────────

#[test]
fn single_pass_pushes_second_note_above_first() {
    let rules = Rules::default();
    let mut notes = vec![note(0, 100), note(0, 120)];
    resolve_overlaps(&mut notes, &rules);
    assert_eq!(notes[0].y, 100);
    assert_eq!(notes[1].y, -50);
    assert!(!notes[0].overlaps_with(&notes[1], rules.overlap_buffer));
}

#[test]
fn overlap_ignores_other_lanes_and_inactive_notes() {
    let rules = Rules::default();
    let mut hit = note(0, 110);
    hit.hit();
    let mut notes = vec![note(0, 100), note(1, 120), hit];
    resolve_overlaps(&mut notes, &rules);
    assert_eq!(notes[1].y, 120);
    assert_eq!(notes[2].y, 110);
}

#[test]
fn sort_and_sweep_settles_a_chain_in_one_frame() {
    let rules = Rules {
        overlap_mode: OverlapMode::SortAndSweep,
        ..Rules::default()
    };
    let mut notes = vec![
        note(0, 270),
        note(0, 300),
        note(0, 260),
        note(0, 290),
        note(0, 280),
    ];
    resolve_overlaps(&mut notes, &rules);

    let mut ys: Vec<i32> = notes.iter().map(|n| n.y).collect();
    ys.sort();
    assert_eq!(ys, vec![-300, -150, 0, 150, 300]);
    for (i, a) in notes.iter().enumerate() {
        for b in notes.iter().skip(i + 1) {
            assert!(!a.overlaps_with(b, rules.overlap_buffer));
        }
    }
}

#[test]
fn overlap_resolution_only_moves_notes_up() {
    for mode in [OverlapMode::SinglePass, OverlapMode::SortAndSweep] {
        let rules = Rules {
            overlap_mode: mode,
            ..Rules::default()
        };
        let mut rng = seeded_rng();
        for _ in 0..100 {
            let mut notes: Vec<Note> = (0..8)
                .map(|_| note(rng.gen_range(0..2), rng.gen_range(-400..500)))
                .collect();
            let before: Vec<i32> = notes.iter().map(|n| n.y).collect();
            resolve_overlaps(&mut notes, &rules);
            for (n, y) in notes.iter().zip(before) {
                assert!(n.y <= y, "{mode:?} moved a note down");
                assert!(n.active);
            }
        }
    }
}

// ── press_lane ────────────────────────────────────────────────────────────────

#[test]
fn press_hits_note_in_zone() {
    // lane 1 note with centre 510 sits inside 500..520
    let s = make_state(vec![note(0, 100), note(1, 485)]);
    let s2 = press_lane(&s, 1);
    assert_eq!(s2.score, 100);
    assert!(!s2.notes[1].active);
    assert_eq!(s2.respawn_batch, vec![1]);
    assert_eq!(s2.highlights[1], 10);
    assert!(s2.notes[0].active);
}

#[test]
fn press_with_empty_zone_only_lights_lane() {
    let s = make_state(vec![note(1, 100)]);
    let s2 = press_lane(&s, 1);
    assert_eq!(s2.score, 0);
    assert!(s2.respawn_batch.is_empty());
    assert!(s2.notes[0].active);
    assert_eq!(s2.highlights, vec![0, 10, 0, 0]);
}

#[test]
fn press_ignores_other_lanes() {
    let s = make_state(vec![note(2, 485)]);
    let s2 = press_lane(&s, 1);
    assert_eq!(s2.score, 0);
    assert!(s2.notes[0].active);
}

#[test]
fn press_out_of_range_lane_is_ignored() {
    let s = make_state(vec![note(0, 485)]);
    let s2 = press_lane(&s, 9);
    assert_eq!(s2.score, 0);
    assert_eq!(s2.highlights, vec![0; 4]);
}

#[test]
fn press_credits_every_note_in_zone() {
    let s = make_state(vec![note(1, 476), note(1, 494)]);
    let s2 = press_lane(&s, 1);
    assert_eq!(s2.score, 200);
    assert_eq!(s2.respawn_batch, vec![0, 1]);
    assert!(s2.notes.iter().all(|n| !n.active));
}

#[test]
fn nearest_mode_credits_one_note() {
    let rules = Rules {
        judge_mode: JudgeMode::Nearest,
        ..Rules::default()
    };
    // zone centre 510: first note centre 500, second 515
    let s = with_rules(vec![note(1, 475), note(1, 490)], rules);
    let s2 = press_lane(&s, 1);
    assert_eq!(s2.score, 100);
    assert!(s2.notes[0].active);
    assert!(!s2.notes[1].active);
    assert_eq!(s2.respawn_batch, vec![1]);
}

#[test]
fn nearest_mode_tie_goes_to_first_note() {
    let rules = Rules {
        judge_mode: JudgeMode::Nearest,
        ..Rules::default()
    };
    // centres 505 and 515, both 5 from 510
    let s = with_rules(vec![note(3, 480), note(3, 490)], rules);
    let s2 = press_lane(&s, 3);
    assert!(!s2.notes[0].active);
    assert!(s2.notes[1].active);
}

#[test]
fn press_does_not_mutate_original() {
    let s = make_state(vec![note(1, 485)]);
    let _ = press_lane(&s, 1);
    assert_eq!(s.score, 0);
    assert!(s.notes[0].active);
    assert!(s.respawn_batch.is_empty());
}

// ── advance_respawn ───────────────────────────────────────────────────────────

#[test]
fn respawn_waits_for_cadence() {
    let mut s = make_state(vec![note(0, 485)]);
    s = press_lane(&s, 0);
    s.respawn_counter = 10;
    let s2 = advance_respawn(&s, &mut seeded_rng());
    assert_eq!(s2.respawn_counter, 11);
    assert!(!s2.notes[0].active);
    assert_eq!(s2.respawn_batch, vec![0]);
}

#[test]
fn respawn_resets_batch_on_cadence() {
    let mut s = make_state(vec![note(0, 485)]);
    s = press_lane(&s, 0);
    s.respawn_counter = 59;
    let s2 = advance_respawn(&s, &mut seeded_rng());
    assert_eq!(s2.respawn_counter, 0);
    assert!(s2.notes[0].active);
    assert!((-300..=-50).contains(&s2.notes[0].y));
    assert!(s2.respawn_batch.is_empty());
    assert_eq!(s2.notes[0].lane(), 0);
}

#[test]
fn respawned_note_clears_lane_mates() {
    // Any height drawn from [-300, -50] is within 100 px of a note at -175,
    // so the respawned note always ends up pushed above it.
    let mut s = make_state(vec![note(2, 485), note(2, -175)]);
    s = press_lane(&s, 2);
    s.respawn_counter = 59;
    let s2 = advance_respawn(&s, &mut seeded_rng());
    assert_eq!(s2.notes[0].y, -325);
    assert!(!s2.notes[0].overlaps_with(&s2.notes[1], 100));
}

#[test]
fn hit_note_returns_within_cadence() {
    let mut rng = seeded_rng();
    let mut s = make_state(vec![note(0, 485)]);
    s.respawn_counter = 17;
    let input = FrameInput {
        presses: vec![0],
        quit: false,
    };
    s = continue_state(step(&s, &input, &mut rng));
    assert!(!s.notes[0].active);

    let mut frames_inactive = 1;
    while !s.notes[0].active {
        s = continue_state(step(&s, &FrameInput::default(), &mut rng));
        frames_inactive += 1;
        assert!(frames_inactive <= 60, "still inactive after 60 frames");
    }
}

#[test]
fn hit_right_after_a_respawn_round_returns_within_cadence() {
    let mut rng = seeded_rng();
    let mut s = make_state(vec![note(0, 485)]);
    assert_eq!(s.respawn_counter, 0);
    let input = FrameInput {
        presses: vec![0],
        quit: false,
    };
    s = continue_state(step(&s, &input, &mut rng));
    assert!(!s.notes[0].active);
    assert_eq!(s.respawn_counter, 1);

    let cadence = s.rules.respawn_cadence;
    let mut frames = 1;
    while !s.notes[0].active {
        s = continue_state(step(&s, &FrameInput::default(), &mut rng));
        frames += 1;
        assert!(frames <= cadence, "still inactive after {cadence} frames");
    }
    assert_eq!(frames, cadence);
}

// ── tick ──────────────────────────────────────────────────────────────────────

#[test]
fn tick_increments_frame_and_moves_notes() {
    let mut s = make_state(vec![note(0, 0), note(1, -200)]);
    s.frame = 5;
    let s2 = tick(&s, &mut seeded_rng());
    assert_eq!(s2.frame, 6);
    assert_eq!(s2.notes[0].y, 10);
    assert_eq!(s2.notes[1].y, -190);
}

#[test]
fn tick_leaves_hit_notes_in_place() {
    let mut s = make_state(vec![note(0, 485)]);
    s = press_lane(&s, 0);
    let s2 = tick(&s, &mut seeded_rng());
    assert_eq!(s2.notes[0].y, 485);
    assert!(!s2.notes[0].active);
}

#[test]
fn silent_miss_changes_nothing() {
    let mut s = make_state(vec![note(0, 595)]);
    s.score = 300;
    let s2 = tick(&s, &mut seeded_rng());
    assert_eq!(s2.score, 300);
    assert_eq!(s2.misses, 0);
    assert!(s2.notes[0].y < 0);
    assert!(s2.notes[0].active);
}

#[test]
fn counted_miss_tallies() {
    let rules = Rules {
        miss_policy: MissPolicy::Count,
        ..Rules::default()
    };
    let mut s = with_rules(vec![note(0, 595), note(1, 598)], rules);
    s.score = 300;
    let s2 = tick(&s, &mut seeded_rng());
    assert_eq!(s2.misses, 2);
    assert_eq!(s2.score, 300);
}

#[test]
fn penalized_miss_costs_points_without_underflow() {
    let rules = Rules {
        miss_policy: MissPolicy::Penalize,
        ..Rules::default()
    };
    let mut s = with_rules(vec![note(0, 595)], rules);
    s.score = 200;
    let s2 = tick(&s, &mut seeded_rng());
    assert_eq!(s2.score, 150);
    assert_eq!(s2.misses, 1);

    s.score = 20;
    let s3 = tick(&s, &mut seeded_rng());
    assert_eq!(s3.score, 0);
}

// ── step ──────────────────────────────────────────────────────────────────────

#[test]
fn step_quit_stops_before_judgment() {
    let s = make_state(vec![note(0, 485)]);
    let input = FrameInput {
        presses: vec![0],
        quit: true,
    };
    assert!(matches!(step(&s, &input, &mut seeded_rng()), FrameOutcome::Quit));
    assert_eq!(s.score, 0);
    assert!(s.notes[0].active);
}

#[test]
fn step_judges_before_notes_fall() {
    // centre 520 is the zone's last pixel; after falling it would be 530
    let s = make_state(vec![note(0, 495)]);
    let input = FrameInput {
        presses: vec![0],
        quit: false,
    };
    let s2 = continue_state(step(&s, &input, &mut seeded_rng()));
    assert_eq!(s2.score, 100);
    assert_eq!(s2.frame, 1);
}

#[test]
fn step_counts_highlights_down() {
    let mut s = make_state(vec![note(0, 0)]);
    s.highlights = vec![5, 0, 1, 0];
    let s2 = continue_state(step(&s, &FrameInput::default(), &mut seeded_rng()));
    assert_eq!(s2.highlights, vec![4, 0, 0, 0]);

    let input = FrameInput {
        presses: vec![1],
        quit: false,
    };
    let s3 = continue_state(step(&s2, &input, &mut seeded_rng()));
    assert_eq!(s3.highlights, vec![3, 10, 0, 0]);
}

#[test]
fn score_never_decreases_under_default_rules() {
    let mut rng = seeded_rng();
    let mut s = init_state(Rules::default(), &[SIZE; 4], &mut rng);
    let lanes: Vec<usize> = s.notes.iter().map(|n| n.lane()).collect();
    let mut last = 0;
    for frame in 0..2000 {
        let presses = if frame % 3 == 0 {
            vec![rng.gen_range(0..4)]
        } else {
            Vec::new()
        };
        s = continue_state(step(&s, &FrameInput { presses, quit: false }, &mut rng));
        assert!(s.score >= last);
        last = s.score;
        let now: Vec<usize> = s.notes.iter().map(|n| n.lane()).collect();
        assert_eq!(now, lanes);
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn each_credited_note_is_logged() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(capture.clone())
        .finish();

    let s = make_state(vec![note(1, 475), note(1, 485), note(2, 485)]);
    let s2 = tracing::subscriber::with_default(subscriber, || press_lane(&s, 1));
    assert_eq!(s2.score, 200);

    let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert_eq!(log.matches("Note hit").count(), 2);
    assert!(log.contains("lane=1"));
    assert!(!log.contains("lane=2"));
}

//! The falling note.
//!
//! A note never changes lane and is never destroyed: a miss or a hit recycles
//! it in place through [`Note::reset`].

use rand::Rng;

use crate::assets::SpriteSize;
use crate::config::Rules;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    lane: usize,
    x: i32,
    /// Top edge.  Negative while above the visible area.
    pub y: i32,
    height: i32,
    speed: i32,
    pub active: bool,
}

impl Note {
    /// Create an active note centred horizontally in `lane`.
    pub fn new(lane: usize, y: i32, sprite: SpriteSize, rules: &Rules) -> Self {
        let lane_width = rules.lane_width();
        Self {
            lane,
            x: lane as i32 * lane_width + lane_width / 2 - sprite.width / 2,
            y,
            height: sprite.height,
            speed: rules.note_speed,
            active: true,
        }
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }

    /// Fall one frame.  Returns `true` when the note left the screen and was
    /// recycled above it, i.e. it was missed.
    pub fn update(&mut self, rules: &Rules, rng: &mut impl Rng) -> bool {
        if !self.active {
            return false;
        }
        self.y += self.speed;
        if self.y > rules.screen_height {
            self.reset(rules, rng);
            return true;
        }
        false
    }

    /// The vertical centre, not the top edge, has to be inside
    /// `[top, top + height]`.
    pub fn is_in_hit_zone(&self, top: i32, height: i32) -> bool {
        let center = self.center_y();
        self.active && top <= center && center <= top + height
    }

    pub fn hit(&mut self) {
        self.active = false;
    }

    /// Reactivate at a random height above the screen.
    pub fn reset(&mut self, rules: &Rules, rng: &mut impl Rng) {
        self.y = rng.gen_range(rules.respawn_min_y..=rules.respawn_max_y);
        self.active = true;
    }

    /// Same lane, both active, and closer than `buffer` pixels.  Zero-height
    /// notes never overlap anything.
    pub fn overlaps_with(&self, other: &Note, buffer: i32) -> bool {
        if self.lane != other.lane || !self.active || !other.active {
            return false;
        }
        if self.height == 0 || other.height == 0 {
            return false;
        }
        self.y < other.y + other.height + buffer && other.y < self.y + self.height + buffer
    }

    /// Move directly above a note whose top edge is at `anchor_y`, leaving
    /// exactly `buffer` pixels between the two.
    pub fn push_above(&mut self, anchor_y: i32, buffer: i32) {
        self.y = anchor_y - self.height - buffer;
    }
}

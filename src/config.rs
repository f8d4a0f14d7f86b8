//! Game configuration.
//!
//! Everything tunable lives in one [`GameConfig`] record.  Every field has a
//! default, so a TOML file only needs the keys it wants to change:
//!
//! ```toml
//! [rules]
//! note_speed = 8
//! judge_mode = "nearest"
//!
//! [keys]
//! letters = "asdf"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

// ── Policy knobs ──────────────────────────────────────────────────────────────

/// What happens when a note falls past the bottom without being hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissPolicy {
    /// Recycle the note and say nothing.
    #[default]
    Silent,
    /// Recycle and tally it in `GameState::misses`.
    Count,
    /// Tally it and subtract `miss_penalty` from the score.
    Penalize,
}

/// How many notes a single key press may credit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum JudgeMode {
    /// Every note of the lane inside the hit zone is hit and scored.
    #[default]
    AllInZone,
    /// Only the note closest to the centre of the hit zone.
    Nearest,
}

/// Lane selection for the initial batch of notes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementMode {
    /// Uniform random lane per note; lanes may cluster.
    #[default]
    Random,
    /// Lane `i % lanes`.
    RoundRobin,
    /// Lanes dealt from a deck reshuffled every `lanes` notes.
    Shuffle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapMode {
    /// One sweep over all ordered pairs; chains settle over later frames.
    #[default]
    SinglePass,
    /// Per-lane sort by height, resolves transitive overlaps in one frame.
    SortAndSweep,
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Numeric constants and policies of the note engine.
///
/// All positions are logical pixels on a `screen_width` x `screen_height`
/// field; y grows downward and negative y is above the visible area.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub lanes: usize,
    pub screen_width: i32,
    pub screen_height: i32,
    /// Pixels a note falls per frame.
    pub note_speed: i32,
    /// Notes created at game start.
    pub note_count: usize,
    pub hit_zone_top: i32,
    pub hit_zone_height: i32,
    /// Points per successful hit.
    pub reward: u32,
    /// Points removed per miss under [`MissPolicy::Penalize`].
    pub miss_penalty: u32,
    /// Frames a lane stays lit after its key is pressed.
    pub highlight_frames: u32,
    /// Frames between respawn rounds.
    pub respawn_cadence: u32,
    /// Minimum vertical gap kept between two notes of the same lane.
    pub overlap_buffer: i32,
    /// Minimum distance between same-lane starts in the initial placement.
    pub min_separation: i32,
    /// Distance between consecutive notes of the initial placement.
    pub spawn_step: i32,
    pub respawn_min_y: i32,
    pub respawn_max_y: i32,
    pub miss_policy: MissPolicy,
    pub judge_mode: JudgeMode,
    pub placement: PlacementMode,
    pub overlap_mode: OverlapMode,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            lanes: 4,
            screen_width: 800,
            screen_height: 600,
            note_speed: 10,
            note_count: 8,
            hit_zone_top: 500,
            hit_zone_height: 20,
            reward: 100,
            miss_penalty: 50,
            highlight_frames: 10,
            respawn_cadence: 60,
            overlap_buffer: 100,
            min_separation: 150,
            spawn_step: 50,
            respawn_min_y: -300,
            respawn_max_y: -50,
            miss_policy: MissPolicy::Silent,
            judge_mode: JudgeMode::AllInZone,
            placement: PlacementMode::Random,
            overlap_mode: OverlapMode::SinglePass,
        }
    }
}

impl Rules {
    /// Width of one lane in logical pixels.
    pub fn lane_width(&self) -> i32 {
        self.screen_width / self.lanes.max(1) as i32
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidConfig(msg));

        if self.lanes == 0 {
            return fail("lanes must be at least 1".into());
        }
        if self.screen_width <= 0 || self.screen_height <= 0 {
            return fail(format!(
                "screen size {}x{} must be positive",
                self.screen_width, self.screen_height
            ));
        }
        if self.screen_width < self.lanes as i32 {
            return fail(format!(
                "screen_width {} is too narrow for {} lanes",
                self.screen_width, self.lanes
            ));
        }
        if self.note_speed <= 0 {
            return fail(format!("note_speed {} must be positive", self.note_speed));
        }
        if self.hit_zone_height <= 0 {
            return fail("hit zone is empty".into());
        }
        if self.hit_zone_top < 0 || self.hit_zone_top + self.hit_zone_height > self.screen_height {
            return fail(format!(
                "hit zone {}..{} lies outside the screen",
                self.hit_zone_top,
                self.hit_zone_top + self.hit_zone_height
            ));
        }
        if self.respawn_cadence == 0 {
            return fail("respawn_cadence must be at least 1 frame".into());
        }
        if self.respawn_min_y > self.respawn_max_y {
            return fail(format!(
                "respawn range [{}, {}] is inverted",
                self.respawn_min_y, self.respawn_max_y
            ));
        }
        if self.respawn_max_y >= 0 {
            return fail(format!(
                "respawn_max_y {} must be above the screen (negative)",
                self.respawn_max_y
            ));
        }
        if self.overlap_buffer < 0 || self.min_separation < 0 || self.spawn_step <= 0 {
            return fail("overlap_buffer, min_separation and spawn_step must not be negative".into());
        }
        Ok(())
    }
}

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Two alternative key sets; the n-th character of each string drives lane n.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub letters: String,
    pub numbers: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            letters: "dfjk".to_string(),
            numbers: "1234".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn validate(&self, lanes: usize) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, set) in [("letters", &self.letters), ("numbers", &self.numbers)] {
            let count = set.chars().count();
            if count != lanes {
                return Err(Error::InvalidKeys(format!(
                    "{name} has {count} keys but there are {lanes} lanes"
                )));
            }
            for c in set.chars() {
                if c.is_whitespace() || c.is_control() {
                    return Err(Error::InvalidKeys(format!("{name} contains a blank key")));
                }
                if !seen.insert(c.to_ascii_lowercase()) {
                    return Err(Error::InvalidKeys(format!("key {c:?} is bound twice")));
                }
            }
        }
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Target frame rate of the game loop.
    pub fps: u32,
    /// Directory holding `lane{N}.txt` and `background{1,2}.txt`.
    pub assets_dir: PathBuf,
    /// Milliseconds between background switches.
    pub pulse_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            assets_dir: PathBuf::from("assets"),
            pulse_interval_ms: 500,
        }
    }
}

// ── Whole file ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rules: Rules,
    pub keys: KeyBindings,
    pub display: DisplayConfig,
}

impl GameConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        self.keys.validate(self.rules.lanes)?;
        if self.display.fps == 0 {
            return Err(Error::InvalidConfig("fps must be at least 1".into()));
        }
        Ok(())
    }
}

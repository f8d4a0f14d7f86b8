//! Text-art assets with procedural fallbacks.
//!
//! Loading never fails from the caller's point of view: every missing,
//! unreadable or empty file is replaced by a generated placeholder so the
//! note engine always receives a sprite with a nonzero size.

use std::path::Path;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Logical pixels per terminal column.
pub const PX_PER_COL: i32 = 10;
/// Logical pixels per terminal row.
pub const PX_PER_ROW: i32 = 20;

/// Background layers are generated at the size of the default field.
const BACKGROUND_COLS: usize = 80;
const BACKGROUND_ROWS: usize = 30;

const STAR_GLYPHS: [char; 4] = ['.', '·', '+', '*'];

/// The only thing the note engine knows about a sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    rows: Vec<String>,
    columns: usize,
}

impl Sprite {
    /// Build a sprite from text art.  Returns `None` when there is nothing
    /// visible in `text`.
    pub fn from_text(text: &str) -> Option<Self> {
        let mut rows: Vec<String> = text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        while rows.last().is_some_and(|r| r.trim().is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return None;
        }
        let columns = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if columns == 0 {
            return None;
        }
        Some(Self { rows, columns })
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn size(&self) -> SpriteSize {
        SpriteSize {
            width: self.columns as i32 * PX_PER_COL,
            height: self.rows.len() as i32 * PX_PER_ROW,
        }
    }
}

pub fn load_sprite(path: &Path) -> Result<Sprite> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Sprite::from_text(&text).ok_or_else(|| Error::EmptySprite(path.to_path_buf()))
}

// ── Fallbacks ─────────────────────────────────────────────────────────────────

/// A solid circle, five columns by three rows.
pub fn fallback_note() -> Sprite {
    Sprite {
        rows: vec![" ▄█▄ ".into(), "█████".into(), " ▀█▀ ".into()],
        columns: 5,
    }
}

/// A random starfield with one planet somewhere in it.
pub fn fallback_background(rng: &mut impl Rng) -> Sprite {
    let mut grid = vec![vec![' '; BACKGROUND_COLS]; BACKGROUND_ROWS];

    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            if rng.gen_ratio(1, 25) {
                *cell = STAR_GLYPHS[rng.gen_range(0..STAR_GLYPHS.len())];
            }
        }
    }

    // Cells are twice as tall as wide, so halve dx to keep it round.
    let radius: i32 = rng.gen_range(2..=4);
    let cx = rng.gen_range(radius * 2..BACKGROUND_COLS as i32 - radius * 2);
    let cy = rng.gen_range(radius..BACKGROUND_ROWS as i32 - radius);
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let dx = (c as i32 - cx) / 2;
            let dy = r as i32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                *cell = '░';
            }
        }
    }

    Sprite {
        rows: grid.into_iter().map(|r| r.into_iter().collect()).collect(),
        columns: BACKGROUND_COLS,
    }
}

fn load_or<F>(path: &Path, fallback: F) -> Sprite
where
    F: FnOnce() -> Sprite,
{
    match load_sprite(path) {
        Ok(sprite) => {
            debug!("Loaded {:?} ({}x{})", path, sprite.columns, sprite.rows.len());
            sprite
        }
        Err(e) => {
            warn!("{}, using generated placeholder", e);
            fallback()
        }
    }
}

// ── Pack ──────────────────────────────────────────────────────────────────────

/// One sprite per lane plus the two background layers.
#[derive(Clone, Debug)]
pub struct AssetPack {
    pub notes: Vec<Sprite>,
    pub backgrounds: [Sprite; 2],
}

impl AssetPack {
    /// Load `lane{1..=lanes}.txt` and `background{1,2}.txt` from `dir`.
    pub fn load(dir: &Path, lanes: usize, rng: &mut impl Rng) -> Self {
        let notes = (1..=lanes)
            .map(|n| load_or(&dir.join(format!("lane{n}.txt")), fallback_note))
            .collect();
        let first = load_or(&dir.join("background1.txt"), || fallback_background(rng));
        let second = load_or(&dir.join("background2.txt"), || fallback_background(rng));
        Self {
            notes,
            backgrounds: [first, second],
        }
    }

    pub fn note_sizes(&self) -> Vec<SpriteSize> {
        self.notes.iter().map(Sprite::size).collect()
    }
}

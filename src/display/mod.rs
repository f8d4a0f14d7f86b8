//! Rendering layer. All terminal I/O lives here.
//!
//! Each function receives a mutable writer and an immutable view of the
//! game state.  No game logic is performed; this module only translates
//! state into terminal commands.  Logical pixels are scaled onto whatever
//! size the terminal currently has.

mod backdrop;

pub use backdrop::Backdrop;

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal,
    QueueableCommand,
};

use astro_beats::assets::AssetPack;
use astro_beats::config::{KeyBindings, MissPolicy, Rules};
use astro_beats::entities::GameState;

// ── Colour palette ────────────────────────────────────────────────────────────

const LANE_COLORS: [Color; 4] = [Color::Cyan, Color::Magenta, Color::Yellow, Color::Green];
const C_DIVIDER: Color = Color::DarkBlue;
const C_HIT_ZONE: Color = Color::DarkGrey;
const C_HUD_SCORE: Color = Color::Yellow;
const C_HUD_MISSES: Color = Color::Red;
const C_TITLE: Color = Color::Cyan;
const C_HINT: Color = Color::DarkGrey;

fn lane_color(lane: usize) -> Color {
    LANE_COLORS[lane % LANE_COLORS.len()]
}

/// What the renderer needs besides the game state.
pub struct View<'a> {
    pub assets: &'a AssetPack,
    pub backdrop: &'a Backdrop,
    pub keys: &'a KeyBindings,
    pub frame: u64,
    pub elapsed_ms: u64,
}

/// Playfield geometry for the current terminal size: row 0 is the HUD, the
/// last row the controls hint, everything in between is the field.
struct Field {
    cols: u16,
    rows: u16,
    screen_width: i32,
    screen_height: i32,
}

impl Field {
    fn new(rules: &Rules) -> std::io::Result<Self> {
        let (cols, height) = terminal::size()?;
        Ok(Self {
            cols,
            rows: height.saturating_sub(2),
            screen_width: rules.screen_width,
            screen_height: rules.screen_height,
        })
    }

    fn col(&self, x: i32) -> i32 {
        x * self.cols as i32 / self.screen_width
    }

    /// Terminal row of logical `y`, counting the HUD row.
    fn row(&self, y: i32) -> i32 {
        1 + (y * self.rows as i32).div_euclid(self.screen_height)
    }

    fn contains_row(&self, row: i32) -> bool {
        row >= 1 && row <= self.rows as i32
    }
}

/// Print `text` at (`col`, `row`), clipped to the terminal width.
fn put<W: Write>(out: &mut W, field: &Field, col: i32, row: i32, text: &str) -> std::io::Result<()> {
    if !field.contains_row(row) {
        return Ok(());
    }
    let skip = (-col).max(0) as usize;
    let start = col.max(0);
    let room = (field.cols as i32 - start).max(0) as usize;
    let visible: String = text.chars().skip(skip).take(room).collect();
    if visible.is_empty() {
        return Ok(());
    }
    out.queue(cursor::MoveTo(start as u16, row as u16))?;
    out.queue(Print(visible))?;
    Ok(())
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Render one complete game frame.
pub fn render<W: Write>(out: &mut W, state: &GameState, view: &View) -> std::io::Result<()> {
    let field = Field::new(&state.rules)?;
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let pulse = view.backdrop.pulse(view.elapsed_ms);
    view.backdrop
        .draw(out, field.cols, 1, field.rows, view.frame, pulse)?;

    draw_lanes(out, &field, state)?;
    draw_hit_zone(out, &field, state)?;
    draw_notes(out, &field, state, view.assets)?;
    draw_hud(out, &field, state)?;
    draw_controls_hint(out, &field, view.keys)?;

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, field.rows + 1))?;
    out.flush()?;
    Ok(())
}

/// Render the start screen.
pub fn render_menu<W: Write>(
    out: &mut W,
    rules: &Rules,
    view: &View,
) -> std::io::Result<()> {
    let field = Field::new(rules)?;
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let pulse = view.backdrop.pulse(view.elapsed_ms);
    view.backdrop
        .draw(out, field.cols, 1, field.rows, view.frame, pulse)?;

    let keys = key_legend(view.keys);
    let lines: &[(&str, Color)] = &[
        ("★  A S T R O B E A T S  ★", C_TITLE),
        ("", C_HINT),
        ("Click or press ENTER to start", Color::White),
        ("", C_HINT),
        (&keys, Color::Grey),
        ("Hit a lane while its planet crosses the line", C_HINT),
        ("ESC : Quit", C_HINT),
    ];

    let cx = field.cols as i32 / 2;
    let start_row = field.rows as i32 / 2 - lines.len() as i32 / 2;
    for (i, (msg, color)) in lines.iter().enumerate() {
        out.queue(style::SetForegroundColor(*color))?;
        let col = cx - msg.chars().count() as i32 / 2;
        put(out, &field, col, start_row + i as i32, msg)?;
    }

    out.queue(style::ResetColor)?;
    out.flush()?;
    Ok(())
}

// ── Lanes & hit zone ──────────────────────────────────────────────────────────

fn draw_lanes<W: Write>(out: &mut W, field: &Field, state: &GameState) -> std::io::Result<()> {
    let lane_width = state.rules.lane_width();
    out.queue(style::SetForegroundColor(C_DIVIDER))?;
    for lane in 1..state.rules.lanes {
        let col = field.col(lane as i32 * lane_width);
        for row in 1..=field.rows as i32 {
            put(out, field, col, row, "│")?;
        }
    }
    Ok(())
}

fn draw_hit_zone<W: Write>(out: &mut W, field: &Field, state: &GameState) -> std::io::Result<()> {
    let rules = &state.rules;
    let lane_width = rules.lane_width();
    let top = field.row(rules.hit_zone_top);
    let bottom = field.row(rules.hit_zone_top + rules.hit_zone_height).max(top);

    for lane in 0..rules.lanes {
        let left = field.col(lane as i32 * lane_width) + 1;
        let right = field.col((lane as i32 + 1) * lane_width);
        let span = (right - left).max(0) as usize;
        let lit = state.highlights.get(lane).copied().unwrap_or(0) > 0;
        let (glyph, color) = if lit {
            ("█", lane_color(lane))
        } else {
            ("═", C_HIT_ZONE)
        };
        out.queue(style::SetForegroundColor(color))?;
        let bar = glyph.repeat(span);
        for row in top..=bottom {
            put(out, field, left, row, &bar)?;
        }
    }
    Ok(())
}

// ── Notes ─────────────────────────────────────────────────────────────────────

fn draw_notes<W: Write>(
    out: &mut W,
    field: &Field,
    state: &GameState,
    assets: &AssetPack,
) -> std::io::Result<()> {
    for note in state.notes.iter().filter(|n| n.active) {
        let Some(sprite) = assets.notes.get(note.lane()) else {
            continue;
        };
        out.queue(style::SetForegroundColor(lane_color(note.lane())))?;
        let col = field.col(note.x());
        let top = field.row(note.y);
        for (i, line) in sprite.rows().iter().enumerate() {
            put(out, field, col, top + i as i32, line)?;
        }
    }
    Ok(())
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(out: &mut W, field: &Field, state: &GameState) -> std::io::Result<()> {
    // Score, left
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(style::SetForegroundColor(C_HUD_SCORE))?;
    out.queue(Print(format!("Score: {:>8}", state.score)))?;

    // Title, centred
    let title = "AstroBeats";
    let tx = (field.cols / 2).saturating_sub(title.len() as u16 / 2);
    out.queue(cursor::MoveTo(tx, 0))?;
    out.queue(style::SetForegroundColor(C_TITLE))?;
    out.queue(Print(title))?;

    // Misses, right; only when they are counted
    if state.rules.miss_policy != MissPolicy::Silent {
        let text = format!("Misses: {}", state.misses);
        let rx = field.cols.saturating_sub(text.len() as u16 + 1);
        out.queue(cursor::MoveTo(rx, 0))?;
        out.queue(style::SetForegroundColor(C_HUD_MISSES))?;
        out.queue(Print(&text))?;
    }
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn key_legend(keys: &KeyBindings) -> String {
    let spaced = |s: &str| {
        s.chars()
            .map(|c| c.to_ascii_uppercase().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!("{} / {} : Hit lanes", spaced(&keys.letters), spaced(&keys.numbers))
}

fn draw_controls_hint<W: Write>(out: &mut W, field: &Field, keys: &KeyBindings) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, field.rows + 1))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(format!("{}   ESC : Quit", key_legend(keys))))?;
    Ok(())
}

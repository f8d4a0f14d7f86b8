//! Pulsing two-layer starfield behind the lanes.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    QueueableCommand,
};

use astro_beats::assets::AssetPack;

/// Far layer colours, one per background; the pulse crossfades between them.
const FAR_PALETTE: [(u8, u8, u8); 2] = [(40, 50, 120), (100, 40, 120)];
const NEAR_STAR: (u8, u8, u8) = (210, 210, 255);

/// Frames per row of scroll.
const FAR_SCROLL: u64 = 8;
const NEAR_SCROLL: u64 = 3;

/// Fraction of each pulse interval spent crossfading to the next layer.
const CROSSFADE: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    /// Background shown as the far layer.
    pub active: usize,
    /// 0.0 = pure `active` colour, 1.0 = fully faded to the other one.
    pub blend: f32,
    /// Triangle wave peaking mid-interval; drives near-star brightness.
    pub glow: f32,
}

pub struct Backdrop {
    layers: [Vec<Vec<char>>; 2],
    pulse_interval_ms: u64,
}

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f32) -> Color {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color::Rgb {
        r: mix(a.0, b.0),
        g: mix(a.1, b.1),
        b: mix(a.2, b.2),
    }
}

fn scale(c: (u8, u8, u8), k: f32) -> Color {
    let s = |x: u8| (x as f32 * k).clamp(0.0, 255.0) as u8;
    Color::Rgb {
        r: s(c.0),
        g: s(c.1),
        b: s(c.2),
    }
}

impl Backdrop {
    pub fn new(assets: &AssetPack, pulse_interval_ms: u64) -> Self {
        let grid = |i: usize| -> Vec<Vec<char>> {
            assets.backgrounds[i]
                .rows()
                .iter()
                .map(|r| r.chars().collect())
                .collect()
        };
        Self {
            layers: [grid(0), grid(1)],
            pulse_interval_ms: pulse_interval_ms.max(1),
        }
    }

    pub fn pulse(&self, elapsed_ms: u64) -> Pulse {
        let interval = self.pulse_interval_ms;
        let active = ((elapsed_ms / interval) % 2) as usize;
        let t = (elapsed_ms % interval) as f32 / interval as f32;
        let blend = if t > 1.0 - CROSSFADE {
            (t - (1.0 - CROSSFADE)) / CROSSFADE
        } else {
            0.0
        };
        Pulse {
            active,
            blend,
            glow: 1.0 - (2.0 * t - 1.0).abs(),
        }
    }

    /// Fill `rows` terminal rows starting at `top`.  The far layer is the
    /// pulsed background; bright stars of the other one drift past faster.
    pub fn draw<W: Write>(
        &self,
        out: &mut W,
        cols: u16,
        top: u16,
        rows: u16,
        frame: u64,
        pulse: Pulse,
    ) -> std::io::Result<()> {
        let far = &self.layers[pulse.active];
        let near = &self.layers[1 - pulse.active];
        if far.is_empty() || near.is_empty() {
            return Ok(());
        }

        out.queue(style::SetForegroundColor(lerp(
            FAR_PALETTE[pulse.active],
            FAR_PALETTE[1 - pulse.active],
            pulse.blend,
        )))?;
        let far_offset = (frame / FAR_SCROLL) as usize;
        for row in 0..rows {
            let src = &far[(row as usize + far_offset * (far.len() - 1)) % far.len()];
            let line: String = (0..cols as usize)
                .map(|c| src.get(c % src.len().max(1)).copied().unwrap_or(' '))
                .collect();
            out.queue(cursor::MoveTo(0, top + row))?;
            out.queue(Print(line))?;
        }

        out.queue(style::SetForegroundColor(scale(NEAR_STAR, 0.5 + 0.5 * pulse.glow)))?;
        let near_offset = (frame / NEAR_SCROLL) as usize;
        for row in 0..rows {
            let src = &near[(row as usize + near_offset * (near.len() - 1)) % near.len()];
            for (c, &glyph) in src.iter().enumerate().take(cols as usize) {
                if glyph == '*' || glyph == '+' {
                    out.queue(cursor::MoveTo(c as u16, top + row))?;
                    out.queue(Print(glyph))?;
                }
            }
        }
        Ok(())
    }
}

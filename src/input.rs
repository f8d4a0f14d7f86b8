//! Keyboard and mouse events to game actions.

use std::collections::HashMap;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::config::KeyBindings;
use crate::entities::FrameInput;
use crate::error::Result;

/// A lane key counts as still held if it was seen within this many frames.
/// Terminals without key-release reporting deliver auto-repeat as plain
/// presses, and the OS repeat interval is well under this window at 60 FPS.
pub const HOLD_WINDOW: u64 = 4;

/// Character → lane lookup covering both key sets.
#[derive(Clone, Debug)]
pub struct KeyMap {
    lanes: HashMap<char, usize>,
}

impl KeyMap {
    pub fn new(bindings: &KeyBindings, lanes: usize) -> Result<Self> {
        bindings.validate(lanes)?;
        let mut map = HashMap::new();
        for set in [&bindings.letters, &bindings.numbers] {
            for (lane, c) in set.chars().enumerate() {
                map.insert(c.to_ascii_lowercase(), lane);
                map.insert(c.to_ascii_uppercase(), lane);
            }
        }
        Ok(Self { lanes: map })
    }

    pub fn lane_for(&self, code: &KeyCode) -> Option<usize> {
        match code {
            KeyCode::Char(c) => self.lanes.get(c).copied(),
            _ => None,
        }
    }
}

/// Escape, or Ctrl+C since raw mode swallows SIGINT.
pub fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('C') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

// ── Held-key tracking ─────────────────────────────────────────────────────────

/// Remembers the frame each lane key was last seen so holding a key does not
/// produce a stream of hits.
#[derive(Clone, Debug, Default)]
pub struct PressTracker {
    last_seen: HashMap<usize, u64>,
}

impl PressTracker {
    /// Record a press.  Returns `true` only for a fresh key-down.
    pub fn key_down(&mut self, lane: usize, frame: u64) -> bool {
        let fresh = self
            .last_seen
            .get(&lane)
            .map(|&last| frame.saturating_sub(last) > HOLD_WINDOW)
            .unwrap_or(true);
        self.last_seen.insert(lane, frame);
        fresh
    }

    pub fn refresh(&mut self, lane: usize, frame: u64) {
        self.last_seen.insert(lane, frame);
    }

    pub fn release(&mut self, lane: usize) {
        self.last_seen.remove(&lane);
    }
}

/// Turn the events queued since the last frame into one [`FrameInput`].
///
/// Stops at the first quit signal; whatever is queued behind it is never
/// looked at.
pub fn drain_events<I>(events: I, keymap: &KeyMap, tracker: &mut PressTracker, frame: u64) -> FrameInput
where
    I: IntoIterator<Item = Event>,
{
    let mut input = FrameInput::default();
    for event in events {
        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Release && is_quit(&key) {
            input.quit = true;
            break;
        }
        let Some(lane) = keymap.lane_for(&key.code) else {
            continue;
        };
        match key.kind {
            KeyEventKind::Press => {
                if tracker.key_down(lane, frame) {
                    input.presses.push(lane);
                }
            }
            KeyEventKind::Repeat => tracker.refresh(lane, frame),
            KeyEventKind::Release => tracker.release(lane),
        }
    }
    input
}

// ── Menu ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Start,
    Quit,
}

/// Enter, Space or any mouse click starts the game.
pub fn menu_action(event: &Event) -> Option<MenuAction> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if is_quit(key) {
                Some(MenuAction::Quit)
            } else if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                Some(MenuAction::Start)
            } else {
                None
            }
        }
        Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
            Some(MenuAction::Start)
        }
        _ => None,
    }
}

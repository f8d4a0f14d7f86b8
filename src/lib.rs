//! AstroBeats: a four-lane falling-note rhythm game for the terminal.
//!
//! The library holds the note engine and its supporting layers; the binary
//! owns the terminal, the frame loop and the drawing.

pub mod assets;
pub mod compute;
pub mod config;
pub mod entities;
pub mod error;
pub mod input;
pub mod note;

pub use error::{Error, Result};

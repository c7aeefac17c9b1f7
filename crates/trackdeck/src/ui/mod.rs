//! Ratatui UI loop.
//!
//! Keys:
//! - Up/Down: move row selection
//! - Left/Right: previous/next page
//! - /: edit search (debounced)
//! - g / a / s: cycle genre, artist, sort
//! - Enter or Space: play/pause selected track
//! - x: close the player
//! - v: selection mode, Space marks, A marks the page
//! - c / e / d / u: create, edit, delete, upload audio
//! - r: retry/refresh
//! - l logs, h help, q quit

mod app;
mod render;
mod view_model;
mod widgets;

pub(crate) use app::run_tui;

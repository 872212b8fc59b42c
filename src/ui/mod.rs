//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop, sentinel check and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `tasks` - Background task spawning and panic capture
//! - `render` - View rendering dispatch and shared row pieces
//! - `timeline` - Timeline list widget
//! - `feeds` - Tab bar and per-feed lists
//! - `status` - Status bar widget
//! - `help` - Keybinding overlay

mod events;
mod feeds;
mod help;
mod input;
mod loop_runner;
mod render;
mod status;
mod tasks;
mod timeline;

// Re-export the public API
pub use loop_runner::{run, Action};

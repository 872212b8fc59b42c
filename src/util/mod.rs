//! Small helpers shared by the UI and CLI.
//!
//! - **Text**: width-aware truncation and terminal-safe sanitizing
//! - **Time**: relative timestamps for story ages
//! - **Links**: scheme check before opening a browser

mod links;
mod text;
mod time;

pub use links::{open_link, validate_link_for_open, LinkError};
pub use text::{display_width, sanitize_line, truncate_to_width};
pub use time::format_relative_time;

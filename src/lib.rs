//! Terminal client for aggregated headlines and a clustered story timeline.
//!
//! - [`api`] - HTTP client for the headlines server
//! - [`color`] - adaptive feed header colors
//! - [`theme`] - light/dark theme and its live signal
//! - [`timeline`] - paged timeline loading and the scroll sentinel
//! - [`storage`] - SQLite preference store
//! - [`app`], [`ui`] - terminal application

pub mod api;
pub mod app;
pub mod color;
pub mod config;
pub mod storage;
pub mod theme;
pub mod timeline;
pub mod ui;
pub mod util;

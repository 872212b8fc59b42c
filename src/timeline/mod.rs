//! Paged timeline loading driven by a scroll sentinel.

pub mod loader;
pub mod sentinel;

pub use loader::{LoadState, PageOutcome, PageRequest, TimelineLoader, TimelineSource};
pub use sentinel::ScrollSentinel;

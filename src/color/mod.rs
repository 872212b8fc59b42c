//! Adaptive feed header colors.
//!
//! - [`rgb`] - color value type and CSS parsing/formatting
//! - [`contrast`] - WCAG luminance, contrast ratio and YIQ brightness
//! - [`extract`] - dominant color of a favicon
//! - [`cache`] - session-wide per-feed color cache with in-flight tracking
//! - [`resolver`] - priority policy tying the above together

pub mod cache;
pub mod contrast;
pub mod extract;
pub mod resolver;
pub mod rgb;

pub use cache::{BeginResolve, ColorSource, FeedColorEntry, HeaderColorCache, ResolveGuard};
pub use contrast::{
    contrast_ratio, is_bright, is_legible, luminance, pick_text_color, yiq_brightness,
    MIN_CONTRAST,
};
pub use extract::{decode_data_url, extract_color, Extracted, ExtractionError};
pub use resolver::{
    fallback_pair, neutral_accent, ColorBackend, FeedHeader, HeaderColorResolver,
    HeaderStyleSink, HeaderStyles,
};
pub use rgb::{ColorPair, ColorParseError, Rgb, TextColor};

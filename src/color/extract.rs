//! Dominant-color extraction from favicon images.
//!
//! The image is decoded, downscaled to at most [`SAMPLE_SIZE`] pixels per
//! side, and every remaining pixel is dropped into a 4-bit-per-channel
//! histogram. Near-transparent, near-white and near-black pixels are not
//! counted. The fullest bucket wins and its mean color is returned.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GenericImageView;
use thiserror::Error;

use super::rgb::Rgb;

/// Longest side of the sampled thumbnail.
const SAMPLE_SIZE: u32 = 32;

/// Pixels with alpha below this are ignored.
const MIN_ALPHA: u8 = 125;

/// A pixel whose every channel is at or above this is near-white.
const NEAR_WHITE: u8 = 240;

/// A pixel whose every channel is at or below this is near-black.
const NEAR_BLACK: u8 = 20;

/// Largest favicon accepted for extraction.
pub const MAX_FAVICON_SIZE: usize = 1024 * 1024;

const BUCKETS: usize = 16 * 16 * 16;

/// Why a favicon could not be sampled.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image has zero width or height")]
    EmptyImage,
    #[error("Invalid favicon data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Favicon unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a successful sampling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracted {
    /// The most common usable color.
    Dominant(Rgb),
    /// Every opaque pixel was near-white or near-black; use a neutral accent.
    Neutral,
}

#[derive(Clone, Copy, Default)]
struct Bucket {
    count: u32,
    r: u32,
    g: u32,
    b: u32,
}

/// Decode `bytes` and pick the representative color.
///
/// The decoded image is dropped before returning. Decoding is CPU-bound;
/// async callers should run this on a blocking thread.
pub fn extract_color(bytes: &[u8]) -> Result<Extracted, ExtractionError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractionError::EmptyImage);
    }

    let sample = if width > SAMPLE_SIZE || height > SAMPLE_SIZE {
        decoded.thumbnail(SAMPLE_SIZE, SAMPLE_SIZE).to_rgba8()
    } else {
        decoded.to_rgba8()
    };
    drop(decoded);

    let mut histogram = vec![Bucket::default(); BUCKETS];
    for pixel in sample.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < MIN_ALPHA {
            continue;
        }
        if r >= NEAR_WHITE && g >= NEAR_WHITE && b >= NEAR_WHITE {
            continue;
        }
        if r <= NEAR_BLACK && g <= NEAR_BLACK && b <= NEAR_BLACK {
            continue;
        }

        let index = (usize::from(r >> 4) << 8) | (usize::from(g >> 4) << 4) | usize::from(b >> 4);
        let bucket = &mut histogram[index];
        bucket.count += 1;
        bucket.r += u32::from(r);
        bucket.g += u32::from(g);
        bucket.b += u32::from(b);
    }

    // Ties resolve to the lowest bucket index so results are deterministic.
    let winner = histogram
        .iter()
        .filter(|b| b.count > 0)
        .fold(None::<&Bucket>, |best, b| match best {
            Some(current) if current.count >= b.count => Some(current),
            _ => Some(b),
        });

    Ok(match winner {
        Some(b) => Extracted::Dominant(Rgb::new(
            (b.r / b.count) as u8,
            (b.g / b.count) as u8,
            (b.b / b.count) as u8,
        )),
        None => Extracted::Neutral,
    })
}

/// Decode a `data:<mime>;base64,<payload>` favicon URL into raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, ExtractionError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ExtractionError::InvalidDataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExtractionError::InvalidDataUrl("missing payload separator".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(ExtractionError::InvalidDataUrl(
            "only base64 payloads are supported".to_string(),
        ));
    }
    // 4 base64 chars encode 3 bytes
    if payload.len() / 4 * 3 > MAX_FAVICON_SIZE {
        return Err(ExtractionError::InvalidDataUrl("payload too large".to_string()));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ExtractionError::InvalidDataUrl(e.to_string()))
}

//! Header color resolution.
//!
//! Priority, per feed and theme:
//!
//! 1. server-supplied colors (theme-specific variant first) when legible
//! 2. a cached entry resolved for the same theme
//! 3. favicon extraction, with text chosen by [`pick_text_color`]
//! 4. the theme's fallback-default pair
//!
//! Extracted pairs are cached, applied to the [`HeaderStyleSink`] and
//! persisted to the server in a detached task whose failure is only logged.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::cache::{BeginResolve, ColorSource, FeedColorEntry, HeaderColorCache};
use super::contrast::{is_legible, pick_text_color};
use super::extract::{decode_data_url, extract_color, Extracted, ExtractionError};
use super::rgb::{ColorPair, Rgb, TextColor};
use crate::api::{ApiError, HeaderThemeColors};
use crate::theme::Theme;

/// Maximum concurrent resolutions when re-resolving after a theme change.
const MAX_CONCURRENT_RESOLVES: usize = 8;

/// Guaranteed-legible pair used when every other path fails.
pub fn fallback_pair(theme: Theme) -> ColorPair {
    match theme {
        Theme::Light => ColorPair::new(Rgb::new(241, 245, 249), Rgb::new(15, 23, 42)),
        Theme::Dark => ColorPair::new(Rgb::new(30, 41, 59), Rgb::new(248, 250, 252)),
    }
}

/// Accent used when a favicon has no usable color (all near-white/black).
pub fn neutral_accent(theme: Theme) -> ColorPair {
    match theme {
        Theme::Light => ColorPair::new(Rgb::new(226, 232, 240), Rgb::new(15, 23, 42)),
        Theme::Dark => ColorPair::new(Rgb::new(51, 65, 85), Rgb::WHITE),
    }
}

/// Everything the resolver needs to know about one feed header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHeader {
    pub feed_url: String,
    /// Absolute URL or server-relative path.
    pub favicon: Option<String>,
    /// `data:` URL; preferred over `favicon` when present.
    pub favicon_data: Option<String>,
    pub header_color: Option<String>,
    pub header_text_color: Option<String>,
    pub theme_colors: Option<HeaderThemeColors>,
}

/// Receives resolved colors for display.
pub trait HeaderStyleSink: Send + Sync {
    fn apply(&self, feed_url: &str, entry: &FeedColorEntry);
}

/// Network side of color resolution: favicon download and persistence.
pub trait ColorBackend: Send + Sync + 'static {
    fn load_favicon(
        &self,
        favicon_url: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ExtractionError>> + Send;

    fn save_header_color(
        &self,
        feed_url: &str,
        color: &str,
        text_color: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Build an entry from server-supplied colors if they are usable for `theme`.
fn server_entry(header: &FeedHeader, theme: Theme) -> Option<FeedColorEntry> {
    let (bg, text) = match header.theme_colors.as_ref().and_then(|c| c.for_theme(theme)) {
        Some(variant) => (variant.bg.as_str(), Some(variant.text.as_str())),
        None => (header.header_color.as_deref()?, header.header_text_color.as_deref()),
    };

    let background: Rgb = match bg.parse() {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(feed = %header.feed_url, error = %e, "Ignoring unparsable server header color");
            return None;
        }
    };
    let text = match text.map(str::parse::<TextColor>) {
        None => TextColor::Auto,
        Some(Ok(t)) => t,
        Some(Err(e)) => {
            tracing::debug!(feed = %header.feed_url, error = %e, "Ignoring unparsable server text color");
            return None;
        }
    };

    let legible = match text {
        TextColor::Rgb(fg) => is_legible(fg, background),
        TextColor::Auto => pick_text_color(background).is_some(),
    };
    if !legible {
        tracing::debug!(feed = %header.feed_url, theme = theme.as_str(), "Server header colors fail contrast check");
        return None;
    }

    Some(FeedColorEntry {
        background,
        text,
        source: ColorSource::ServerProvided,
        resolved_for_theme: theme,
    })
}

fn entry_from_pair(pair: ColorPair, source: ColorSource, theme: Theme) -> FeedColorEntry {
    FeedColorEntry {
        background: pair.background,
        text: TextColor::Rgb(pair.text),
        source,
        resolved_for_theme: theme,
    }
}

/// Decides, caches, applies and persists header colors.
pub struct HeaderColorResolver<B> {
    backend: Arc<B>,
    cache: HeaderColorCache,
    sink: Arc<dyn HeaderStyleSink>,
    /// Pairs already sent to the server this session, by feed URL.
    persisted: Arc<Mutex<HashMap<String, ColorPair>>>,
}

impl<B> Clone for HeaderColorResolver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
            sink: Arc::clone(&self.sink),
            persisted: Arc::clone(&self.persisted),
        }
    }
}

impl<B: ColorBackend> HeaderColorResolver<B> {
    pub fn new(backend: Arc<B>, cache: HeaderColorCache, sink: Arc<dyn HeaderStyleSink>) -> Self {
        Self {
            backend,
            cache,
            sink,
            persisted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &HeaderColorCache {
        &self.cache
    }

    /// Resolve and apply colors for one header.
    ///
    /// Returns `None` only when another resolution of the same feed is already
    /// in flight; that resolution will apply its own result.
    pub async fn resolve(&self, header: &FeedHeader, theme: Theme) -> Option<FeedColorEntry> {
        let feed_url = header.feed_url.as_str();

        if let Some(entry) = server_entry(header, theme) {
            self.cache.put(feed_url, entry);
            self.sink.apply(feed_url, &entry);
            return Some(entry);
        }

        if let Some(entry) = self.cache.get(feed_url) {
            if entry.resolved_for_theme == theme {
                self.sink.apply(feed_url, &entry);
                return Some(entry);
            }
        }

        let guard = match self.cache.try_begin_resolve(feed_url) {
            BeginResolve::Granted(guard) => guard,
            BeginResolve::AlreadyInProgress => {
                tracing::debug!(feed = %feed_url, "Header color resolution already in flight, skipping");
                return None;
            }
        };

        let entry = self.extract_entry(header, theme).await;
        self.cache.put(feed_url, entry);
        drop(guard);

        self.sink.apply(feed_url, &entry);
        tracing::debug!(
            feed = %feed_url,
            source = entry.source.as_str(),
            theme = theme.as_str(),
            "Applied header colors"
        );
        if entry.source == ColorSource::ClientExtracted {
            self.persist(feed_url, entry.pair());
        }
        Some(entry)
    }

    /// Resolve every header concurrently. Returns how many were applied.
    pub async fn resolve_all(&self, headers: Vec<FeedHeader>, theme: Theme) -> usize {
        stream::iter(headers)
            .map(|header| {
                let resolver = self.clone();
                async move { resolver.resolve(&header, theme).await.is_some() }
            })
            .buffer_unordered(MAX_CONCURRENT_RESOLVES)
            .fold(0, |n, applied| async move { n + usize::from(applied) })
            .await
    }

    /// Re-resolve headers that have no entry or whose entry was resolved for
    /// a different theme than `theme`.
    pub async fn reresolve_stale(&self, headers: &[FeedHeader], theme: Theme) -> usize {
        let other_theme = self.cache.stale_for(theme);
        let stale: Vec<FeedHeader> = headers
            .iter()
            .filter(|h| self.cache.get(&h.feed_url).is_none() || other_theme.contains(&h.feed_url))
            .cloned()
            .collect();
        if stale.is_empty() {
            return 0;
        }
        tracing::debug!(count = stale.len(), theme = theme.as_str(), "Re-resolving stale header colors");
        self.resolve_all(stale, theme).await
    }

    async fn extract_entry(&self, header: &FeedHeader, theme: Theme) -> FeedColorEntry {
        let fallback = || entry_from_pair(fallback_pair(theme), ColorSource::FallbackDefault, theme);

        let bytes = match self.favicon_bytes(header).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(feed = %header.feed_url, error = %e, "Favicon unavailable, using fallback colors");
                return fallback();
            }
        };

        match tokio::task::spawn_blocking(move || extract_color(&bytes)).await {
            Ok(Ok(Extracted::Dominant(background))) => match pick_text_color(background) {
                Some(text) => entry_from_pair(
                    ColorPair::new(background, text),
                    ColorSource::ClientExtracted,
                    theme,
                ),
                None => fallback(),
            },
            Ok(Ok(Extracted::Neutral)) => {
                entry_from_pair(neutral_accent(theme), ColorSource::FallbackDefault, theme)
            }
            Ok(Err(e)) => {
                tracing::debug!(feed = %header.feed_url, error = %e, "Color extraction failed, using fallback colors");
                fallback()
            }
            Err(e) => {
                tracing::warn!(feed = %header.feed_url, error = %e, "Color extraction task failed");
                fallback()
            }
        }
    }

    async fn favicon_bytes(&self, header: &FeedHeader) -> Result<Vec<u8>, ExtractionError> {
        if let Some(data) = header.favicon_data.as_deref().filter(|d| !d.is_empty()) {
            return decode_data_url(data);
        }
        match header.favicon.as_deref().filter(|f| !f.is_empty()) {
            Some(url) => self.backend.load_favicon(url).await,
            None => Err(ExtractionError::Unavailable("feed has no favicon".to_string())),
        }
    }

    /// Fire-and-forget save of a client-extracted pair.
    fn persist(&self, feed_url: &str, pair: ColorPair) {
        {
            let mut persisted = self.persisted.lock().unwrap_or_else(PoisonError::into_inner);
            if persisted.get(feed_url) == Some(&pair) {
                tracing::debug!(feed = %feed_url, "Header color already persisted this session");
                return;
            }
            persisted.insert(feed_url.to_string(), pair);
        }

        let backend = Arc::clone(&self.backend);
        let persisted = Arc::clone(&self.persisted);
        let feed_url = feed_url.to_string();
        tokio::spawn(async move {
            let color = pair.background.to_css();
            let text_color = pair.text.to_hex();
            if let Err(e) = backend.save_header_color(&feed_url, &color, &text_color).await {
                tracing::warn!(feed = %feed_url, error = %e, "Failed to persist header color");
                // Allow a later resolution to try again
                persisted
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&feed_url);
            }
        });
    }
}

// ============================================================================
// Applied header styles
// ============================================================================

/// Header styles currently applied, keyed by feed URL.
///
/// Each entry remembers the theme it was resolved for; [`Self::visible_pair`]
/// never hands out a pair resolved for a theme other than the active one.
#[derive(Debug, Clone, Default)]
pub struct HeaderStyles {
    applied: Arc<Mutex<HashMap<String, FeedColorEntry>>>,
    dirty: Arc<AtomicBool>,
}

impl HeaderStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feed_url: &str) -> Option<FeedColorEntry> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(feed_url)
            .copied()
    }

    /// Pair to draw for `feed_url` under `theme`.
    pub fn visible_pair(&self, feed_url: &str, theme: Theme) -> ColorPair {
        match self.get(feed_url) {
            Some(entry) if entry.resolved_for_theme == theme => entry.pair(),
            _ => fallback_pair(theme),
        }
    }

    /// True once after any style was applied since the last call.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl HeaderStyleSink for HeaderStyles {
    fn apply(&self, feed_url: &str, entry: &FeedColorEntry) {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(feed_url.to_string(), *entry);
        self.dirty.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ThemeColorPair;
    use crate::color::contrast::{contrast_ratio, MIN_CONTRAST};
    use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn png_of(px: [u8; 4]) -> Vec<u8> {
        let img: RgbaImage = ImageBuffer::from_pixel(8, 8, Rgba(px));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[derive(Default)]
    struct FakeBackend {
        favicon: Mutex<Option<Vec<u8>>>,
        delay: Option<Duration>,
        loads: AtomicUsize,
        saves: Mutex<Vec<(String, String, String)>>,
        fail_saves: bool,
    }

    impl FakeBackend {
        fn with_favicon(bytes: Vec<u8>) -> Self {
            Self {
                favicon: Mutex::new(Some(bytes)),
                ..Default::default()
            }
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }
    }

    impl ColorBackend for FakeBackend {
        async fn load_favicon(&self, _favicon_url: &str) -> Result<Vec<u8>, ExtractionError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.favicon
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ExtractionError::Unavailable("404".to_string()))
        }

        async fn save_header_color(
            &self,
            feed_url: &str,
            color: &str,
            text_color: &str,
        ) -> Result<(), ApiError> {
            self.saves.lock().unwrap().push((
                feed_url.to_string(),
                color.to_string(),
                text_color.to_string(),
            ));
            if self.fail_saves {
                Err(ApiError::HttpStatus(500))
            } else {
                Ok(())
            }
        }
    }

    fn resolver(backend: FakeBackend) -> (HeaderColorResolver<FakeBackend>, Arc<FakeBackend>, HeaderStyles) {
        let backend = Arc::new(backend);
        let styles = HeaderStyles::new();
        let resolver = HeaderColorResolver::new(
            Arc::clone(&backend),
            HeaderColorCache::new(),
            Arc::new(styles.clone()),
        );
        (resolver, backend, styles)
    }

    fn header(url: &str) -> FeedHeader {
        FeedHeader {
            feed_url: url.to_string(),
            favicon: Some("/favicons/a.png".to_string()),
            ..Default::default()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn fallback_and_neutral_pairs_are_legible() {
        for theme in [Theme::Light, Theme::Dark] {
            let f = fallback_pair(theme);
            assert!(contrast_ratio(f.text, f.background) >= MIN_CONTRAST);
            let n = neutral_accent(theme);
            assert!(contrast_ratio(n.text, n.background) >= MIN_CONTRAST);
        }
    }

    #[tokio::test]
    async fn legible_server_colors_win() {
        let (resolver, backend, styles) = resolver(FakeBackend::default());
        let mut h = header("https://a/feed");
        h.header_color = Some("rgb(20,40,120)".to_string());
        h.header_text_color = Some("#ffffff".to_string());

        let entry = resolver.resolve(&h, Theme::Light).await.unwrap();
        assert_eq!(entry.source, ColorSource::ServerProvided);
        assert_eq!(entry.background, Rgb::new(20, 40, 120));
        assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
        assert_eq!(styles.get("https://a/feed"), Some(entry));
    }

    #[tokio::test]
    async fn theme_specific_server_colors_take_precedence() {
        let (resolver, _backend, _styles) = resolver(FakeBackend::default());
        let mut h = header("https://a/feed");
        h.header_color = Some("rgb(250,250,250)".to_string());
        h.header_text_color = Some("#000000".to_string());
        h.theme_colors = Some(HeaderThemeColors {
            light: None,
            dark: Some(ThemeColorPair {
                bg: "#1e293b".to_string(),
                text: "#f8fafc".to_string(),
            }),
        });

        let dark = resolver.resolve(&h, Theme::Dark).await.unwrap();
        assert_eq!(dark.background, Rgb::new(30, 41, 59));
        let light = resolver.resolve(&h, Theme::Light).await.unwrap();
        assert_eq!(light.background, Rgb::new(250, 250, 250));
    }

    #[tokio::test]
    async fn illegible_server_colors_fall_through_to_extraction() {
        let (resolver, backend, _styles) =
            resolver(FakeBackend::with_favicon(png_of([200, 30, 40, 255])));
        let mut h = header("https://a/feed");
        h.header_color = Some("#777777".to_string());
        h.header_text_color = Some("#888888".to_string());

        let entry = resolver.resolve(&h, Theme::Light).await.unwrap();
        assert_eq!(entry.source, ColorSource::ClientExtracted);
        assert_eq!(entry.background, Rgb::new(200, 30, 40));
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn extracted_colors_are_cached_and_persisted_once() {
        let (resolver, backend, _styles) =
            resolver(FakeBackend::with_favicon(png_of([20, 120, 220, 255])));
        let h = header("https://a/feed");

        let first = resolver.resolve(&h, Theme::Light).await.unwrap();
        let second = resolver.resolve(&h, Theme::Light).await.unwrap();
        settle().await;

        assert_eq!(first, second);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert_eq!(backend.save_count(), 1);
        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves[0].0, "https://a/feed");
        assert_eq!(saves[0].1, "rgb(20,120,220)");
        assert!(is_legible(saves[0].2.parse().unwrap(), Rgb::new(20, 120, 220)));
    }

    #[tokio::test]
    async fn concurrent_resolves_load_favicon_once() {
        let backend = FakeBackend {
            delay: Some(Duration::from_millis(20)),
            ..FakeBackend::with_favicon(png_of([20, 120, 220, 255]))
        };
        let (resolver, backend, _styles) = resolver(backend);
        let h = header("https://a/feed");

        let (a, b) = tokio::join!(resolver.resolve(&h, Theme::Light), resolver.resolve(&h, Theme::Light));
        settle().await;

        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert_eq!(backend.save_count(), 1);
        assert!(!resolver.cache().is_in_flight("https://a/feed"));
    }

    #[tokio::test]
    async fn missing_favicon_uses_fallback_and_skips_persistence() {
        let (resolver, backend, _styles) = resolver(FakeBackend::default());
        let entry = resolver.resolve(&header("https://a/feed"), Theme::Dark).await.unwrap();
        settle().await;

        assert_eq!(entry.source, ColorSource::FallbackDefault);
        assert_eq!(entry.pair(), fallback_pair(Theme::Dark));
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_favicon_uses_fallback() {
        let (resolver, _backend, _styles) =
            resolver(FakeBackend::with_favicon(b"<html>not an icon</html>".to_vec()));
        let entry = resolver.resolve(&header("https://a/feed"), Theme::Light).await.unwrap();
        assert_eq!(entry.source, ColorSource::FallbackDefault);
        assert!(is_legible(entry.pair().text, entry.pair().background));
    }

    #[tokio::test]
    async fn monochrome_favicon_gets_neutral_accent() {
        let (resolver, backend, _styles) =
            resolver(FakeBackend::with_favicon(png_of([250, 250, 250, 255])));
        let entry = resolver.resolve(&header("https://a/feed"), Theme::Light).await.unwrap();
        settle().await;
        assert_eq!(entry.pair(), neutral_accent(Theme::Light));
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn failed_persistence_does_not_block_and_allows_retry() {
        let backend = FakeBackend {
            fail_saves: true,
            ..FakeBackend::with_favicon(png_of([20, 120, 220, 255]))
        };
        let (resolver, backend, styles) = resolver(backend);
        let h = header("https://a/feed");

        let entry = resolver.resolve(&h, Theme::Light).await.unwrap();
        settle().await;
        assert_eq!(styles.get("https://a/feed"), Some(entry));
        assert_eq!(backend.save_count(), 1);

        // Theme flip re-extracts; the failed save is attempted again.
        resolver.resolve(&h, Theme::Dark).await.unwrap();
        settle().await;
        assert_eq!(backend.save_count(), 2);
    }

    #[tokio::test]
    async fn theme_round_trip_leaves_no_stale_pairs() {
        let (resolver, backend, styles) =
            resolver(FakeBackend::with_favicon(png_of([20, 120, 220, 255])));
        let mut server = header("https://server/feed");
        server.header_color = Some("rgb(20,40,120)".to_string());
        server.header_text_color = Some("#ffffff".to_string());
        let headers = vec![server, header("https://a/feed"), header("https://b/feed")];

        resolver.resolve_all(headers.clone(), Theme::Light).await;
        for theme in [Theme::Dark, Theme::Light] {
            resolver.reresolve_stale(&headers, theme).await;
            for h in &headers {
                let applied = styles.get(&h.feed_url).unwrap();
                assert_eq!(applied.resolved_for_theme, theme, "{}", h.feed_url);
            }
        }
        settle().await;

        // Server flag survives the round trip
        assert_eq!(
            styles.get("https://server/feed").unwrap().source,
            ColorSource::ServerProvided
        );
        // Identical extracted pairs are not re-persisted after a flip
        assert_eq!(backend.save_count(), 2);
    }

    #[tokio::test]
    async fn reresolve_stale_skips_current_theme_entries() {
        let (resolver, backend, _styles) =
            resolver(FakeBackend::with_favicon(png_of([20, 120, 220, 255])));
        let fresh = header("https://fresh/feed");
        let flipped = header("https://flipped/feed");
        let unseen = header("https://unseen/feed");

        resolver.resolve(&fresh, Theme::Dark).await.unwrap();
        resolver.resolve(&flipped, Theme::Light).await.unwrap();
        let loads_before = backend.loads.load(Ordering::SeqCst);

        let headers = vec![fresh, flipped, unseen];
        assert_eq!(resolver.reresolve_stale(&headers, Theme::Dark).await, 2);
        // Only the light-theme entry and the unresolved feed were extracted
        assert_eq!(backend.loads.load(Ordering::SeqCst), loads_before + 2);
        assert!(resolver.cache().stale_for(Theme::Dark).is_empty());
        assert_eq!(resolver.reresolve_stale(&headers, Theme::Dark).await, 0);
    }

    #[test]
    fn visible_pair_hides_other_theme() {
        let styles = HeaderStyles::new();
        let entry = entry_from_pair(
            ColorPair::new(Rgb::new(20, 120, 220), Rgb::WHITE),
            ColorSource::ClientExtracted,
            Theme::Light,
        );
        styles.apply("u", &entry);
        assert!(styles.take_dirty());
        assert!(!styles.take_dirty());
        assert_eq!(styles.visible_pair("u", Theme::Light), entry.pair());
        assert_eq!(styles.visible_pair("u", Theme::Dark), fallback_pair(Theme::Dark));
        assert_eq!(styles.visible_pair("missing", Theme::Light), fallback_pair(Theme::Light));
    }
}

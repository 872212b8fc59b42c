use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::contrast::pick_text_color;
use super::resolver::fallback_pair;
use super::rgb::{ColorPair, Rgb, TextColor};
use crate::theme::Theme;

/// Where a header color pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    ServerProvided,
    ClientExtracted,
    FallbackDefault,
}

impl ColorSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerProvided => "server",
            Self::ClientExtracted => "extracted",
            Self::FallbackDefault => "fallback",
        }
    }
}

/// Resolved header colors for one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedColorEntry {
    pub background: Rgb,
    pub text: TextColor,
    pub source: ColorSource,
    /// The theme this pair was resolved under.
    pub resolved_for_theme: Theme,
}

impl FeedColorEntry {
    /// Concrete pair to draw. `auto` text is chosen against the background;
    /// if nothing is legible the theme's fallback pair is used instead.
    pub fn pair(&self) -> ColorPair {
        let text = match self.text {
            TextColor::Rgb(c) => Some(c),
            TextColor::Auto => pick_text_color(self.background),
        };
        match text {
            Some(text) => ColorPair::new(self.background, text),
            None => fallback_pair(self.resolved_for_theme),
        }
    }
}

/// Outcome of [`HeaderColorCache::try_begin_resolve`].
#[derive(Debug)]
pub enum BeginResolve {
    /// The caller owns the resolution until the guard is dropped.
    Granted(ResolveGuard),
    AlreadyInProgress,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, FeedColorEntry>,
    in_flight: HashSet<String>,
}

/// Session-wide map from feed URL to its resolved header colors.
///
/// Entries are never evicted. The in-flight set is checked and updated under
/// the same lock, so at most one resolution per feed URL runs at a time even
/// on a multi-threaded runtime.
#[derive(Debug, Clone, Default)]
pub struct HeaderColorCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl HeaderColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, feed_url: &str) -> Option<FeedColorEntry> {
        self.lock().entries.get(feed_url).copied()
    }

    /// Store `entry`, replacing whatever was there.
    pub fn put(&self, feed_url: &str, entry: FeedColorEntry) {
        self.lock().entries.insert(feed_url.to_string(), entry);
    }

    pub fn try_begin_resolve(&self, feed_url: &str) -> BeginResolve {
        let mut inner = self.lock();
        if inner.in_flight.insert(feed_url.to_string()) {
            BeginResolve::Granted(ResolveGuard {
                cache: self.clone(),
                feed_url: feed_url.to_string(),
            })
        } else {
            BeginResolve::AlreadyInProgress
        }
    }

    pub fn is_in_flight(&self, feed_url: &str) -> bool {
        self.lock().in_flight.contains(feed_url)
    }

    /// Feed URLs whose entry was resolved for a theme other than `theme`.
    pub fn stale_for(&self, theme: Theme) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| e.resolved_for_theme != theme)
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Marks a feed as being resolved; the mark is cleared on drop.
#[derive(Debug)]
pub struct ResolveGuard {
    cache: HeaderColorCache,
    feed_url: String,
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        self.cache.lock().in_flight.remove(&self.feed_url);
    }
}

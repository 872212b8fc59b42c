use crate::api::{
    ApiClient, ApiError, ClusterItemsResponse, FeedResponse, FeedsPage, StoryResponse,
    TabResponse, TimelinePage,
};
use crate::color::{FeedHeader, HeaderColorCache, HeaderColorResolver, HeaderStyles};
use crate::config::Config;
use crate::storage::Database;
use crate::theme::{Theme, ThemeSignal};
use crate::timeline::{ScrollSentinel, TimelineLoader};
use ratatui::widgets::ListState;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;

/// Preference key for the view shown on start.
pub const VIEW_PREFERENCE_KEY: &str = "session.view";

// ============================================================================
// View
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Timeline,
    Feeds,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Timeline => "timeline",
            View::Feeds => "feeds",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "timeline" => Some(View::Timeline),
            "feeds" => Some(View::Feeds),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            View::Timeline => View::Feeds,
            View::Feeds => View::Timeline,
        }
    }
}

// ============================================================================
// Feeds view rows
// ============================================================================

/// One selectable row of the feeds view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRow {
    Header(usize),
    Item(usize, usize),
    /// "load more" affordance after a feed with `hasMore`.
    More(usize),
}

impl FeedRow {
    pub fn feed_index(self) -> usize {
        match self {
            FeedRow::Header(f) | FeedRow::Item(f, _) | FeedRow::More(f) => f,
        }
    }
}

// ============================================================================
// Cluster overlay
// ============================================================================

#[derive(Debug, Clone)]
pub enum ClusterItems {
    Loading,
    Loaded(Vec<StoryResponse>),
    Failed(String),
}

/// Other stories of a cluster, shown over the timeline.
#[derive(Debug, Clone)]
pub struct ClusterOverlay {
    pub cluster_id: String,
    pub title: String,
    pub items: ClusterItems,
    pub selected: usize,
}

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks
pub enum AppEvent {
    /// `GET /api/feeds` finished. Dropped unless `generation` is current.
    FeedsLoaded {
        generation: u64,
        result: Result<FeedsPage, ApiError>,
    },
    /// A timeline page finished; `token` came from the loader's request.
    TimelinePage {
        token: u64,
        result: Result<TimelinePage, ApiError>,
    },
    /// A batch of header color resolutions finished.
    HeadersResolved { theme: Theme, applied: usize },
    FeedMoreLoaded {
        feed_url: String,
        result: Result<FeedResponse, ApiError>,
    },
    ClusterItemsLoaded {
        cluster_id: String,
        result: Result<ClusterItemsResponse, ApiError>,
    },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub api: Arc<ApiClient>,
    pub db: Database,
    pub config: Config,
    pub theme: ThemeSignal,
    pub resolver: HeaderColorResolver<ApiClient>,
    pub header_styles: HeaderStyles,
    pub view: View,

    // Timeline
    pub timeline: TimelineLoader,
    pub sentinel: ScrollSentinel,
    pub timeline_state: ListState,
    /// Rows available to the timeline list at the last render.
    pub timeline_viewport: usize,
    pub cluster_overlay: Option<ClusterOverlay>,

    // Feeds
    pub tabs: Vec<TabResponse>,
    pub active_tab: String,
    pub feeds: Vec<FeedResponse>,
    pub feeds_loading: bool,
    pub feeds_error: Option<String>,
    pub feeds_generation: u64,
    pub feeds_state: ListState,
    /// Feed URLs with a `feed_more` request in flight.
    pub feed_more_pending: HashSet<String>,
    pub feeds_clustering: bool,

    /// Header resolution batches still running.
    pub resolve_batches: usize,
    pub show_help: bool,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(api: Arc<ApiClient>, db: Database, config: Config, theme: ThemeSignal) -> Self {
        let header_styles = HeaderStyles::new();
        let resolver = HeaderColorResolver::new(
            Arc::clone(&api),
            HeaderColorCache::new(),
            Arc::new(header_styles.clone()),
        );
        let timeline = TimelineLoader::new(config.timeline_limit, config.timeline_days);
        let sentinel = ScrollSentinel::new(config.sentinel_margin);
        let active_tab = config.default_tab.clone();

        Self {
            api,
            db,
            config,
            theme,
            resolver,
            header_styles,
            view: View::default(),
            timeline,
            sentinel,
            timeline_state: ListState::default().with_selected(Some(0)),
            timeline_viewport: 0,
            cluster_overlay: None,
            tabs: Vec::new(),
            active_tab,
            feeds: Vec::new(),
            feeds_loading: false,
            feeds_error: None,
            feeds_generation: 0,
            feeds_state: ListState::default().with_selected(Some(0)),
            feed_more_pending: HashSet::new(),
            feeds_clustering: false,
            resolve_batches: 0,
            show_help: false,
            status_message: None,
            needs_redraw: true,
        }
    }

    pub fn current_theme(&self) -> Theme {
        self.theme.current()
    }

    // ========================================================================
    // View switching
    // ========================================================================

    /// Switch views. Leaving the timeline tears its sentinel down; returning
    /// mounts a fresh one.
    pub fn set_view(&mut self, view: View) {
        if view == self.view {
            return;
        }
        if self.view == View::Timeline {
            self.sentinel.teardown();
            self.cluster_overlay = None;
        }
        if view == View::Timeline {
            self.sentinel = ScrollSentinel::new(self.config.sentinel_margin);
        }
        self.view = view;
        tracing::debug!(view = view.as_str(), "Switched view");
    }

    // ========================================================================
    // Header colors
    // ========================================================================

    /// Every feed header currently on screen, one per feed URL. Feeds-view
    /// entries win over timeline items since they carry theme variants.
    pub fn known_headers(&self) -> Vec<FeedHeader> {
        let mut by_url: HashMap<&str, FeedHeader> = HashMap::new();
        for feed in &self.feeds {
            by_url.insert(feed.url.as_str(), FeedHeader::from(feed));
        }
        for item in self.timeline.items() {
            if item.feed_url.is_empty() {
                continue;
            }
            by_url
                .entry(item.feed_url.as_str())
                .or_insert_with(|| FeedHeader::from(item));
        }
        by_url.into_values().collect()
    }

    /// Headers whose applied style is missing or belongs to another theme.
    pub fn stale_headers(&self, theme: Theme) -> Vec<FeedHeader> {
        self.known_headers()
            .into_iter()
            .filter(|h| {
                self.header_styles
                    .get(&h.feed_url)
                    .map_or(true, |e| e.resolved_for_theme != theme)
            })
            .collect()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn selected_timeline_index(&self) -> usize {
        self.timeline_state.selected().unwrap_or(0)
    }

    pub fn feed_rows(&self) -> Vec<FeedRow> {
        let mut rows = Vec::new();
        for (f, feed) in self.feeds.iter().enumerate() {
            rows.push(FeedRow::Header(f));
            rows.extend((0..feed.items.len()).map(|i| FeedRow::Item(f, i)));
            if feed.has_more {
                rows.push(FeedRow::More(f));
            }
        }
        rows
    }

    pub fn selected_feed_row(&self) -> Option<FeedRow> {
        let rows = self.feed_rows();
        rows.get(self.feeds_state.selected().unwrap_or(0)).copied()
    }

    /// Link of whatever is selected in the active view.
    pub fn selected_link(&self) -> Option<&str> {
        if let Some(overlay) = &self.cluster_overlay {
            return match &overlay.items {
                ClusterItems::Loaded(items) => items.get(overlay.selected).map(|s| s.link.as_str()),
                _ => None,
            };
        }
        let link = match self.view {
            View::Timeline => self
                .timeline
                .items()
                .get(self.selected_timeline_index())
                .map(|i| i.link.as_str()),
            View::Feeds => match self.selected_feed_row()? {
                FeedRow::Header(f) => self.feeds.get(f).map(|feed| feed.site_link.as_str()),
                FeedRow::Item(f, i) => self.feeds.get(f)?.items.get(i).map(|i| i.link.as_str()),
                FeedRow::More(_) => None,
            },
        };
        link.filter(|link| !link.is_empty())
    }

    pub fn nav_down(&mut self) {
        if let Some(overlay) = &mut self.cluster_overlay {
            if let ClusterItems::Loaded(items) = &overlay.items {
                if overlay.selected + 1 < items.len() {
                    overlay.selected += 1;
                }
            }
            return;
        }
        let (state, len) = match self.view {
            View::Timeline => (&mut self.timeline_state, self.timeline.len()),
            View::Feeds => {
                let len = self.feed_rows().len();
                (&mut self.feeds_state, len)
            }
        };
        let next = state.selected().map_or(0, |i| i.saturating_add(1));
        state.select(Some(next.min(len.saturating_sub(1))));
    }

    pub fn nav_up(&mut self) {
        if let Some(overlay) = &mut self.cluster_overlay {
            overlay.selected = overlay.selected.saturating_sub(1);
            return;
        }
        let state = match self.view {
            View::Timeline => &mut self.timeline_state,
            View::Feeds => &mut self.feeds_state,
        };
        let prev = state.selected().map_or(0, |i| i.saturating_sub(1));
        state.select(Some(prev));
    }

    pub fn page_down(&mut self) {
        for _ in 0..self.timeline_viewport.max(1) {
            self.nav_down();
        }
    }

    pub fn page_up(&mut self) {
        for _ in 0..self.timeline_viewport.max(1) {
            self.nav_up();
        }
    }

    /// Keep selections inside their lists after data changes.
    pub fn clamp_selections(&mut self) {
        let timeline_len = self.timeline.len();
        let feed_rows = self.feed_rows().len();
        for (state, len) in [
            (&mut self.timeline_state, timeline_len),
            (&mut self.feeds_state, feed_rows),
        ] {
            let clamped = state.selected().unwrap_or(0).min(len.saturating_sub(1));
            state.select(Some(clamped));
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if older than 3 seconds.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

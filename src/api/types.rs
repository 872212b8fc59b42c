//! Wire types for the headlines HTTP API.
//!
//! Responses use camelCase field names. Optional fields the server may omit
//! are `Option` or defaulted so older servers still deserialize.

use serde::{Deserialize, Serialize};

use crate::color::FeedHeader;
use crate::theme::Theme;

// ============================================================================
// Feeds
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TabResponse {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub pub_date: Option<i64>,
}

/// Server-chosen colors for one theme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeColorPair {
    pub bg: String,
    pub text: String,
}

/// Optional per-theme overrides of `headerColor`/`headerTextColor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderThemeColors {
    #[serde(default)]
    pub light: Option<ThemeColorPair>,
    #[serde(default)]
    pub dark: Option<ThemeColorPair>,
}

impl HeaderThemeColors {
    pub fn for_theme(&self, theme: Theme) -> Option<&ThemeColorPair> {
        match theme {
            Theme::Light => self.light.as_ref(),
            Theme::Dark => self.dark.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    #[serde(default)]
    pub tab: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub site_link: String,
    #[serde(default)]
    pub display_link: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub favicon_data: Option<String>,
    #[serde(default)]
    pub header_color: Option<String>,
    #[serde(default)]
    pub header_text_color: Option<String>,
    #[serde(default)]
    pub header_theme_colors: Option<HeaderThemeColors>,
    #[serde(default)]
    pub items: Vec<ItemResponse>,
    #[serde(default)]
    pub total_item_count: u64,
    #[serde(default)]
    pub has_more: bool,
}

impl FeedResponse {
    /// Append items from a `feed_more` page, skipping links already present.
    /// Returns how many were added.
    pub fn merge_more(&mut self, more: FeedResponse) -> usize {
        let mut seen: std::collections::HashSet<String> =
            self.items.iter().map(|i| i.link.clone()).collect();
        let before = self.items.len();
        for item in more.items {
            if seen.insert(item.link.clone()) {
                self.items.push(item);
            }
        }
        self.has_more = more.has_more;
        if more.total_item_count > 0 {
            self.total_item_count = more.total_item_count;
        }
        self.items.len() - before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedsPage {
    #[serde(default)]
    pub tabs: Vec<TabResponse>,
    #[serde(default)]
    pub active_tab: String,
    #[serde(default)]
    pub feeds: Vec<FeedResponse>,
    #[serde(default)]
    pub is_clustering: bool,
}

// ============================================================================
// Timeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub pub_date: Option<i64>,
    #[serde(default)]
    pub feed_title: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub feed_link: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub favicon_data: Option<String>,
    #[serde(default)]
    pub header_color: Option<String>,
    #[serde(default)]
    pub header_text_color: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub is_representative: bool,
    #[serde(default)]
    pub cluster_size: Option<u32>,
}

impl TimelineItem {
    /// Cluster id if this item represents a cluster with other stories.
    pub fn expandable_cluster(&self) -> Option<&str> {
        match (self.cluster_id.as_deref(), self.cluster_size) {
            (Some(id), Some(size)) if self.is_representative && size > 1 => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePage {
    #[serde(default)]
    pub items: Vec<TimelineItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub is_clustering: bool,
}

// ============================================================================
// Clusters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub pub_date: Option<i64>,
    #[serde(default)]
    pub feed_title: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub feed_link: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub favicon_data: Option<String>,
    #[serde(default)]
    pub header_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    pub id: String,
    pub representative: StoryResponse,
    #[serde(default)]
    pub others: Vec<StoryResponse>,
    #[serde(default)]
    pub cluster_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    #[serde(default)]
    pub clusters: Vec<ClusterResponse>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterItemsResponse {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub items: Vec<StoryResponse>,
}

// ============================================================================
// Header color persistence
// ============================================================================

/// Body of `POST /api/header_color`. Unlike responses, this uses snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderColorRequest {
    pub feed_url: String,
    pub color: String,
    pub text_color: String,
}

// ============================================================================
// Conversions into resolver input
// ============================================================================

impl From<&FeedResponse> for FeedHeader {
    fn from(feed: &FeedResponse) -> Self {
        FeedHeader {
            feed_url: feed.url.clone(),
            favicon: feed.favicon.clone(),
            favicon_data: feed.favicon_data.clone(),
            header_color: feed.header_color.clone(),
            header_text_color: feed.header_text_color.clone(),
            theme_colors: feed.header_theme_colors.clone(),
        }
    }
}

impl From<&TimelineItem> for FeedHeader {
    fn from(item: &TimelineItem) -> Self {
        FeedHeader {
            feed_url: item.feed_url.clone(),
            favicon: item.favicon.clone(),
            favicon_data: item.favicon_data.clone(),
            header_color: item.header_color.clone(),
            header_text_color: item.header_text_color.clone(),
            theme_colors: None,
        }
    }
}

impl From<&StoryResponse> for FeedHeader {
    fn from(story: &StoryResponse) -> Self {
        FeedHeader {
            feed_url: story.feed_url.clone(),
            favicon: story.favicon.clone(),
            favicon_data: story.favicon_data.clone(),
            header_color: story.header_color.clone(),
            header_text_color: None,
            theme_colors: None,
        }
    }
}

//! HTTP client and wire types for the headlines server.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiError};
pub use types::{
    ClusterItemsResponse, ClusterResponse, ClustersResponse, FeedResponse, FeedsPage,
    HeaderColorRequest, HeaderThemeColors, ItemResponse, StoryResponse, TabResponse,
    ThemeColorPair, TimelineItem, TimelinePage,
};

//! Application event handling.
//!
//! Applies results of background tasks to `App`. Results that were superseded
//! while in flight (tab switched, timeline reset, overlay closed) are dropped.

use crate::app::{App, AppEvent, ClusterItems};
use crate::timeline::PageOutcome;
use tokio::sync::mpsc;

use super::tasks::spawn_header_resolve;

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::FeedsLoaded { generation, result } => {
            if generation != app.feeds_generation {
                tracing::debug!(
                    generation,
                    current = app.feeds_generation,
                    "Discarding stale feeds response"
                );
                return;
            }
            app.feeds_loading = false;
            match result {
                Ok(page) => {
                    tracing::info!(tab = %page.active_tab, feeds = page.feeds.len(), "Feeds loaded");
                    app.tabs = page.tabs;
                    if !page.active_tab.is_empty() {
                        app.active_tab = page.active_tab;
                    }
                    app.feeds = page.feeds;
                    app.feeds_clustering = page.is_clustering;
                    app.feed_more_pending.clear();
                    app.clamp_selections();
                    spawn_header_resolve(app, event_tx);
                }
                Err(e) => {
                    tracing::warn!(tab = %app.active_tab, error = %e, "Failed to load feeds");
                    app.set_status(format!("Feeds: {} - press r to retry", e.summary()));
                    app.feeds_error = Some(e.summary());
                }
            }
        }

        AppEvent::TimelinePage { token, result } => match app.timeline.complete(token, result) {
            PageOutcome::Appended { added, duplicates } => {
                tracing::debug!(added, duplicates, total = app.timeline.len(), "Timeline page applied");
                // The appended rows moved the sentinel to a new position past
                // the list end, so it starts out not intersecting again
                app.sentinel.rearm();
                app.clamp_selections();
                spawn_header_resolve(app, event_tx);
            }
            PageOutcome::Failed => {
                let summary = app
                    .timeline
                    .last_error()
                    .map(|e| e.summary())
                    .unwrap_or_default();
                app.set_status(format!("Timeline: {} - press r to retry", summary));
            }
            PageOutcome::Discarded => {}
        },

        AppEvent::HeadersResolved { theme, applied } => {
            app.resolve_batches = app.resolve_batches.saturating_sub(1);
            tracing::debug!(theme = theme.as_str(), applied, "Header colors resolved");
            // A batch that overlapped a theme flip may have skipped feeds that
            // were in flight for the old theme. Once everything settles, sweep
            // again for the current theme.
            if app.resolve_batches == 0 {
                spawn_header_resolve(app, event_tx);
            }
        }

        AppEvent::FeedMoreLoaded { feed_url, result } => {
            app.feed_more_pending.remove(&feed_url);
            let Some(feed) = app.feeds.iter_mut().find(|f| f.url == feed_url) else {
                tracing::debug!(feed = %feed_url, "Feed gone before more items arrived");
                return;
            };
            match result {
                Ok(more) => {
                    let added = feed.merge_more(more);
                    tracing::debug!(feed = %feed_url, added, has_more = feed.has_more, "Merged more feed items");
                    if added == 0 && feed.has_more {
                        // Nothing new at this offset; stop offering more
                        feed.has_more = false;
                    }
                    app.clamp_selections();
                }
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "Failed to load more feed items");
                    app.set_status(format!("Load more: {}", e.summary()));
                }
            }
        }

        AppEvent::ClusterItemsLoaded { cluster_id, result } => {
            let Some(overlay) = app
                .cluster_overlay
                .as_mut()
                .filter(|o| o.cluster_id == cluster_id)
            else {
                tracing::debug!(cluster = %cluster_id, "Discarding cluster items for closed overlay");
                return;
            };
            overlay.items = match result {
                Ok(response) => ClusterItems::Loaded(response.items),
                Err(e) => {
                    tracing::warn!(cluster = %cluster_id, error = %e, "Failed to load cluster items");
                    ClusterItems::Failed(e.summary())
                }
            };
        }

        AppEvent::TaskPanicked { task, error } => {
            app.set_status(format!("Internal error in {} task: {}", task, error));
        }
    }
}

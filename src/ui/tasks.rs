//! Background task spawning.
//!
//! Every network operation runs on its own task and reports back through the
//! `AppEvent` channel. Tasks are wrapped in [`catch_task_panic`] so a panic
//! surfaces as `AppEvent::TaskPanicked` instead of a silently dropped result.

use crate::app::{App, AppEvent};
use crate::timeline::PageRequest;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Catch panics in a future, returning the panic message on failure.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn send(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

/// Run `work` on a new task and forward its event, or a `TaskPanicked`.
fn spawn_reporting<F>(task: &'static str, tx: &mpsc::Sender<AppEvent>, work: F)
where
    F: std::future::Future<Output = AppEvent> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        match catch_task_panic(work).await {
            Ok(event) => send(&tx, event, task).await,
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                send(&tx, AppEvent::TaskPanicked { task, error }, task).await;
            }
        }
    });
}

// ============================================================================
// Spawners
// ============================================================================

/// Kick off everything the first frame needs.
pub(super) fn start(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    spawn_feeds_load(app, event_tx);
    let req = app
        .timeline
        .begin_initial(app.config.timeline_limit, app.config.timeline_days);
    spawn_timeline_page(app, req, event_tx);
}

/// Load `/api/feeds` for the active tab, superseding any earlier load.
pub(super) fn spawn_feeds_load(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    app.feeds_generation = app.feeds_generation.wrapping_add(1);
    app.feeds_loading = true;
    app.feeds_error = None;

    let generation = app.feeds_generation;
    let tab = app.active_tab.clone();
    let api = app.api.clone();
    tracing::debug!(tab = %tab, generation, "Loading feeds");

    spawn_reporting("feeds", event_tx, async move {
        let result = api.fetch_feeds(&tab).await;
        AppEvent::FeedsLoaded { generation, result }
    });
}

pub(super) fn spawn_timeline_page(app: &App, req: PageRequest, event_tx: &mpsc::Sender<AppEvent>) {
    let api = app.api.clone();
    tracing::debug!(
        token = req.token,
        offset = req.offset,
        limit = req.limit,
        "Fetching timeline page"
    );

    spawn_reporting("timeline", event_tx, async move {
        let result = api.fetch_timeline(req.limit, req.offset, req.days).await;
        AppEvent::TimelinePage {
            token: req.token,
            result,
        }
    });
}

/// Resolve header colors for every on-screen feed not yet styled for the
/// current theme. No-op when nothing is stale.
pub(super) fn spawn_header_resolve(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let theme = app.current_theme();
    let headers = app.stale_headers(theme);
    if headers.is_empty() {
        return;
    }

    app.resolve_batches += 1;
    let resolver = app.resolver.clone();
    tracing::debug!(count = headers.len(), theme = theme.as_str(), "Resolving header colors");

    spawn_reporting("header_colors", event_tx, async move {
        let applied = resolver.reresolve_stale(&headers, theme).await;
        AppEvent::HeadersResolved { theme, applied }
    });
}

/// Fetch the next `feed_more` page for `feed_url` unless one is in flight.
pub(super) fn spawn_feed_more(app: &mut App, feed_url: String, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(feed) = app.feeds.iter().find(|f| f.url == feed_url) else {
        return;
    };
    if !feed.has_more || !app.feed_more_pending.insert(feed_url.clone()) {
        return;
    }

    let offset = feed.items.len();
    let limit = app.config.feed_more_limit;
    let api = app.api.clone();
    tracing::debug!(feed = %feed_url, offset, limit, "Loading more feed items");

    spawn_reporting("feed_more", event_tx, async move {
        let result = api.fetch_more_feed_items(&feed_url, limit, offset).await;
        AppEvent::FeedMoreLoaded { feed_url, result }
    });
}

pub(super) fn spawn_cluster_items(app: &App, cluster_id: String, event_tx: &mpsc::Sender<AppEvent>) {
    let api = app.api.clone();
    tracing::debug!(cluster = %cluster_id, "Loading cluster items");

    spawn_reporting("cluster_items", event_tx, async move {
        let result = api.fetch_cluster_items(&cluster_id).await;
        AppEvent::ClusterItemsLoaded { cluster_id, result }
    });
}

/// Save the active view for the next start.
pub(super) fn spawn_save_view(app: &App) {
    let db = app.db.clone();
    let view = app.view;
    tokio::spawn(async move {
        if let Err(e) = db
            .set_preference(crate::app::VIEW_PREFERENCE_KEY, view.as_str())
            .await
        {
            tracing::warn!(error = %e, "Failed to save view preference");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catch_task_panic_reports_message() {
        let err = catch_task_panic(async { panic!("boom") }).await.unwrap_err();
        assert_eq!(err, "boom");

        let err = catch_task_panic(async { panic!("{} {}", "formatted", 1) })
            .await
            .unwrap_err();
        assert_eq!(err, "formatted 1");
    }

    #[tokio::test]
    async fn catch_task_panic_passes_through_value() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn panicking_task_sends_task_panicked() {
        let (tx, mut rx) = mpsc::channel(4);
        let flag = true;
        spawn_reporting("test", &tx, async move {
            if flag {
                panic!("kaboom");
            }
            AppEvent::HeadersResolved {
                theme: crate::theme::Theme::Light,
                applied: 0,
            }
        });
        match rx.recv().await {
            Some(AppEvent::TaskPanicked { task, error }) => {
                assert_eq!(task, "test");
                assert_eq!(error, "kaboom");
            }
            _ => panic!("expected TaskPanicked"),
        }
    }
}

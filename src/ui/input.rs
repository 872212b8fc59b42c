//! Input handling for the TUI.
//!
//! Overlays (help, cluster) capture all keys while visible; otherwise keys
//! go to the active view.

use crate::app::{App, AppEvent, ClusterItems, ClusterOverlay, FeedRow, View};
use crate::timeline::LoadState;
use crate::util::open_link;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::tasks::{
    spawn_cluster_items, spawn_feed_more, spawn_feeds_load, spawn_save_view, spawn_timeline_page,
};
use super::Action;

/// Main input dispatch function.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    if app.show_help {
        if matches!(code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            app.show_help = false;
        }
        return Ok(Action::Continue);
    }

    if app.cluster_overlay.is_some() {
        return handle_cluster_input(app, code);
    }

    // Keys shared by both views
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(Action::Quit),
        KeyCode::Char('?') => {
            app.show_help = true;
            return Ok(Action::Continue);
        }
        KeyCode::Tab => {
            app.set_view(app.view.toggled());
            spawn_save_view(app);
            return Ok(Action::Continue);
        }
        KeyCode::Char('t') => {
            let theme = app.theme.toggle().await;
            app.set_status(format!("Theme: {}", theme.as_str()));
            return Ok(Action::Continue);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.nav_down();
            return Ok(Action::Continue);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.nav_up();
            return Ok(Action::Continue);
        }
        KeyCode::Char('o') => {
            open_selected(app);
            return Ok(Action::Continue);
        }
        _ => {}
    }

    match app.view {
        View::Timeline => handle_timeline_input(app, code, modifiers, event_tx),
        View::Feeds => handle_feeds_input(app, code, event_tx),
    }
    Ok(Action::Continue)
}

fn handle_timeline_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match code {
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.timeline_state.select(Some(0)),
        KeyCode::Char('G') | KeyCode::End => {
            app.timeline_state
                .select(Some(app.timeline.len().saturating_sub(1)));
        }
        KeyCode::Char('r') => {
            if app.timeline.state() != LoadState::Errored {
                app.set_status("Nothing to retry");
                return;
            }
            if let Some(req) = app.timeline.begin_load_more() {
                app.set_status("Retrying...");
                spawn_timeline_page(app, req, event_tx);
            }
        }
        KeyCode::Char('R') => {
            let req = app
                .timeline
                .begin_initial(app.config.timeline_limit, app.config.timeline_days);
            app.timeline_state.select(Some(0));
            app.set_status("Reloading timeline...");
            spawn_timeline_page(app, req, event_tx);
        }
        KeyCode::Char('c') | KeyCode::Enter => open_cluster(app, event_tx),
        _ => {}
    }
}

fn handle_feeds_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    match code {
        KeyCode::Char('r') => {
            app.set_status("Reloading feeds...");
            spawn_feeds_load(app, event_tx);
        }
        KeyCode::Char(']') | KeyCode::Right => switch_tab(app, 1, event_tx),
        KeyCode::Char('[') | KeyCode::Left => switch_tab(app, -1, event_tx),
        KeyCode::Char('m') | KeyCode::Enter => {
            let Some(row) = app.selected_feed_row() else {
                return;
            };
            if code == KeyCode::Enter && !matches!(row, FeedRow::More(_)) {
                return;
            }
            let Some(feed) = app.feeds.get(row.feed_index()) else {
                return;
            };
            if !feed.has_more {
                app.set_status("No more items");
                return;
            }
            let url = feed.url.clone();
            spawn_feed_more(app, url, event_tx);
        }
        _ => {}
    }
}

/// Move `delta` tabs along the tab bar (wrapping) and reload feeds.
fn switch_tab(app: &mut App, delta: isize, event_tx: &mpsc::Sender<AppEvent>) {
    if app.tabs.len() < 2 {
        return;
    }
    let len = app.tabs.len() as isize;
    let current = app
        .tabs
        .iter()
        .position(|t| t.name == app.active_tab)
        .unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(len) as usize;
    app.active_tab = app.tabs[next].name.clone();
    app.feeds_state.select(Some(0));
    spawn_feeds_load(app, event_tx);
}

fn open_cluster(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(item) = app.timeline.items().get(app.selected_timeline_index()) else {
        return;
    };
    let Some(cluster_id) = item.expandable_cluster() else {
        return;
    };
    let cluster_id = cluster_id.to_string();
    app.cluster_overlay = Some(ClusterOverlay {
        cluster_id: cluster_id.clone(),
        title: item.title.clone(),
        items: ClusterItems::Loading,
        selected: 0,
    });
    spawn_cluster_items(app, cluster_id, event_tx);
}

fn handle_cluster_input(app: &mut App, code: KeyCode) -> Result<Action> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('c') => app.cluster_overlay = None,
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Char('o') | KeyCode::Enter => open_selected(app),
        _ => {}
    }
    Ok(Action::Continue)
}

fn open_selected(app: &mut App) {
    let Some(link) = app.selected_link().map(str::to_string) else {
        app.set_status("Nothing to open");
        return;
    };
    match open_link(&link) {
        Ok(()) => app.set_status("Opened in browser"),
        Err(e) => {
            tracing::warn!(link = %link, error = %e, "Failed to open link");
            app.set_status(format!("Cannot open link: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TabResponse;
    use crate::app::tests::{feed, load_timeline, test_app, timeline_item};
    use crate::theme::Theme;

    async fn press(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).await.unwrap()
    }

    #[tokio::test]
    async fn quit_keys() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        assert!(matches!(press(&mut app, KeyCode::Char('q'), &tx).await, Action::Quit));
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, &tx)
                .await
                .unwrap(),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn help_overlay_captures_keys() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('?'), &tx).await;
        assert!(app.show_help);
        // 'q' closes help instead of quitting
        assert!(matches!(press(&mut app, KeyCode::Char('q'), &tx).await, Action::Continue));
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn t_toggles_and_publishes_theme() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let mut sub = app.theme.subscribe();
        assert_eq!(app.current_theme(), Theme::Light);

        press(&mut app, KeyCode::Char('t'), &tx).await;
        assert_eq!(app.current_theme(), Theme::Dark);
        assert!(sub.has_changed());
        assert_eq!(sub.observe(), Theme::Dark);
    }

    #[tokio::test]
    async fn tab_switches_view_and_tears_down_sentinel() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Tab, &tx).await;
        assert_eq!(app.view, View::Feeds);
        assert!(!app.sentinel.is_active());
    }

    #[tokio::test]
    async fn retry_only_from_errored() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        load_timeline(&mut app, vec![timeline_item("1", "u")], true);
        press(&mut app, KeyCode::Char('r'), &tx).await;
        assert_eq!(app.timeline.state(), LoadState::Idle);

        let req = app.timeline.begin_load_more().unwrap();
        app.timeline
            .complete(req.token, Err(crate::api::ApiError::Timeout));
        press(&mut app, KeyCode::Char('r'), &tx).await;
        assert_eq!(app.timeline.state(), LoadState::Loading);
        assert_eq!(app.timeline.offset(), 1);
    }

    #[tokio::test]
    async fn enter_on_cluster_opens_overlay() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let mut rep = timeline_item("1", "u");
        rep.cluster_id = Some("c1".to_string());
        rep.is_representative = true;
        rep.cluster_size = Some(3);
        load_timeline(&mut app, vec![rep, timeline_item("2", "u")], false);

        press(&mut app, KeyCode::Enter, &tx).await;
        let overlay = app.cluster_overlay.as_ref().unwrap();
        assert_eq!(overlay.cluster_id, "c1");
        assert!(matches!(overlay.items, ClusterItems::Loading));

        // Esc closes the overlay without quitting
        assert!(matches!(press(&mut app, KeyCode::Esc, &tx).await, Action::Continue));
        assert!(app.cluster_overlay.is_none());

        // Plain items do not open an overlay
        press(&mut app, KeyCode::Char('j'), &tx).await;
        press(&mut app, KeyCode::Enter, &tx).await;
        assert!(app.cluster_overlay.is_none());
    }

    #[tokio::test]
    async fn load_more_marks_feed_pending_once() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.feeds = vec![feed("https://a/feed", &["a1"], true)];
        app.set_view(View::Feeds);

        press(&mut app, KeyCode::Char('m'), &tx).await;
        assert!(app.feed_more_pending.contains("https://a/feed"));
        // Second press while pending is a no-op
        press(&mut app, KeyCode::Char('m'), &tx).await;
        assert_eq!(app.feed_more_pending.len(), 1);
    }

    #[tokio::test]
    async fn brackets_cycle_tabs() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.set_view(View::Feeds);
        app.tabs = ["all", "tech", "world"]
            .iter()
            .map(|n| TabResponse { name: n.to_string() })
            .collect();
        app.active_tab = "all".to_string();
        let generation = app.feeds_generation;

        press(&mut app, KeyCode::Char('['), &tx).await;
        assert_eq!(app.active_tab, "world");
        press(&mut app, KeyCode::Char(']'), &tx).await;
        assert_eq!(app.active_tab, "all");
        assert_eq!(app.feeds_generation, generation + 2);
        assert!(app.feeds_loading);
    }
}

//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, background task events, theme changes and a
//! periodic tick.

use crate::app::{App, AppEvent, View};
use anyhow::Result;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::handle_app_event;
use super::input::handle_input;
use super::render::render;
use super::tasks::{spawn_header_resolve, spawn_timeline_page, start};

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` over:
/// - **Terminal input**: key presses from crossterm's async event stream
/// - **Theme changes**: published by the app's `ThemeSignal`
/// - **Background tasks**: feeds, timeline pages, header colors via `AppEvent`
/// - **Periodic tick**: 250ms timer for status expiry
///
/// Installs a panic hook that restores terminal state before unwinding.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut theme_changes = app.theme.subscribe();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // On non-Unix platforms these become pending futures that never complete
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    start(app, &event_tx);

    loop {
        // Header colors are applied from resolver tasks
        if app.header_styles.take_dirty() {
            app.needs_redraw = true;
        }

        // Only render when state has changed
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
            check_sentinel(app, &event_tx);
        }

        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Drain pending app events before waiting on input so results are
        // applied promptly during rapid key presses
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx);
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers, &event_tx).await {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => app.set_status(format!("Error: {}", e)),
                        }
                    }
                    Some(Ok(Event::Resize(..))) => app.needs_redraw = true,
                    _ => {}
                }
            }

            Some(theme) = theme_changes.changed() => {
                tracing::info!(theme = theme.as_str(), "Theme changed");
                app.needs_redraw = true;
                spawn_header_resolve(app, &event_tx);
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx);
            }

            _ = tick_interval.tick() => {}
        }
    }

    app.sentinel.teardown();
    restore_terminal(terminal)?;
    Ok(())
}

/// Feed the latest viewport into the scroll sentinel and start the next page
/// when it fires.
fn check_sentinel(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.view != View::Timeline || app.cluster_overlay.is_some() {
        return;
    }
    let fired = app.sentinel.observe(
        app.timeline_state.offset(),
        app.timeline_viewport,
        app.timeline.len(),
    );
    if !fired {
        return;
    }
    tracing::debug!(items = app.timeline.len(), "Timeline sentinel in view");
    if let Some(req) = app.timeline.on_near_bottom() {
        app.needs_redraw = true;
        spawn_timeline_page(app, req, event_tx);
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

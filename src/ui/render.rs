//! Render functions for the TUI.
//!
//! This module handles all rendering logic, dispatching to the appropriate
//! view based on application state.

use crate::app::{App, ClusterItems, ClusterOverlay, View};
use crate::color::ColorPair;
use crate::theme::{Palette, Theme};
use crate::util::{format_relative_time, sanitize_line, truncate_to_width};
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{feeds, help, status, timeline};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 8;

/// Widest a feed title badge may get in a list row.
pub(super) const MAX_BADGE_WIDTH: usize = 24;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // At truly minimal dimensions, we can't render anything meaningful
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let theme = app.current_theme();
    let palette = theme.palette();
    f.render_widget(Block::default().style(palette.page), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view {
        View::Timeline => timeline::render(f, app, chunks[0], &palette),
        View::Feeds => feeds::render(f, app, chunks[0], &palette),
    }
    status::render(f, app, chunks[1], &palette);

    if let Some(overlay) = &app.cluster_overlay {
        render_cluster_overlay(f, app, overlay, theme, &palette);
    }

    if app.show_help {
        help::render(f, &palette);
    }
}

/// Style for a feed header strip or badge.
pub(super) fn header_style(pair: ColorPair) -> Style {
    Style::default()
        .bg(pair.background.into())
        .fg(pair.text.into())
}

/// ` Feed Title ` badge in the feed's header colors.
pub(super) fn feed_badge<'a>(app: &App, feed_title: &str, feed_url: &str, theme: Theme) -> Span<'a> {
    let title = sanitize_line(feed_title);
    let title = truncate_to_width(&title, MAX_BADGE_WIDTH);
    Span::styled(
        format!(" {} ", title),
        header_style(app.header_styles.visible_pair(feed_url, theme)),
    )
}

/// ` · 3h` suffix, or nothing when the date is unknown.
pub(super) fn age_span<'a>(pub_date: Option<i64>, now: &DateTime<Local>, palette: &Palette) -> Span<'a> {
    let age = format_relative_time(pub_date, now);
    if age.is_empty() {
        Span::raw("")
    } else {
        Span::styled(format!(" · {}", age), palette.muted)
    }
}

fn render_cluster_overlay(
    f: &mut Frame,
    app: &App,
    overlay: &ClusterOverlay,
    theme: Theme,
    palette: &Palette,
) {
    let area = centered_rect(80, 60, f.area());
    if area.width < 20 || area.height < 5 {
        return;
    }
    f.render_widget(Clear, area);

    let title = format!(
        " {} ",
        truncate_to_width(&sanitize_line(&overlay.title), area.width.saturating_sub(4) as usize)
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_focused)
        .title(title)
        .style(palette.page);

    match &overlay.items {
        ClusterItems::Loading => {
            f.render_widget(Paragraph::new("Loading related stories...").block(block), area);
        }
        ClusterItems::Failed(msg) => {
            let text = Line::from(vec![
                Span::styled(format!("Failed to load: {}", msg), palette.error),
                Span::styled("  (Esc to close)", palette.muted),
            ]);
            f.render_widget(Paragraph::new(text).block(block), area);
        }
        ClusterItems::Loaded(items) if items.is_empty() => {
            f.render_widget(Paragraph::new("No related stories").block(block), area);
        }
        ClusterItems::Loaded(items) => {
            let now = Local::now();
            let rows: Vec<ListItem> = items
                .iter()
                .map(|story| {
                    ListItem::new(Line::from(vec![
                        feed_badge(app, &story.feed_title, &story.feed_url, theme),
                        Span::raw(" "),
                        Span::raw(sanitize_line(&story.title).into_owned()),
                        age_span(story.pub_date, &now, palette),
                    ]))
                })
                .collect();
            let list = List::new(rows).block(block).highlight_style(palette.selected);
            let mut state = ListState::default().with_selected(Some(overlay.selected));
            f.render_stateful_widget(list, area, &mut state);
        }
    }
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

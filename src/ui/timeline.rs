use crate::app::App;
use crate::theme::Palette;
use crate::timeline::LoadState;
use crate::util::sanitize_line;
use chrono::Local;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::render::{age_span, feed_badge};

/// Render the timeline list.
///
/// Records the list's inner height in `app.timeline_viewport`; the loop uses
/// it together with the list offset to drive the scroll sentinel.
pub fn render(f: &mut Frame, app: &mut App, area: Rect, palette: &Palette) {
    let theme = app.current_theme();
    let mut title = format!(" Timeline ({}", app.timeline.len());
    if app.timeline.total_count() > 0 {
        title.push_str(&format!(" of {}", app.timeline.total_count()));
    }
    title.push(')');
    if app.timeline.is_clustering() {
        title.push_str(" · clustering");
    }
    title.push(' ');

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_focused)
        .title(title);
    app.timeline_viewport = area.height.saturating_sub(2) as usize;

    if app.timeline.is_empty() {
        let line = match app.timeline.state() {
            LoadState::Loading => Line::styled("Loading timeline...", palette.muted),
            LoadState::Errored => Line::from(vec![
                Span::styled(
                    format!(
                        "Failed to load timeline: {}",
                        app.timeline.last_error().map(|e| e.summary()).unwrap_or_default()
                    ),
                    palette.error,
                ),
                Span::styled("  [r]etry", palette.muted),
            ]),
            LoadState::Idle | LoadState::Exhausted => Line::styled(
                format!("No stories in the last {} days", app.config.timeline_days),
                palette.muted,
            ),
        };
        f.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    let now = Local::now();
    let mut rows: Vec<ListItem> = app
        .timeline
        .items()
        .iter()
        .map(|item| {
            let mut spans = vec![
                feed_badge(app, &item.feed_title, &item.feed_url, theme),
                Span::raw(" "),
                Span::raw(sanitize_line(&item.title).into_owned()),
                age_span(item.pub_date, &now, palette),
            ];
            if item.expandable_cluster().is_some() {
                let others = item.cluster_size.unwrap_or(1).saturating_sub(1);
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!(" +{} ", others), palette.cluster_badge));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    // Footer row past the last item
    let footer = match app.timeline.state() {
        LoadState::Loading => Some(Line::styled("Loading more...", palette.muted)),
        LoadState::Errored => Some(Line::from(vec![
            Span::styled(
                format!(
                    "Failed to load more: {}",
                    app.timeline.last_error().map(|e| e.summary()).unwrap_or_default()
                ),
                palette.error,
            ),
            Span::styled("  [r]etry", palette.muted),
        ])),
        LoadState::Exhausted => Some(Line::styled("End of timeline", palette.muted)),
        LoadState::Idle => None,
    };
    rows.extend(footer.map(ListItem::new));

    let list = List::new(rows)
        .block(block)
        .highlight_style(palette.selected);
    f.render_stateful_widget(list, area, &mut app.timeline_state);
}

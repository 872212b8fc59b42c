use crate::app::{App, FeedRow};
use crate::theme::Palette;
use crate::util::{sanitize_line, truncate_to_width};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
    Frame,
};

use super::render::{age_span, header_style};

/// Render the tab bar and the per-feed lists
pub fn render(f: &mut Frame, app: &mut App, area: Rect, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    render_tabs(f, app, chunks[0], palette);
    render_feeds(f, app, chunks[1], palette);
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    if app.tabs.is_empty() {
        let line = Line::styled(format!(" {} ", app.active_tab), palette.tab_active);
        f.render_widget(Paragraph::new(line), area);
        return;
    }
    let titles: Vec<Line> = app.tabs.iter().map(|t| Line::from(t.name.clone())).collect();
    let selected = app
        .tabs
        .iter()
        .position(|t| t.name == app.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(palette.tab_inactive)
        .highlight_style(palette.tab_active);
    f.render_widget(tabs, area);
}

fn render_feeds(f: &mut Frame, app: &mut App, area: Rect, palette: &Palette) {
    let mut title = format!(" Feeds ({}) ", app.feeds.len());
    if app.feeds_clustering {
        title.push_str("· clustering ");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_focused)
        .title(title);

    if app.feeds.is_empty() {
        let line = if app.feeds_loading {
            Line::styled("Loading feeds...", palette.muted)
        } else if let Some(err) = &app.feeds_error {
            Line::from(vec![
                Span::styled(format!("Failed to load feeds: {}", err), palette.error),
                Span::styled("  [r]eload", palette.muted),
            ])
        } else {
            Line::styled("No feeds in this tab", palette.muted)
        };
        f.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    let theme = app.current_theme();
    let width = area.width.saturating_sub(2) as usize;
    let now = Local::now();

    let rows: Vec<ListItem> = app
        .feed_rows()
        .into_iter()
        .filter_map(|row| {
            let feed = app.feeds.get(row.feed_index())?;
            let item = match row {
                FeedRow::Header(_) => {
                    let pair = app.header_styles.visible_pair(&feed.url, theme);
                    let text = format!(
                        " {}  {}",
                        sanitize_line(&feed.title),
                        sanitize_line(&feed.display_link)
                    );
                    let text = truncate_to_width(&text, width).into_owned();
                    ListItem::new(Line::from(text)).style(header_style(pair))
                }
                FeedRow::Item(_, i) => {
                    let entry = feed.items.get(i)?;
                    ListItem::new(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(sanitize_line(&entry.title).into_owned(), palette.link),
                        age_span(entry.pub_date, &now, palette),
                    ]))
                }
                FeedRow::More(_) => {
                    let text = if app.feed_more_pending.contains(&feed.url) {
                        "  loading...".to_string()
                    } else {
                        format!(
                            "  [m] more ({} of {})",
                            feed.items.len(),
                            feed.total_item_count
                        )
                    };
                    ListItem::new(Line::styled(text, palette.muted))
                }
            };
            Some(item)
        })
        .collect();

    let list = List::new(rows)
        .block(block)
        .highlight_style(palette.selected);
    f.render_stateful_widget(list, area, &mut app.feeds_state);
}

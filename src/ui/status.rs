use crate::app::{App, View};
use crate::theme::Palette;
use crate::timeline::LoadState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    // Status bar needs at least 1 char width to be meaningful
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Use Cow to avoid allocations for static strings and borrowed status messages
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        match app.view {
            View::Timeline => match app.timeline.state() {
                LoadState::Errored => Cow::Borrowed("[r]etry [R]eload [Tab]feeds [t]heme [?]help [q]uit"),
                _ => Cow::Borrowed(
                    "[j/k]move [c]luster [o]pen [R]eload [Tab]feeds [t]heme [?]help [q]uit",
                ),
            },
            View::Feeds => {
                Cow::Borrowed("[j/k]move [[/]]tab [m]ore [o]pen [r]eload [Tab]timeline [t]heme [q]uit")
            }
        }
    };

    let clustering = match app.view {
        View::Timeline => app.timeline.is_clustering(),
        View::Feeds => app.feeds_clustering,
    };
    let right = format!(
        " {}{} ",
        if clustering { "clustering · " } else { "" },
        app.current_theme().as_str()
    );
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right.len() as u16)])
        .split(area);

    f.render_widget(Paragraph::new(text).style(palette.status_bar), chunks[0]);
    f.render_widget(
        Paragraph::new(right)
            .alignment(Alignment::Right)
            .style(palette.status_bar),
        chunks[1],
    );
}

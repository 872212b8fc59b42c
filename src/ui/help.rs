//! Help overlay: keybinding table.

use crate::theme::Palette;
use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

use super::render::centered_rect;

/// Keybindings grouped by view, in display order.
const BINDINGS: [(&str, &[(&str, &str)]); 4] = [
    (
        "General",
        &[
            ("j / k", "Move down / up"),
            ("o", "Open selection in browser"),
            ("t", "Toggle light/dark theme"),
            ("Tab", "Switch timeline / feeds"),
            ("?", "Toggle this help"),
            ("q / Esc", "Quit"),
        ],
    ),
    (
        "Timeline",
        &[
            ("c / Enter", "Show other stories in cluster"),
            ("PgDn / PgUp", "Page down / up"),
            ("g / G", "First / last story"),
            ("r", "Retry failed page"),
            ("R", "Reload from the start"),
        ],
    ),
    (
        "Feeds",
        &[
            ("[ / ]", "Previous / next tab"),
            ("m", "Load more items for feed"),
            ("r", "Reload feeds"),
        ],
    ),
    (
        "Cluster",
        &[("o / Enter", "Open story"), ("Esc / c", "Close")],
    ),
];

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame, palette: &Palette) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (label, bindings) in BINDINGS {
        rows.push(Row::new(vec![
            Line::from(Span::styled(
                format!("-- {} --", label),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ]));
        for (key, description) in bindings {
            rows.push(Row::new(vec![format!("  {}", key), description.to_string()]));
        }
        rows.push(Row::new(vec![String::new(), String::new()]));
    }
    rows.pop();

    let widths = [Constraint::Length(16), Constraint::Min(20)];
    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(palette.border_focused)
                .title(" Help (? to close) "),
        )
        .style(palette.page);

    f.render_widget(table, overlay);
}

//! Light/dark theme and the terminal palette for each.
//!
//! The `Theme` value selects a `Palette`; [`signal`] owns the live value
//! and notifies subscribers when it changes.

use ratatui::style::{Color, Modifier, Style};

pub mod signal;

pub use signal::{detect_system_theme, ThemeSignal, ThemeState, ThemeSubscription};

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Name used for persistence and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Light => Palette::light(),
            Self::Dark => Palette::dark(),
        }
    }
}

// ============================================================================
// Palette
// ============================================================================

/// Styles for every non-header UI role.
#[derive(Debug, Clone)]
pub struct Palette {
    pub page: Style,
    pub muted: Style,
    pub link: Style,
    pub selected: Style,
    pub border: Style,
    pub border_focused: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub cluster_badge: Style,
    pub status_bar: Style,
    pub error: Style,
}

impl Palette {
    fn light() -> Self {
        Self {
            page: Style::default().bg(Color::Rgb(255, 255, 255)).fg(Color::Rgb(15, 23, 42)),
            muted: Style::default().fg(Color::Rgb(71, 85, 105)),
            link: Style::default().fg(Color::Rgb(29, 78, 216)),
            selected: Style::default()
                .bg(Color::Rgb(219, 234, 254))
                .fg(Color::Rgb(15, 23, 42))
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Rgb(203, 213, 225)),
            border_focused: Style::default().fg(Color::Rgb(29, 78, 216)),
            tab_active: Style::default()
                .fg(Color::Rgb(15, 23, 42))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::Rgb(100, 116, 139)),
            cluster_badge: Style::default().bg(Color::Rgb(226, 232, 240)).fg(Color::Rgb(15, 23, 42)),
            status_bar: Style::default().bg(Color::Rgb(226, 232, 240)).fg(Color::Rgb(15, 23, 42)),
            error: Style::default().fg(Color::Rgb(185, 28, 28)),
        }
    }

    fn dark() -> Self {
        Self {
            page: Style::default().bg(Color::Rgb(15, 23, 42)).fg(Color::Rgb(226, 232, 240)),
            muted: Style::default().fg(Color::Rgb(148, 163, 184)),
            link: Style::default().fg(Color::Rgb(147, 197, 253)),
            selected: Style::default()
                .bg(Color::Rgb(30, 58, 138))
                .fg(Color::Rgb(248, 250, 252))
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Rgb(51, 65, 85)),
            border_focused: Style::default().fg(Color::Rgb(147, 197, 253)),
            tab_active: Style::default()
                .fg(Color::Rgb(248, 250, 252))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::Rgb(148, 163, 184)),
            cluster_badge: Style::default().bg(Color::Rgb(51, 65, 85)).fg(Color::Rgb(248, 250, 252)),
            status_bar: Style::default().bg(Color::Rgb(30, 41, 59)).fg(Color::Rgb(226, 232, 240)),
            error: Style::default().fg(Color::Rgb(252, 165, 165)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{is_legible, Rgb};

    fn fg_bg(style: Style) -> (Rgb, Rgb) {
        match (style.fg, style.bg) {
            (Some(Color::Rgb(fr, fg, fb)), Some(Color::Rgb(br, bgc, bb))) => {
                (Rgb::new(fr, fg, fb), Rgb::new(br, bgc, bb))
            }
            other => panic!("expected rgb fg/bg, got {:?}", other),
        }
    }

    #[test]
    fn from_str_name() {
        assert_eq!(Theme::from_str_name("dark"), Some(Theme::Dark));
        assert_eq!(Theme::from_str_name("Light"), Some(Theme::Light));
        assert_eq!(Theme::from_str_name(" DARK\n"), Some(Theme::Dark));
        assert_eq!(Theme::from_str_name("sepia"), None);
    }

    #[test]
    fn toggled_round_trips() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Light.toggled().toggled(), Theme::Light);
        assert_eq!(Theme::default(), Theme::Light);
    }

    #[test]
    fn page_and_chrome_are_legible_in_both_themes() {
        for theme in [Theme::Light, Theme::Dark] {
            let p = theme.palette();
            for style in [p.page, p.selected, p.status_bar, p.cluster_badge] {
                let (fg, bg) = fg_bg(style);
                assert!(is_legible(fg, bg), "{:?} {:?}", theme, style);
            }
        }
    }
}

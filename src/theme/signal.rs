//! Live theme state with explicit subscriptions.
//!
//! Precedence: a persisted explicit choice beats the system preference,
//! which beats the compiled default (light). Once the user has toggled, system
//! preference changes are ignored.

use tokio::sync::watch;

use super::Theme;
use crate::storage::Database;

/// Preference key holding the user's explicit theme choice.
pub const THEME_PREFERENCE_KEY: &str = "theme.choice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeState {
    pub theme: Theme,
    /// True once the persisted/system preference has been applied.
    pub mounted: bool,
}

/// Owner of the process-wide theme value.
///
/// Readers call [`ThemeSignal::subscribe`] and drop the returned
/// [`ThemeSubscription`] to unsubscribe.
pub struct ThemeSignal {
    tx: watch::Sender<ThemeState>,
    db: Database,
    explicit_choice: bool,
}

impl ThemeSignal {
    pub fn new(db: Database) -> Self {
        let (tx, _) = watch::channel(ThemeState::default());
        Self {
            tx,
            db,
            explicit_choice: false,
        }
    }

    /// Apply the persisted choice, else `system`, else the default.
    pub async fn init(&mut self, system: Option<Theme>) -> Theme {
        let saved = match self.db.get_preference(THEME_PREFERENCE_KEY).await {
            Ok(value) => value.as_deref().and_then(Theme::from_str_name),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved theme, ignoring");
                None
            }
        };
        self.explicit_choice = saved.is_some();

        let theme = saved.or(system).unwrap_or_default();
        self.tx.send_replace(ThemeState {
            theme,
            mounted: true,
        });
        tracing::debug!(
            theme = theme.as_str(),
            explicit = self.explicit_choice,
            "Theme initialized"
        );
        theme
    }

    pub fn current(&self) -> Theme {
        self.tx.borrow().theme
    }

    pub fn state(&self) -> ThemeState {
        *self.tx.borrow()
    }

    pub fn has_explicit_choice(&self) -> bool {
        self.explicit_choice
    }

    pub fn subscribe(&self) -> ThemeSubscription {
        ThemeSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Flip the theme and persist it as an explicit choice.
    ///
    /// The new theme is published before the save; a failed save is logged
    /// and the in-memory choice still counts as explicit.
    pub async fn toggle(&mut self) -> Theme {
        let theme = self.current().toggled();
        self.publish(theme);
        self.explicit_choice = true;

        if let Err(e) = self.db.set_preference(THEME_PREFERENCE_KEY, theme.as_str()).await {
            tracing::warn!(theme = theme.as_str(), error = %e, "Failed to persist theme choice");
        }
        tracing::info!(theme = theme.as_str(), "Theme toggled");
        theme
    }

    /// Handle a system preference change. Returns true if the theme changed.
    pub fn system_preference_changed(&mut self, system: Theme) -> bool {
        if self.explicit_choice {
            tracing::debug!(
                system = system.as_str(),
                "Ignoring system theme change, explicit choice saved"
            );
            return false;
        }
        self.publish(system)
    }

    fn publish(&self, theme: Theme) -> bool {
        self.tx.send_if_modified(|state| {
            if state.theme == theme {
                false
            } else {
                state.theme = theme;
                true
            }
        })
    }
}

/// A reader's handle on the theme. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ThemeSubscription {
    rx: watch::Receiver<ThemeState>,
}

impl ThemeSubscription {
    pub fn current(&self) -> Theme {
        self.rx.borrow().theme
    }

    /// True if the theme changed since it was last observed.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next change. `None` once the signal is gone.
    pub async fn changed(&mut self) -> Option<Theme> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().theme)
    }

    /// Mark the current value as seen and return it.
    pub fn observe(&mut self) -> Theme {
        self.rx.borrow_and_update().theme
    }
}

/// Terminal color-scheme preference from `COLORFGBG`, if set.
pub fn detect_system_theme() -> Option<Theme> {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| theme_from_colorfgbg(&v))
}

/// Interpret a `COLORFGBG` value (`fg;bg` or `fg;default;bg`).
fn theme_from_colorfgbg(value: &str) -> Option<Theme> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    match bg {
        0..=6 | 8 => Some(Theme::Dark),
        7 | 9..=15 => Some(Theme::Light),
        _ => None,
    }
}

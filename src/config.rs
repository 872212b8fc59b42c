//! Configuration file parser for ~/.config/headlines/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as likely typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::theme::Theme;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the headlines server.
    pub server_url: String,

    /// Tab requested from `/api/feeds` on start.
    pub default_tab: String,

    /// Page size for `/api/timeline`.
    pub timeline_limit: usize,

    /// `days` window for `/api/timeline`.
    pub timeline_days: u32,

    /// Page size for `/api/feed_more`.
    pub feed_more_limit: usize,

    pub request_timeout_secs: u64,

    /// Rows before the end of the timeline that count as "near bottom".
    pub sentinel_margin: usize,

    /// Theme to assume when the terminal's preference can't be detected.
    pub theme: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            default_tab: "all".to_string(),
            timeline_limit: 500,
            timeline_days: 14,
            feed_more_limit: 10,
            request_timeout_secs: 30,
            sentinel_margin: 3,
            theme: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "server_url",
        "default_tab",
        "timeline_limit",
        "timeline_days",
        "feed_more_limit",
        "request_timeout_secs",
        "sentinel_margin",
        "theme",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(server = %config.server_url, tab = %config.default_tab, "Loaded configuration");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The `theme` key as a stand-in system preference. Invalid names are
    /// logged and ignored.
    pub fn theme_hint(&self) -> Option<Theme> {
        let name = self.theme.as_deref()?;
        let theme = Theme::from_str_name(name);
        if theme.is_none() {
            tracing::warn!(theme = %name, "Unknown theme in config file, ignoring");
        }
        theme
    }
}

// ============================================================================
// Tests
// ============================================================================

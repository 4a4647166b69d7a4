//! App-wide UI preferences.
//!
//! Only `sidebar_collapsed` and `theme` survive a restart; the command
//! palette and notifications panel always start closed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
            Theme::System => write!(f, "system"),
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            _ => anyhow::bail!("Invalid theme '{}'. Valid values: light, dark, system", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    #[serde(default)]
    pub sidebar_collapsed: bool,
    #[serde(default)]
    pub theme: Theme,
    #[serde(skip)]
    pub command_palette_open: bool,
    #[serde(skip)]
    pub notifications_panel_open: bool,
}

impl UiState {
    /// Load persisted preferences. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read UI state: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse UI state: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create UI state directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize UI state")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write UI state: {}", path.display()))
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        self.sidebar_collapsed
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn toggle_command_palette(&mut self) -> bool {
        self.command_palette_open = !self.command_palette_open;
        self.command_palette_open
    }

    pub fn toggle_notifications_panel(&mut self) -> bool {
        self.notifications_panel_open = !self.notifications_panel_open;
        self.notifications_panel_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_only_sidebar_and_theme_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ui.json");

        let mut state = UiState::default();
        state.toggle_sidebar();
        state.set_theme(Theme::Dark);
        state.toggle_command_palette();
        state.toggle_notifications_panel();
        state.save(&path).unwrap();

        let loaded = UiState::load(&path).unwrap();
        assert!(loaded.sidebar_collapsed);
        assert_eq!(loaded.theme, Theme::Dark);
        assert!(!loaded.command_palette_open);
        assert!(!loaded.notifications_panel_open);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let loaded = UiState::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, UiState::default());
        assert_eq!(loaded.theme, Theme::System);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }
}

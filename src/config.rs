//! Configuration for the lead board, read from `.leadboard/leadboard.toml`.
//!
//! Settings are layered file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [board]
//! activation_distance = 8.0
//! mutation_timeout_ms = 10000
//!
//! [storage]
//! leads_file = "leads.json"
//! audit_file = "activity.jsonl"
//! ui_state_file = "ui.json"
//!
//! [logging]
//! level = "info"
//! json = false
//! log_dir = "logs"
//! ```
//!
//! Relative storage paths resolve against the `.leadboard` directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::BoardOptions;

pub const CONFIG_DIR: &str = ".leadboard";
pub const CONFIG_FILE: &str = "leadboard.toml";

pub const ENV_MUTATION_TIMEOUT_MS: &str = "LEADBOARD_MUTATION_TIMEOUT_MS";
pub const ENV_ACTIVATION_DISTANCE: &str = "LEADBOARD_ACTIVATION_DISTANCE";
pub const ENV_LEADS_FILE: &str = "LEADBOARD_LEADS_FILE";

/// Drag and reconciliation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSection {
    /// Pointer travel in px before a press becomes a drag
    #[serde(default = "default_activation_distance")]
    pub activation_distance: f64,
    /// Upper bound for one status change request
    #[serde(default = "default_mutation_timeout_ms")]
    pub mutation_timeout_ms: u64,
}

fn default_activation_distance() -> f64 {
    8.0
}

fn default_mutation_timeout_ms() -> u64 {
    10_000
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            activation_distance: default_activation_distance(),
            mutation_timeout_ms: default_mutation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_leads_file")]
    pub leads_file: PathBuf,
    #[serde(default = "default_audit_file")]
    pub audit_file: PathBuf,
    #[serde(default = "default_ui_state_file")]
    pub ui_state_file: PathBuf,
}

fn default_leads_file() -> PathBuf {
    PathBuf::from("leads.json")
}

fn default_audit_file() -> PathBuf {
    PathBuf::from("activity.jsonl")
}

fn default_ui_state_file() -> PathBuf {
    PathBuf::from("ui.json")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            leads_file: default_leads_file(),
            audit_file: default_audit_file(),
            ui_state_file: default_ui_state_file(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive used when no env filter is set (e.g. "info", "leadboard=debug")
    #[serde(default)]
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// The complete leadboard.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadboardToml {
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl LeadboardToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse leadboard.toml")
    }

    /// Load from `<dir>/leadboard.toml`, or defaults if the file is missing.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize leadboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.board.activation_distance.is_finite() || self.board.activation_distance < 0.0 {
            warnings.push(format!(
                "Invalid activation_distance {}: should be a non-negative number of pixels",
                self.board.activation_distance
            ));
        }
        if self.board.mutation_timeout_ms == 0 {
            warnings.push("mutation_timeout_ms is 0: every status change will time out".to_string());
        }
        warnings
    }
}

/// Resolved configuration: leadboard.toml merged with environment and CLI.
#[derive(Debug, Clone)]
pub struct LeadboardConfig {
    pub project_dir: PathBuf,
    pub leadboard_dir: PathBuf,
    pub toml: LeadboardToml,
    /// CLI override: verbose logging
    pub verbose: bool,
    /// CLI override: JSON log output
    pub json_logs: bool,
    /// CLI override for the leads file
    pub cli_leads_file: Option<PathBuf>,
}

impl LeadboardConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let leadboard_dir = project_dir.join(CONFIG_DIR);
        let toml = LeadboardToml::load_or_default(&leadboard_dir)?;

        Ok(Self {
            project_dir,
            leadboard_dir,
            toml,
            verbose: false,
            json_logs: false,
            cli_leads_file: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        json_logs: bool,
        leads_file: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.json_logs = json_logs;
        config.cli_leads_file = leads_file;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.leadboard_dir.join(CONFIG_FILE)
    }

    /// Mutation timeout (env → file → default).
    pub fn mutation_timeout(&self) -> Duration {
        let ms = env_parse::<u64>(ENV_MUTATION_TIMEOUT_MS).unwrap_or(self.toml.board.mutation_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Pointer activation distance (env → file → default).
    pub fn activation_distance(&self) -> f64 {
        env_parse::<f64>(ENV_ACTIVATION_DISTANCE)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(self.toml.board.activation_distance)
    }

    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            activation_distance: self.activation_distance(),
            mutation_timeout: self.mutation_timeout(),
        }
    }

    /// Leads file (CLI → env → file → default).
    pub fn leads_file(&self) -> PathBuf {
        if let Some(path) = &self.cli_leads_file {
            return path.clone();
        }
        if let Ok(path) = std::env::var(ENV_LEADS_FILE)
            && !path.trim().is_empty()
        {
            return PathBuf::from(path);
        }
        self.resolve(&self.toml.storage.leads_file)
    }

    pub fn audit_file(&self) -> PathBuf {
        self.resolve(&self.toml.storage.audit_file)
    }

    pub fn ui_state_file(&self) -> PathBuf {
        self.resolve(&self.toml.storage.ui_state_file)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.toml.logging.log_dir.as_deref().map(|p| self.resolve(p))
    }

    pub fn json_logs(&self) -> bool {
        self.json_logs || self.toml.logging.json
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.leadboard_dir.join(path)
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            std::env::remove_var(ENV_MUTATION_TIMEOUT_MS);
            std::env::remove_var(ENV_ACTIVATION_DISTANCE);
            std::env::remove_var(ENV_LEADS_FILE);
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();

        let config = LeadboardConfig::new(dir.path().to_path_buf()).unwrap();

        assert_eq!(config.mutation_timeout(), Duration::from_secs(10));
        assert_eq!(config.activation_distance(), 8.0);
        assert!(config.leads_file().ends_with(".leadboard/leads.json"));
        assert!(config.log_dir().is_none());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let toml = LeadboardToml::parse(
            r#"
[board]
mutation_timeout_ms = 2500
"#,
        )
        .unwrap();
        assert_eq!(toml.board.mutation_timeout_ms, 2500);
        assert_eq!(toml.board.activation_distance, 8.0);
        assert_eq!(toml.storage, StorageSection::default());
    }

    #[test]
    fn test_layering_file_env_cli() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let lb_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&lb_dir).unwrap();
        std::fs::write(
            lb_dir.join(CONFIG_FILE),
            r#"
[board]
activation_distance = 4.0
mutation_timeout_ms = 500

[storage]
leads_file = "/srv/leads.json"

[logging]
json = true
log_dir = "logs"
"#,
        )
        .unwrap();

        let config = LeadboardConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(config.activation_distance(), 4.0);
        assert_eq!(config.mutation_timeout(), Duration::from_millis(500));
        assert_eq!(config.leads_file(), PathBuf::from("/srv/leads.json"));
        assert!(config.json_logs());
        assert!(config.log_dir().unwrap().ends_with(".leadboard/logs"));

        unsafe {
            std::env::set_var(ENV_MUTATION_TIMEOUT_MS, "750");
            std::env::set_var(ENV_LEADS_FILE, "/tmp/env-leads.json");
        }
        assert_eq!(config.mutation_timeout(), Duration::from_millis(750));
        assert_eq!(config.leads_file(), PathBuf::from("/tmp/env-leads.json"));

        let config = LeadboardConfig::with_cli_args(
            dir.path().to_path_buf(),
            true,
            false,
            Some(PathBuf::from("cli.json")),
        )
        .unwrap();
        assert_eq!(config.leads_file(), PathBuf::from("cli.json"));

        clear_env();
    }

    #[test]
    fn test_bad_env_value_falls_back_to_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config = LeadboardConfig::new(dir.path().to_path_buf()).unwrap();

        unsafe { std::env::set_var(ENV_ACTIVATION_DISTANCE, "far") };
        assert_eq!(config.activation_distance(), 8.0);
        clear_env();
    }

    #[test]
    fn test_validate_flags_zero_timeout() {
        let toml = LeadboardToml::parse("[board]\nmutation_timeout_ms = 0\n").unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mutation_timeout_ms"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = LeadboardToml::default();
        toml.board.mutation_timeout_ms = 1234;
        toml.save(&path).unwrap();
        assert_eq!(LeadboardToml::load(&path).unwrap(), toml);
    }
}

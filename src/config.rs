//! Configuration for the request triage core.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TRIAGO_` and use double
//! underscores to separate nested levels:
//! - `TRIAGO_WATCHER__DEBOUNCE_MS=750` sets `watcher.debounce_ms`
//! - `TRIAGO_REGISTRY__LOCK_WAIT_MS=10000` sets `registry.lock_wait_ms`
//! - `TRIAGO_BACKUP__MAX_SNAPSHOTS=20` sets `backup.max_snapshots`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from writing or initializing configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file already exists at {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration serialization error: {0}")]
    Serialize(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .triago is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Category registry and lock settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Document watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Snapshot archive settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Keyword tables for free-text classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistryConfig {
    /// Path to the persisted category registry
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Path to the exclusive lock marker
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    /// Path to the append-only assignment audit log
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,

    /// Interval between lock claim attempts, in milliseconds
    #[serde(default = "default_lock_poll_ms")]
    pub lock_poll_ms: u64,

    /// Total wait ceiling for lock acquisition, in milliseconds
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Age past which a lock marker is reclaimed, in seconds.
    /// Zero disables age-based reclaim (dead-owner reclaim still applies).
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// The document kept under guard
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,

    /// Quiet period before a modification is handled, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Emit a synthetic created event for a file that already exists
    /// when the watch starts
    #[serde(default = "default_true")]
    pub emit_initial: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackupConfig {
    /// Directory holding timestamped snapshots and the latest pointer
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Maximum snapshots retained on disk. Zero keeps everything.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

/// One classification rule: a label plus the keywords that select it.
///
/// Rules are matched in order; the first rule with any keyword contained
/// in the text wins.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeywordRule {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// Application-type rules, in match-priority order
    #[serde(default = "default_app_types")]
    pub app_types: Vec<KeywordRule>,

    /// Priority rules, in match-priority order
    #[serde(default = "default_priorities")]
    pub priorities: Vec<KeywordRule>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules (error/warn/info/debug/trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `triago::watcher = "debug"`
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_registry_path() -> PathBuf {
    PathBuf::from(".triago/registry.json")
}
fn default_lock_path() -> PathBuf {
    PathBuf::from(".triago/registry.lock")
}
fn default_audit_path() -> PathBuf {
    PathBuf::from(".triago/audit.log")
}
fn default_lock_poll_ms() -> u64 {
    100
}
fn default_lock_wait_ms() -> u64 {
    5_000
}
fn default_lock_stale_secs() -> u64 {
    600
}
fn default_document_path() -> PathBuf {
    PathBuf::from("REQUESTS.md")
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_backup_dir() -> PathBuf {
    PathBuf::from(".triago/backups")
}
fn default_max_snapshots() -> usize {
    0
}
fn default_log_level() -> String {
    "warn".to_string()
}

fn rule(label: &str, keywords: &[&str]) -> KeywordRule {
    KeywordRule {
        label: label.to_string(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_app_types() -> Vec<KeywordRule> {
    vec![
        rule("web", &["web", "ウェブ", "サイト", "ブラウザ"]),
        rule("mobile", &["mobile", "モバイル", "スマホ", "ios", "android"]),
        rule("desktop", &["desktop", "デスクトップ", "ツール"]),
        rule("cli", &["cli", "コマンド", "ターミナル", "スクリプト"]),
    ]
}

fn default_priorities() -> Vec<KeywordRule> {
    vec![
        rule("high", &["緊急", "至急", "急ぎ", "urgent", "asap"]),
        rule("low", &["低", "あとで", "後で", "later", "low"]),
        rule("medium", &["通常", "normal", "medium"]),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            debug: false,
            registry: RegistryConfig::default(),
            watcher: WatcherConfig::default(),
            backup: BackupConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            lock_path: default_lock_path(),
            audit_path: default_audit_path(),
            lock_poll_ms: default_lock_poll_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            lock_stale_secs: default_lock_stale_secs(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            debounce_ms: default_debounce_ms(),
            emit_initial: true,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            max_snapshots: default_max_snapshots(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            app_types: default_app_types(),
            priorities: default_priorities(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Interval between lock claim attempts.
    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }

    /// Total wait ceiling for lock acquisition.
    pub fn lock_max_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Staleness threshold for abandoned lock markers, `None` when
    /// age-based reclaim is disabled.
    pub fn lock_stale_after(&self) -> Option<Duration> {
        if self.lock_stale_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.lock_stale_secs))
        }
    }
}

impl WatcherConfig {
    /// Quiet period before a modification is handled.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl BackupConfig {
    /// Snapshot retention cap, `None` when everything is kept.
    pub fn retention(&self) -> Option<usize> {
        if self.max_snapshots == 0 {
            None
        } else {
            Some(self.max_snapshots)
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .triago directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".triago/settings.toml"));

        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with TRIAGO_ prefix
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("TRIAGO_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            // Extract into Settings struct
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRIAGO_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for a .triago directory.
    /// Searches from current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".triago");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Get the workspace root directory (where .triago is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".triago");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        // Try to find workspace config
        let config_path = if let Some(path) = Self::find_workspace_config() {
            path
        } else {
            // No workspace found, check current directory
            PathBuf::from(".triago/settings.toml")
        };

        // Check if settings.toml exists
        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        // Try to parse the config file to check if it's valid
        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'triago init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, toml_string).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Create a default settings file
    pub fn init_config_file(force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = PathBuf::from(".triago/settings.toml");

        if !force && config_path.exists() {
            return Err(ConfigError::AlreadyExists { path: config_path });
        }

        // Create settings with detected workspace root
        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}

//! Sync engine configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::SessionConfig;
use crate::application::services::DedupPolicy;

pub(crate) const APP_NAME: &str = "chatsync";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "chatsync";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub typing: TypingConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// History paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Messages requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Matching of optimistic sends to confirmed messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Maximum distance between local and server timestamps.
    #[serde(default = "default_dedup_window_ms")]
    pub window_ms: u64,

    /// Compare content ignoring case.
    #[serde(default = "default_true")]
    pub case_insensitive: bool,

    /// Compare content ignoring surrounding whitespace.
    #[serde(default = "default_true")]
    pub trim: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_ms: default_dedup_window_ms(),
            case_insensitive: true,
            trim: true,
        }
    }
}

/// Typing indicator timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingConfig {
    /// How long a remote "start" stays visible without a refresh.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Quiet period before the local "stop" is sent.
    #[serde(default = "default_local_stop_after_ms")]
    pub local_stop_after_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            remote_timeout_ms: default_remote_timeout_ms(),
            local_stop_after_ms: default_local_stop_after_ms(),
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Enable notifications globally.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

const fn default_page_size() -> usize {
    crate::application::DEFAULT_PAGE_SIZE
}

const fn default_dedup_window_ms() -> u64 {
    10_000
}

const fn default_remote_timeout_ms() -> u64 {
    5_000
}

const fn default_local_stop_after_ms() -> u64 {
    2_000
}

const fn default_true() -> bool {
    true
}

use super::args::CliArgs;

impl SyncConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(page_size) = args.page_size {
            self.pagination.page_size = page_size;
        }
        if let Some(window_ms) = args.dedup_window_ms {
            self.dedup.window_ms = window_ms;
        }
        if let Some(enabled) = args.notifications {
            self.notifications.enabled = enabled;
        }
    }

    /// Builds the session tunables from this configuration.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let dedup = DedupPolicy::new(Duration::from_millis(self.dedup.window_ms))
            .with_case_insensitive(self.dedup.case_insensitive)
            .with_trim(self.dedup.trim);

        SessionConfig {
            page_size: self.pagination.page_size.max(1),
            dedup,
            remote_typing_timeout: Duration::from_millis(self.typing.remote_timeout_ms),
            local_typing_stop_after: Duration::from_millis(self.typing.local_stop_after_ms),
            notifications_enabled: self.notifications.enabled,
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("chatsync.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            pagination: PaginationConfig::default(),
            dedup: DedupConfig::default(),
            typing: TypingConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [dedup]
            window_ms = 2500
            case_insensitive = false

            [typing]
            remote_timeout_ms = 8000
        "#;

        let config: SyncConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.dedup.window_ms, 2500);
        assert!(!config.dedup.case_insensitive);
        assert!(config.dedup.trim);
        assert_eq!(config.typing.remote_timeout_ms, 8000);
        assert_eq!(config.typing.local_stop_after_ms, 2000);
        assert_eq!(config.pagination.page_size, 50);
    }

    #[test]
    fn test_default_config() {
        let session = SyncConfig::default().session_config();

        assert_eq!(session, SessionConfig::default());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = SyncConfig::default();
        let args = CliArgs::parse_from([
            "chatsync",
            "--log-level",
            "trace",
            "--page-size",
            "20",
            "--notifications",
            "false",
            "script.json",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.pagination.page_size, 20);
        assert!(!config.notifications.enabled);
        assert_eq!(config.dedup.window_ms, 10_000);
        assert!(!args.save_config);
    }

    #[test]
    fn test_save_config_flag() {
        let args = CliArgs::parse_from(["chatsync", "--save-config", "--json", "script.json"]);
        assert!(args.save_config);
        assert!(args.json);
    }

    #[test]
    fn test_session_config_clamps_page_size() {
        let mut config = SyncConfig::default();
        config.pagination.page_size = 0;
        assert_eq!(config.session_config().page_size, 1);
    }
}

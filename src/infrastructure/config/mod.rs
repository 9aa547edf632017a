//! Engine configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    DedupConfig, LogLevel, NotificationsConfig, PaginationConfig, SyncConfig, TypingConfig,
};
pub use args::CliArgs;
pub use storage::{ConfigError, ConfigStore};

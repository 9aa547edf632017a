use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "chatsync",
    version,
    about = "Replays a channel script through the message sync engine",
    long_about = None
)]
pub struct CliArgs {
    /// Replay script (JSON).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Messages requested per history page.
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Dedup window in milliseconds.
    #[arg(long)]
    pub dedup_window_ms: Option<u64>,

    /// Enable notifications.
    #[arg(long)]
    pub notifications: Option<bool>,

    /// Print the final state as JSON instead of a thread tree.
    #[arg(long)]
    pub json: bool,

    /// Write the effective configuration back to the config directory.
    #[arg(long)]
    pub save_config: bool,
}

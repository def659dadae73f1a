//! Admin notice CLI - watch the admin console's notice channel from a terminal.
//!
//! `notice watch` keeps the real-time channel open and shows each new notice
//! as it arrives; the other commands wrap the notice REST endpoints and the
//! local configuration file.

mod commands;
mod presenters;

use clap::{Parser, Subcommand};
use tracing::info;

use notice_core::config::{AppConfig, ConfigHandle};
use notice_core::error::NoticeResult;
use notice_core::logging;

/// Real-time notices from the admin console.
#[derive(Parser)]
#[command(
    name = "notice",
    version,
    about = "Admin console notice client",
    long_about = "Keeps a live connection to the admin server's notice channel and\n\
                   shows new notices and announcements as they are published."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the notice channel and show notices until Ctrl+C.
    Watch {
        /// Console origin (overrides config).
        #[arg(short, long)]
        origin: Option<String>,
        /// Session token (overrides config).
        #[arg(short, long)]
        token: Option<String>,
        /// Do not raise desktop notifications.
        #[arg(long)]
        no_desktop: bool,
    },
    /// Query notices over the REST API.
    Notices {
        #[command(subcommand)]
        action: commands::notices::NoticesAction,
    },
    /// View and create the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> NoticeResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match cli.config.as_deref() {
        Some(path) => std::path::PathBuf::from(path),
        None => AppConfig::default_config_path().unwrap_or_else(|_| "config.toml".into()),
    };
    let config = if config_path.exists() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    // Initialize logging
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = logging::init_from_config(&config.logging, &log_dir, cli.verbose)?;

    let config_handle = ConfigHandle::new(config);

    info!("admin notice CLI v{}", notice_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Watch { origin, token, no_desktop } => {
            commands::watch::run(config_handle, origin, token, !no_desktop, cli.format).await
        }
        Commands::Notices { action } => {
            commands::notices::run(config_handle, action, cli.format).await
        }
        Commands::Config { action } => {
            commands::config::run(config_handle, &config_path, action, cli.format).await
        }
    }
}

//! Config commands.

use std::path::Path;

use clap::Subcommand;
use console::style;
use dialoguer::{Input, Password};

use notice_core::config::{AppConfig, ConfigHandle};
use notice_core::error::{NoticeError, NoticeResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Interactively set the origin and token and save the file.
    Init,
}

pub async fn run(
    config: ConfigHandle,
    path: &Path,
    action: ConfigAction,
    format: OutputFormat,
) -> NoticeResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&redacted(&cfg)).unwrap_or_default());
                }
                OutputFormat::Text => print_config(&cfg, path),
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init => {
            let current = config.read().await.server.origin.clone();
            let origin: String = Input::new()
                .with_prompt("Console origin")
                .with_initial_text(current)
                .interact_text()
                .map_err(|e| NoticeError::Internal(e.to_string()))?;
            let token = Password::new()
                .with_prompt("Session token (leave empty to skip)")
                .allow_empty_password(true)
                .interact()
                .map_err(|e| NoticeError::Internal(e.to_string()))?;

            {
                let mut cfg = config.write().await;
                cfg.server.origin = AppConfig::sanitize_origin(&origin);
                if !token.is_empty() {
                    cfg.server.token = token;
                }
            }
            config.save_to(path).await?;
            println!("  {} Config saved to {}", style("OK").green(), path.display());
        }
    }
    Ok(())
}

/// Copy of the config safe to print.
fn redacted(cfg: &AppConfig) -> AppConfig {
    let mut copy = cfg.clone();
    copy.server.token = super::mask_secret(&copy.server.token);
    copy
}

fn print_config(cfg: &AppConfig, path: &Path) {
    let cfg = redacted(cfg);
    println!("{}", style("Configuration").bold().underlined());
    println!("  File:              {}", path.display());
    println!();
    println!("{}", style("[server]").bold());
    println!("  origin:            {}", or_dash(&cfg.server.origin));
    println!("  ws_path:           {}", cfg.server.ws_path);
    println!(
        "  ws_port:           {}",
        cfg.server.ws_port.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("  api_prefix:        {}", cfg.server.api_prefix);
    println!("  token:             {}", or_dash(&cfg.server.token));
    println!("  api_timeout_ms:    {}", cfg.server.api_timeout_ms);
    println!();
    println!("{}", style("[channel]").bold());
    println!("  base_delay_ms:     {}", cfg.channel.base_delay_ms);
    println!("  max_delay_ms:      {}", cfg.channel.max_delay_ms);
    println!("  max_retries:       {}", cfg.channel.max_retries);
    println!("  heartbeat_ms:      {}", cfg.channel.heartbeat_interval_ms);
    println!("  connect_timeout:   {}", cfg.channel.connect_timeout_ms);
    println!();
    println!("{}", style("[logging]").bold());
    println!("  level:             {}", cfg.logging.level);
    println!("  json_output:       {}", cfg.logging.json_output);
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_token() {
        let mut cfg = AppConfig::default();
        cfg.server.token = "abcdefgh".into();
        let shown = redacted(&cfg);
        assert_eq!(shown.server.token, "****efgh");
        assert_eq!(cfg.server.token, "abcdefgh");
    }
}

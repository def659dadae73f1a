//! Watch command - keep the notice channel open and present what arrives.

use std::sync::Arc;

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use notice_core::config::{AppConfig, ConfigHandle};
use notice_core::error::{NoticeError, NoticeResult};
use notice_socket::{
    ChannelStatus, ConnectionState, NoticeChannel, NotificationBus, StartOutcome, StaticCredential,
};

use crate::presenters::{ToastPresenter, UnreadCountRefresher};
use crate::OutputFormat;

/// Run the watch command.
pub async fn run(
    config: ConfigHandle,
    origin: Option<String>,
    token: Option<String>,
    desktop: bool,
    format: OutputFormat,
) -> NoticeResult<()> {
    // Apply overrides
    {
        let mut cfg = config.write().await;
        if let Some(o) = origin {
            cfg.server.origin = AppConfig::sanitize_origin(&o);
        }
        if let Some(t) = token {
            cfg.server.token = t;
        }
    }

    let cfg = config.read().await.clone();
    if !cfg.is_server_configured() {
        return Err(NoticeError::MissingConfig(
            "server origin (use --origin or `notice config init`)".into(),
        ));
    }

    // The bus is shared by the channel and every presenter.
    let bus = NotificationBus::new(cfg.channel.bus_capacity);
    let credentials = Arc::new(StaticCredential::from(&cfg.server));
    let channel = NoticeChannel::from_config(&cfg, credentials, bus.clone())?;
    let api = super::create_api_client(&config).await?;

    // Subscribe before starting so nothing published on open is missed.
    let toast_rx = bus.notices().subscribe();
    let badge_rx = bus.notices().subscribe();
    let mut status = bus.status().subscribe();

    if format == OutputFormat::Text {
        println!(
            "{} Watching {}",
            style("[notice]").bold().dim(),
            channel.endpoint()
        );
    }

    match channel.start().await {
        StartOutcome::Started => {}
        StartOutcome::MissingCredential => {
            println!(
                "  {} Not signed in. Set a token with --token or `notice config init`.",
                style("WARN").yellow()
            );
            return Ok(());
        }
        StartOutcome::AlreadyActive => warn!("channel was already active"),
    }

    let toast = ToastPresenter::new(format, desktop).spawn(toast_rx);
    let (refresher, mut unread) = UnreadCountRefresher::new(api);
    let refresher = refresher.spawn(badge_rx);
    let mut badge_open = true;

    loop {
        tokio::select! {
            update = status.recv() => {
                match update {
                    Ok(update) => {
                        if format == OutputFormat::Text {
                            print_status(&update);
                        }
                        if gave_up(&update) {
                            println!(
                                "  {} Gave up after {} reconnect attempts.",
                                style("FAIL").red().bold(),
                                channel.policy().max_retries
                            );
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => warn!("missed {n} status updates"),
                    Err(RecvError::Closed) => break,
                }
            }
            changed = unread.changed(), if badge_open => {
                if changed.is_err() {
                    badge_open = false;
                    continue;
                }
                let count = *unread.borrow_and_update();
                if let (Some(count), OutputFormat::Text) = (count, format) {
                    println!("  {} {count} unread", style("[badge]").magenta());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n  Disconnecting...");
                break;
            }
        }
    }

    channel.stop().await;
    toast.abort();
    refresher.abort();
    info!("watch finished in state {}", channel.state());
    Ok(())
}

/// The channel reached a state it will not leave on its own.
fn gave_up(update: &ChannelStatus) -> bool {
    matches!(update, ChannelStatus::StateChanged { to, .. } if to.is_terminal())
}

fn print_status(update: &ChannelStatus) {
    match update {
        ChannelStatus::StateChanged { to: ConnectionState::Open, .. } => {
            println!(
                "  {} Connected. Listening for notices... (Ctrl+C to stop)",
                style("OK").green().bold()
            );
        }
        ChannelStatus::StateChanged { from: ConnectionState::Open, to } => {
            println!("  {} Connection {to}", style("WARN").yellow());
        }
        ChannelStatus::ReconnectScheduled { attempt, delay } => {
            println!(
                "  {} Reconnecting in {:.0}s (attempt {attempt})",
                style("...").dim(),
                delay.as_secs_f64()
            );
        }
        _ => {}
    }
}

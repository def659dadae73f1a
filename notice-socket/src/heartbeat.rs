//! Keep-alive pings while the socket is open.
//!
//! The monitor only sends; it does not track pongs. A socket that stalls
//! without closing is not recycled from here.

use std::time::Duration;

use notice_core::config::ChannelConfig;
use notice_core::constants::heartbeat;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Heartbeat settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between pings.
    pub interval: Duration,
    /// Text frame sent on each tick.
    pub ping_payload: String,
    /// Text frame the server answers with.
    pub pong_payload: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(heartbeat::INTERVAL_MS),
            ping_payload: heartbeat::PING.to_string(),
            pong_payload: heartbeat::PONG.to_string(),
        }
    }
}

impl From<&ChannelConfig> for HeartbeatConfig {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            interval: config.heartbeat_interval(),
            ping_payload: config.ping_payload.clone(),
            pong_payload: config.pong_payload.clone(),
        }
    }
}

/// Repeating ping timer, alive only while the connection is open.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self { config, task: None }
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Start pinging through `outbound`. The first ping goes out one full
    /// interval after start. No-op if already running.
    pub fn start(&mut self, outbound: mpsc::Sender<String>) {
        if self.is_running() {
            debug!("heartbeat already running");
            return;
        }

        let period = self.config.interval;
        let ping = self.config.ping_payload.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match outbound.try_send(ping.clone()) {
                    Ok(()) => trace!("heartbeat ping queued"),
                    Err(TrySendError::Full(_)) => debug!("outbound queue full, skipping ping"),
                    Err(TrySendError::Closed(_)) => {
                        debug!("outbound queue closed, heartbeat exiting");
                        break;
                    }
                }
            }
        }));
        debug!("heartbeat started (interval {:?})", period);
    }

    /// Stop pinging. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("heartbeat stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(30),
            ..HeartbeatConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_every_interval() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut monitor = HeartbeatMonitor::new(fast_config());
        monitor.start(tx);

        // Nothing before the first full interval.
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.recv().await.unwrap(), "ping");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.recv().await.unwrap(), "ping");
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_and_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut monitor = HeartbeatMonitor::new(fast_config());
        monitor.start(tx);
        assert!(monitor.is_running());

        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_running());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_one_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut monitor = HeartbeatMonitor::new(fast_config());
        monitor.start(tx.clone());
        monitor.start(tx);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(rx.recv().await.unwrap(), "ping");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_queue_closes() {
        let (tx, rx) = mpsc::channel(8);
        let mut monitor = HeartbeatMonitor::new(fast_config());
        monitor.start(tx);
        drop(rx);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_config_from_channel() {
        let mut channel = ChannelConfig::default();
        channel.heartbeat_interval_ms = 1_500;
        channel.ping_payload = "hb".into();
        let config = HeartbeatConfig::from(&channel);
        assert_eq!(config.interval, Duration::from_millis(1_500));
        assert_eq!(config.ping_payload, "hb");
        assert_eq!(config.pong_payload, "pong");
    }
}

//! Bus subscribers for the watch command.
//!
//! Each presenter owns its own receiver, so a slow one never holds up the
//! other or the channel.

use async_trait::async_trait;
use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use notice_api::ApiClient;
use notice_core::constants::APP_NAME;
use notice_core::error::NoticeResult;
use notice_socket::{NoticeCategory, NoticeEvent};

use crate::OutputFormat;

/// Toast heading for a notice.
pub fn toast_heading(event: &NoticeEvent) -> &'static str {
    match event.category {
        NoticeCategory::Notice => "New notice",
        NoticeCategory::Announcement => "New announcement",
    }
}

/// Toast body for a notice.
pub fn toast_body(event: &NoticeEvent) -> String {
    let publisher = if event.publisher.is_empty() {
        "Someone"
    } else {
        event.publisher.as_str()
    };
    format!("{publisher} published: {}", event.title)
}

/// Prints each notice and optionally raises a desktop notification.
pub struct ToastPresenter {
    format: OutputFormat,
    desktop: bool,
}

impl ToastPresenter {
    pub fn new(format: OutputFormat, desktop: bool) -> Self {
        Self { format, desktop }
    }

    pub fn spawn(self, mut rx: broadcast::Receiver<NoticeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.present(&event),
                    Err(RecvError::Lagged(n)) => {
                        warn!("toast presenter missed {n} notices");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn present(&self, event: &NoticeEvent) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(event).unwrap_or_default());
            }
            OutputFormat::Text => {
                println!(
                    "  {} {}",
                    style(format!("[{}]", toast_heading(event))).cyan().bold(),
                    toast_body(event)
                );
            }
        }

        if self.desktop {
            if let Err(e) = show_desktop(toast_heading(event), &toast_body(event)) {
                warn!("desktop notification failed: {e}");
                debug!("notice was: {}", event.title);
            }
        }
    }
}

fn show_desktop(summary: &str, body: &str) -> NoticeResult<()> {
    #[cfg(not(test))]
    {
        notify_rust::Notification::new()
            .summary(summary)
            .body(body)
            .appname(APP_NAME)
            .show()
            .map_err(|e| notice_core::error::NoticeError::Internal(format!("notification: {e}")))?;
    }

    let _ = (summary, body, APP_NAME);
    Ok(())
}

/// Where the unread count comes from.
#[async_trait]
pub trait UnreadSource: Send + Sync + 'static {
    async fn fetch_unread(&self) -> NoticeResult<u64>;
}

#[async_trait]
impl UnreadSource for ApiClient {
    async fn fetch_unread(&self) -> NoticeResult<u64> {
        self.unread_count().await
    }
}

/// Re-fetches the unread count whenever a notice arrives.
pub struct UnreadCountRefresher<S> {
    source: S,
    badge: watch::Sender<Option<u64>>,
}

impl<S: UnreadSource> UnreadCountRefresher<S> {
    pub fn new(source: S) -> (Self, watch::Receiver<Option<u64>>) {
        let (badge, rx) = watch::channel(None);
        (Self { source, badge }, rx)
    }

    /// Refresh once, then again after every notice.
    pub fn spawn(self, mut rx: broadcast::Receiver<NoticeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.refresh().await;
            loop {
                match rx.recv().await {
                    // A burst only needs one refresh.
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        while rx.try_recv().is_ok() {}
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn refresh(&self) {
        match self.source.fetch_unread().await {
            Ok(count) => {
                debug!("unread count is {count}");
                self.badge.send_replace(Some(count));
            }
            Err(e) => warn!("could not refresh unread count: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notice_socket::NotificationBus;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn event(category: NoticeCategory, publisher: &str) -> NoticeEvent {
        NoticeEvent {
            title: "Release 2.1".into(),
            category,
            publisher: publisher.into(),
        }
    }

    #[test]
    fn test_toast_text() {
        let e = event(NoticeCategory::Notice, "admin");
        assert_eq!(toast_heading(&e), "New notice");
        assert_eq!(toast_body(&e), "admin published: Release 2.1");

        let e = event(NoticeCategory::Announcement, "");
        assert_eq!(toast_heading(&e), "New announcement");
        assert_eq!(toast_body(&e), "Someone published: Release 2.1");
    }

    /// Counts calls and reports the call number as the unread count.
    #[derive(Clone, Default)]
    struct CountingSource {
        calls: Arc<AtomicU64>,
    }

    #[async_trait]
    impl UnreadSource for CountingSource {
        async fn fetch_unread(&self) -> NoticeResult<u64> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test]
    async fn test_refresher_updates_badge_per_notice() {
        let bus = NotificationBus::new(16);
        let source = CountingSource::default();
        let (refresher, mut badge) = UnreadCountRefresher::new(source.clone());
        let task = refresher.spawn(bus.notices().subscribe());

        let initial = *tokio::time::timeout(Duration::from_secs(5), badge.wait_for(|c| c.is_some()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(initial, Some(1));

        bus.notices().publish(event(NoticeCategory::Notice, "admin"));
        let after = *tokio::time::timeout(Duration::from_secs(5), badge.wait_for(|c| *c == Some(2)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after, Some(2));
        task.abort();
    }

    #[tokio::test]
    async fn test_presenters_subscribe_independently() {
        let bus = NotificationBus::new(16);
        let (refresher, _badge) = UnreadCountRefresher::new(CountingSource::default());
        let toast = ToastPresenter::new(OutputFormat::Json, false).spawn(bus.notices().subscribe());
        let badge = refresher.spawn(bus.notices().subscribe());
        assert_eq!(bus.notices().subscriber_count(), 2);

        assert_eq!(bus.notices().publish(event(NoticeCategory::Notice, "admin")), 2);
        toast.abort();
        badge.abort();
    }
}

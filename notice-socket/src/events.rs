//! Event types carried on the notification bus.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::ConnectionState;

/// Kind of notice, as numbered by the admin server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeCategory {
    /// A notice (type 1).
    Notice = 1,
    /// An announcement (type 2).
    Announcement = 2,
}

impl NoticeCategory {
    /// Map the server's numeric type. Anything other than 1 is shown as an
    /// announcement, which is how the console has always labelled it.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::Notice,
            _ => Self::Announcement,
        }
    }

    /// Short label for presenters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Announcement => "announcement",
        }
    }
}

impl std::fmt::Display for NoticeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A freshly published notice. Published once, then dropped by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeEvent {
    pub title: String,
    pub category: NoticeCategory,
    /// Username of whoever published the notice.
    pub publisher: String,
}

/// Health of the channel, for consumers that want to show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    ReconnectScheduled {
        attempt: u32,
        delay: Duration,
    },
    /// No more reconnects will be made.
    Exhausted { attempts: u32 },
}

/// Server→client JSON envelope: `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Payload of a `notice` envelope. Unknown keys (e.g. `id`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NoticePayload {
    pub title: String,
    #[serde(rename = "type", default)]
    pub category: Option<i64>,
    #[serde(rename = "createBy", default)]
    pub create_by: Option<String>,
}

impl From<NoticePayload> for NoticeEvent {
    fn from(payload: NoticePayload) -> Self {
        Self {
            title: payload.title,
            category: NoticeCategory::from_code(payload.category),
            publisher: payload.create_by.unwrap_or_default(),
        }
    }
}

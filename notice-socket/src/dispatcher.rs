//! Classifies inbound text frames and republishes notices on the bus.
//!
//! Everything here is fail-open: pongs, malformed JSON and unknown
//! envelope types are dropped without surfacing an error.

use tracing::debug;

use crate::bus::NotificationBus;
use crate::events::{Envelope, NoticeEvent, NoticePayload};

/// Envelope type carrying a new notice.
pub const NOTICE_TYPE: &str = "notice";

/// What an inbound frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Heartbeat reply.
    Pong,
    Notice(NoticeEvent),
    /// Valid envelope with a type we don't handle, or a notice without
    /// a usable payload.
    Unrecognized(String),
    /// Not JSON, or JSON without a `type`.
    Malformed,
}

#[derive(Debug, Clone)]
pub struct NoticeDispatcher {
    bus: NotificationBus,
    pong_payload: String,
}

impl NoticeDispatcher {
    pub fn new(bus: NotificationBus, pong_payload: impl Into<String>) -> Self {
        Self {
            bus,
            pong_payload: pong_payload.into(),
        }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Classify a raw frame without side effects.
    pub fn classify(&self, raw: &str) -> InboundFrame {
        if raw == self.pong_payload {
            return InboundFrame::Pong;
        }

        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(_) => return InboundFrame::Malformed,
        };

        if envelope.kind != NOTICE_TYPE {
            return InboundFrame::Unrecognized(envelope.kind);
        }

        match envelope
            .data
            .map(serde_json::from_value::<NoticePayload>)
        {
            Some(Ok(payload)) => InboundFrame::Notice(payload.into()),
            _ => InboundFrame::Unrecognized(envelope.kind),
        }
    }

    /// Classify `raw` and publish it if it is a notice.
    ///
    /// Returns the published event, mostly for callers that log it.
    pub fn dispatch(&self, raw: &str) -> Option<NoticeEvent> {
        match self.classify(raw) {
            InboundFrame::Pong => None,
            InboundFrame::Notice(event) => {
                debug!("notice received: {} ({})", event.title, event.category);
                self.bus.notices().publish(event.clone());
                Some(event)
            }
            InboundFrame::Unrecognized(kind) => {
                debug!("dropping frame with unhandled type {kind:?}");
                None
            }
            InboundFrame::Malformed => {
                debug!("dropping malformed frame ({} bytes)", raw.len());
                None
            }
        }
    }
}

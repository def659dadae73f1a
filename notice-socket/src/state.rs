//! Connection and retry state for the notice channel.

use std::time::Duration;

use serde::Serialize;

/// Lifecycle of the single logical connection.
///
/// `Idle → Connecting → Open → Closing → Closed`, with `Failed` as the
/// terminal state once the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// Never started, or no credential was available.
    Idle,
    /// A socket attempt is in flight.
    Connecting,
    /// Handshake completed; frames flow and the heartbeat runs.
    Open,
    /// A programmatic close is underway.
    Closing,
    /// No socket. A reconnect may be pending.
    Closed,
    /// Retry budget exhausted; only an explicit `start()` leaves this state.
    Failed,
}

impl ConnectionState {
    /// Whether the channel has given up.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Retry bookkeeping kept alongside `Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Consecutive failed attempts since the last successful open.
    pub attempt: u32,
    /// Delay of the most recently scheduled reconnect.
    pub next_delay: Duration,
}

impl RetryState {
    /// Forget all failures; called only when the socket opens.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

//! Admin notice channel - the real-time half of the admin console.
//!
//! This crate keeps one WebSocket open to the admin server and turns what
//! arrives on it into typed events:
//! - Connection lifecycle with at most one socket at a time
//! - Reconnection with capped exponential backoff and a retry budget
//! - Heartbeat pings while the socket is open
//! - Frame classification and notice publishing
//! - A cloneable broadcast bus consumers subscribe to

pub mod backoff;
pub mod bus;
pub mod credentials;
pub mod dispatcher;
pub mod events;
pub mod heartbeat;
pub mod manager;
pub mod state;
pub mod transport;

// Re-export key types
pub use backoff::{ReconnectScheduler, ReconnectTimer, RetryPolicy, Schedule};
pub use bus::{NotificationBus, Topic};
pub use credentials::{CredentialSource, StaticCredential};
pub use dispatcher::{InboundFrame, NoticeDispatcher};
pub use events::{ChannelStatus, NoticeCategory, NoticeEvent};
pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor};
pub use manager::{ChannelOptions, NoticeChannel, StartOutcome};
pub use state::{ConnectionState, RetryState};
pub use transport::{Endpoint, Socket, Transport, WsTransport};

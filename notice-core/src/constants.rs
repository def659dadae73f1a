//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "AdminNotice";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST API path prefix on the admin server.
pub const API_PREFIX: &str = "/api";

/// Path of the notice WebSocket endpoint, relative to the origin.
pub const NOTICE_WS_PATH: &str = "/api/ws/notice";

/// Default REST timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;

/// Default socket connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Reconnect backoff defaults.
pub mod backoff {
    /// Delay before the first reconnect.
    pub const BASE_DELAY_MS: u64 = 2_000;
    /// Upper bound for any single reconnect delay.
    pub const MAX_DELAY_MS: u64 = 60_000;
    /// Reconnects allowed after consecutive failures before giving up.
    pub const MAX_RETRIES: u32 = 10;
}

/// Heartbeat defaults.
pub mod heartbeat {
    /// Keep-alive interval.
    pub const INTERVAL_MS: u64 = 30_000;
    /// Text frame sent on every heartbeat tick.
    pub const PING: &str = "ping";
    /// Text frame the server answers with.
    pub const PONG: &str = "pong";
}

/// Capacity of each notification bus topic.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_path_under_api_prefix() {
        assert!(NOTICE_WS_PATH.starts_with(API_PREFIX));
    }

    #[test]
    fn test_backoff_defaults_are_ordered() {
        assert!(backoff::BASE_DELAY_MS < backoff::MAX_DELAY_MS);
    }
}

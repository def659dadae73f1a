//! CLI command implementations.

pub mod config;
pub mod notices;
pub mod watch;

use notice_api::ApiClient;
use notice_core::config::ConfigHandle;
use notice_core::error::NoticeResult;

/// Helper to create an API client from config.
pub async fn create_api_client(config: &ConfigHandle) -> NoticeResult<ApiClient> {
    let server_config = config.read().await.server.clone();
    ApiClient::new(&server_config)
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}

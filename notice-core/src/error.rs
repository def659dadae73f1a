//! Global error types for the admin notice workspace.
//!
//! All error categories are unified into a single `NoticeError` enum with
//! conversions from the underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using NoticeError.
pub type NoticeResult<T> = Result<T, NoticeError>;

/// Unified error type covering every error category in the workspace.
#[derive(Error, Debug)]
pub enum NoticeError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The configured endpoint could not be turned into a socket URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// A connect or request deadline elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// WebSocket transport error.
    #[error("socket error: {0}")]
    Socket(String),

    /// The WebSocket was closed by the peer or the network.
    #[error("socket closed")]
    SocketClosed,

    /// Server returned an error response.
    #[error("server error (code {code}): {message}")]
    ServerError {
        /// Status code from the response envelope or HTTP layer.
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Authentication was rejected or no credential was available.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for NoticeError {
    fn from(e: serde_json::Error) -> Self {
        NoticeError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for NoticeError {
    fn from(e: toml::de::Error) -> Self {
        NoticeError::Config(e.to_string())
    }
}

impl From<url::ParseError> for NoticeError {
    fn from(e: url::ParseError) -> Self {
        NoticeError::InvalidEndpoint(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NoticeError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");

        let err = NoticeError::ServerError {
            code: 401,
            message: "token expired".into(),
        };
        assert_eq!(err.to_string(), "server error (code 401): token expired");
    }

    #[test]
    fn test_from_serde_json() {
        let err: NoticeError = serde_json::from_str::<serde_json::Value>("{bad")
            .unwrap_err()
            .into();
        assert!(matches!(err, NoticeError::Serialization(_)));
    }
}

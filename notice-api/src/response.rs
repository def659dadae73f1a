//! Server response types.
//!
//! Every REST response from the admin server uses the same envelope:
//! ```json
//! { "code": 200, "message": "ok", "data": { ... }, "timestamp": 1700000000000 }
//! ```
//! A `code` other than 200 is a failure even when the HTTP status is 200.

use notice_core::error::{NoticeError, NoticeResult};
use serde::{Deserialize, Serialize};

/// Envelope code for success.
pub const CODE_OK: u16 = 200;

/// Envelope code for an expired or missing session.
pub const CODE_UNAUTHORIZED: u16 = 401;

/// Standard response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    /// Payload; absent or null for endpoints that return nothing.
    pub data: Option<T>,
    /// Server time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }

    /// Turn a failed envelope into an error, keeping the payload otherwise.
    pub fn into_result(self) -> NoticeResult<Option<T>> {
        match self.code {
            CODE_OK => Ok(self.data),
            CODE_UNAUTHORIZED => Err(NoticeError::AuthFailed(self.message)),
            code => Err(NoticeError::ServerError {
                code,
                message: self.message,
            }),
        }
    }

    /// Like `into_result`, but a missing payload is an error too.
    pub fn into_data(self) -> NoticeResult<T> {
        self.into_result()?
            .ok_or_else(|| NoticeError::Serialization("response has no data".into()))
    }
}

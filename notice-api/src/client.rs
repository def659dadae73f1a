//! HTTP client for the admin server REST API.
//!
//! Handles bearer authentication, timeouts, status checking and envelope
//! parsing for every request.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use notice_core::config::{AppConfig, ServerConfig};
use notice_core::error::{NoticeError, NoticeResult};

use crate::response::ApiResponse;

/// HTTP client for the admin server.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL for the API (e.g. "https://admin.example.com/api").
    api_root: String,
    /// Bearer token sent with every request.
    token: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new ApiClient from server configuration.
    pub fn new(config: &ServerConfig) -> NoticeResult<Self> {
        let origin = AppConfig::sanitize_origin(&config.origin);
        if origin.is_empty() {
            return Err(NoticeError::MissingConfig("server.origin".into()));
        }

        let timeout = config.api_timeout();
        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| NoticeError::Http(format!("failed to build HTTP client: {e}")))?;

        let prefix = config.api_prefix.trim_end_matches('/');
        Ok(Self {
            inner,
            api_root: format!("{origin}{prefix}"),
            token: config.token().map(str::to_string),
            timeout,
        })
    }

    /// Replace the bearer token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Get the current API root URL.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    fn build_request(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> RequestBuilder {
        let mut builder = self.inner.request(method, self.url(path)).timeout(self.timeout);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
    }

    async fn send(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> NoticeResult<Response> {
        debug!("{} {}", method, path);
        let response = self
            .build_request(method, path, body)
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::check_status(response).await
    }

    /// Execute a GET request.
    pub async fn get(&self, path: &str) -> NoticeResult<Response> {
        self.send(Method::GET, path, None).await
    }

    /// Execute a POST request with an optional JSON body.
    pub async fn post(&self, path: &str, body: Option<&serde_json::Value>) -> NoticeResult<Response> {
        self.send(Method::POST, path, body).await
    }

    /// Deserialize a response body into an ApiResponse<T>.
    pub async fn parse_response<T: DeserializeOwned>(response: Response) -> NoticeResult<ApiResponse<T>> {
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| NoticeError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Convenience: GET + parse into ApiResponse<T>.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> NoticeResult<ApiResponse<T>> {
        let resp = self.get(path).await?;
        Self::parse_response(resp).await
    }

    /// Convenience: POST + parse into ApiResponse<T>.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> NoticeResult<ApiResponse<T>> {
        let resp = self.post(path, body).await?;
        Self::parse_response(resp).await
    }

    /// Check the HTTP status code and convert to NoticeError if needed.
    async fn check_status(response: Response) -> NoticeResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(NoticeError::AuthFailed(format!("server returned {status}")));
        }

        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(NoticeError::ServerError {
                code: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    /// Classify a reqwest error into a NoticeError variant.
    fn classify_error(e: reqwest::Error) -> NoticeError {
        if e.is_timeout() {
            NoticeError::Timeout(e.to_string())
        } else if e.is_connect() {
            NoticeError::Http(format!("connection failed: {e}"))
        } else {
            NoticeError::Http(e.to_string())
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.api_root)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

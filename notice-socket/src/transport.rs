//! Socket transport: endpoint derivation and the WebSocket implementation.
//!
//! The connection manager only talks to the `Transport` and `Socket`
//! traits, so tests can swap in an in-memory transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use notice_core::config::ServerConfig;
use notice_core::error::{NoticeError, NoticeResult};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where the notice socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Derive the socket URL from the console origin.
    ///
    /// `https` origins get `wss`, `http` origins get `ws`. `port` replaces
    /// the origin's port when set; any path or query on the origin is
    /// replaced by `path`.
    pub fn from_origin(origin: &str, path: &str, port: Option<u16>) -> NoticeResult<Self> {
        let mut url = Url::parse(origin)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(NoticeError::InvalidEndpoint(format!(
                    "unsupported origin scheme {other:?}"
                )))
            }
        };
        if url.host_str().is_none() {
            return Err(NoticeError::InvalidEndpoint(format!("origin {origin:?} has no host")));
        }

        url.set_scheme(scheme)
            .map_err(|_| NoticeError::InvalidEndpoint(format!("cannot use {scheme} for {origin}")))?;
        if port.is_some() {
            url.set_port(port)
                .map_err(|_| NoticeError::InvalidEndpoint(format!("cannot set port on {origin}")))?;
        }
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url })
    }

    /// Endpoint for the configured server.
    pub fn from_server_config(config: &ServerConfig) -> NoticeResult<Self> {
        if config.origin.is_empty() {
            return Err(NoticeError::MissingConfig("server.origin".into()));
        }
        Self::from_origin(&config.origin, &config.ws_path, config.ws_port)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Opens sockets.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect to `endpoint`, presenting `credential` as a bearer token.
    async fn open(&self, endpoint: &Endpoint, credential: &str) -> NoticeResult<Box<dyn Socket>>;
}

/// An open text-frame socket.
#[async_trait]
pub trait Socket: Send {
    async fn send(&mut self, text: String) -> NoticeResult<()>;

    /// Next text frame. `None` once the peer has closed.
    ///
    /// Must be cancel safe: dropping the future loses no frame.
    async fn recv(&mut self) -> Option<NoticeResult<String>>;

    /// Close the socket, ignoring errors.
    async fn close(&mut self);
}

/// `tokio-tungstenite` transport.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &Endpoint, credential: &str) -> NoticeResult<Box<dyn Socket>> {
        let mut request = endpoint
            .url()
            .as_str()
            .into_client_request()
            .map_err(|e| NoticeError::InvalidEndpoint(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {credential}"))
            .map_err(|e| NoticeError::AuthFailed(format!("credential is not a valid header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        debug!("opening socket to {endpoint}");
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| NoticeError::Timeout(format!("connect to {endpoint}")))?
            .map_err(|e| NoticeError::Socket(e.to_string()))?;

        info!("socket connected to {endpoint} (status {})", response.status());
        Ok(Box::new(WsSocket { stream }))
    }
}

/// A live `tokio-tungstenite` connection.
pub struct WsSocket {
    stream: WsStream,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send(&mut self, text: String) -> NoticeResult<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| NoticeError::Socket(e.to_string()))
    }

    async fn recv(&mut self) -> Option<NoticeResult<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("server sent close frame: {frame:?}");
                    return None;
                }
                Some(Ok(Message::Binary(bin))) => {
                    debug!("ignoring {} byte binary frame", bin.len());
                }
                // Protocol pings are answered by tungstenite itself.
                Some(Ok(other)) => trace!("control frame: {other:?}"),
                Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                    return None
                }
                Some(Err(e)) => return Some(Err(NoticeError::Socket(e.to_string()))),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("socket close: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_plain_origin() {
        let ep = Endpoint::from_origin("http://localhost:5173", "/api/ws/notice", None).unwrap();
        assert_eq!(ep.to_string(), "ws://localhost:5173/api/ws/notice");
        assert!(!ep.is_secure());
    }

    #[test]
    fn test_endpoint_secure_origin() {
        let ep = Endpoint::from_origin("https://admin.example.com", "/api/ws/notice", None).unwrap();
        assert_eq!(ep.to_string(), "wss://admin.example.com/api/ws/notice");
        assert!(ep.is_secure());
    }

    #[test]
    fn test_endpoint_port_override_and_path_replacement() {
        let ep = Endpoint::from_origin(
            "http://192.168.1.10:5173/system/user?tab=1#top",
            "/api/ws/notice",
            Some(8080),
        )
        .unwrap();
        assert_eq!(ep.to_string(), "ws://192.168.1.10:8080/api/ws/notice");
    }

    #[test]
    fn test_endpoint_rejects_bad_origins() {
        assert!(Endpoint::from_origin("not a url", "/ws", None).is_err());
        assert!(Endpoint::from_origin("ftp://example.com", "/ws", None).is_err());
    }

    #[test]
    fn test_endpoint_from_server_config() {
        let mut config = ServerConfig::default();
        assert!(matches!(
            Endpoint::from_server_config(&config),
            Err(NoticeError::MissingConfig(_))
        ));

        config.origin = "https://admin.example.com".into();
        config.ws_port = Some(8443);
        let ep = Endpoint::from_server_config(&config).unwrap();
        assert_eq!(ep.to_string(), "wss://admin.example.com:8443/api/ws/notice");
    }
}

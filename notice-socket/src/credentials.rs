//! Where the channel gets its bearer credential from.

use notice_core::config::ServerConfig;

/// Supplies the current session credential.
///
/// Read once per `start()`; reconnects reuse the value read then.
pub trait CredentialSource: Send + Sync + 'static {
    /// The credential, or `None` when nobody is signed in.
    fn token(&self) -> Option<String>;
}

/// A fixed credential, typically from config or the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    /// Blank strings count as no credential.
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl From<&ServerConfig> for StaticCredential {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.token().map(str::to_string))
    }
}

impl CredentialSource for StaticCredential {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

impl<F> CredentialSource for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

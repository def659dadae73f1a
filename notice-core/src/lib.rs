//! Admin Notice Core - foundation types shared by the notice crates.
//!
//! This crate provides:
//! - Application configuration (server origin, credential, channel tuning)
//! - A unified error type for every crate in the workspace
//! - Structured logging with tracing
//! - Platform directory lookup and common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ChannelConfig, ConfigHandle, ServerConfig};
pub use error::{NoticeError, NoticeResult};
pub use logging::init_logging;
pub use platform::Platform;

//! Admin notice API - HTTP client for the admin server's notice endpoints.
//!
//! Consumers of the notice channel use this crate to refresh what the
//! channel only hints at: the unread count and the latest notices.

pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use client::ApiClient;
pub use endpoints::notice::Notice;
pub use response::ApiResponse;

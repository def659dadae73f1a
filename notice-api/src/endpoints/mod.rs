//! API endpoint modules organized by category.
//!
//! Each module adds typed methods to `ApiClient` for a group of related
//! server endpoints.

pub mod notice;

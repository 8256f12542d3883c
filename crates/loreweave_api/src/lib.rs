//! Transport-neutral use-case boundary for the Loreweave playground.
//!
//! A REST router or desktop bridge calls these functions with string ids and
//! JSON payloads and forwards the returned envelope unchanged.

pub mod api;
pub mod config;

pub use api::{ApiContext, ApiError, ApiResponse, DeleteOutcome};
pub use config::ApiConfig;

/// Minimal health-check API.
pub fn ping() -> String {
    loreweave_core::ping().to_owned()
}

/// Core crate version.
pub fn core_version() -> String {
    loreweave_core::core_version().to_owned()
}

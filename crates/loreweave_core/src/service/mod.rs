//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep API/CLI layers decoupled from storage details.

pub mod error_code;
pub mod playground_service;
pub mod preview;
pub mod toolbox_service;

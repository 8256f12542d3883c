//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories are only constructible over a fully migrated connection.
//! - Repository APIs return semantic errors (`NodeNotFound`) in addition to
//!   DB transport errors.

pub mod link_repo;
pub mod node_repo;
mod schema;
pub mod toolbox_repo;

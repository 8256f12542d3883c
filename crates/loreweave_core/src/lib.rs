//! Core domain logic for the Loreweave worldbuilding playground.
//! This crate owns the tree rules, toolbox inheritance and edit permissions.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::access::{can_edit, can_view, Actor};
pub use model::node::{Node, NodeId, NodeKind, NodePatch, NodeValidationError, OwnerId};
pub use model::toolbox::{EffectiveLinks, LinksMap, ToolboxCategory, ToolboxEntity, ToolboxEntityRef};
pub use repo::link_repo::{LinkRepository, SqliteLinkRepository};
pub use repo::node_repo::{NodeRepository, RepoError, RepoResult, SqliteNodeRepository};
pub use repo::toolbox_repo::{SqliteToolboxRepository, ToolboxRepository};
pub use service::error_code::ErrorCode;
pub use service::playground_service::{
    CreateNodeRequest, PlaygroundService, PlaygroundServiceError, PlaygroundTree,
};
pub use service::toolbox_service::ToolboxService;
pub use tree::builder::{build_tree, TreeNode};
pub use tree::filter::filter_tree;
pub use tree::resolver::nearest_setting_id;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

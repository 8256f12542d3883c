//! Playground domain model.
//!
//! # Responsibility
//! - Define node, toolbox attachment and actor types used by every layer.
//! - Keep normalization rules next to the data they constrain.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeId`.
//! - Only `setting` nodes own toolbox links directly.

pub mod access;
pub mod node;
pub mod toolbox;

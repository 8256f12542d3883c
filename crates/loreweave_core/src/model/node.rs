//! Playground node domain model.
//!
//! # Responsibility
//! - Define the canonical record for one entry of the worldbuilding tree.
//! - Own the parent/child type rules and field normalization.
//!
//! # Invariants
//! - `id` and `kind` never change after creation.
//! - `name` is trimmed and non-blank.
//! - `sort_order` is non-negative.
//! - `tags` hold no blanks and no duplicates, in first-seen order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a playground node.
pub type NodeId = Uuid;

/// Identity of the user owning a node or toolbox entity.
pub type OwnerId = String;

/// Closed set of playground node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Cosmos,
    World,
    Era,
    /// Owns toolbox attachments for its whole subtree.
    Setting,
    Folder,
    Page,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        Self::Cosmos,
        Self::World,
        Self::Era,
        Self::Setting,
        Self::Folder,
        Self::Page,
    ];

    /// Stable storage/wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosmos => "cosmos",
            Self::World => "world",
            Self::Era => "era",
            Self::Setting => "setting",
            Self::Folder => "folder",
            Self::Page => "page",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "cosmos" => Some(Self::Cosmos),
            "world" => Some(Self::World),
            "era" => Some(Self::Era),
            "setting" => Some(Self::Setting),
            "folder" => Some(Self::Folder),
            "page" => Some(Self::Page),
            _ => None,
        }
    }

    /// Child types accepted under `parent` (`None` is the root level).
    pub fn allowed_children(parent: Option<NodeKind>) -> &'static [NodeKind] {
        match parent {
            None => &[Self::Cosmos, Self::Folder],
            Some(Self::Cosmos) => &[Self::World, Self::Folder, Self::Page],
            Some(Self::World) => &[Self::Era, Self::Setting, Self::Folder, Self::Page],
            Some(Self::Era) => &[Self::Setting, Self::Folder, Self::Page],
            Some(Self::Setting) => &[Self::Folder, Self::Page],
            Some(Self::Folder) => &[
                Self::World,
                Self::Era,
                Self::Setting,
                Self::Folder,
                Self::Page,
            ],
            Some(Self::Page) => &[Self::Page],
        }
    }

    /// Returns whether a `self` node may be placed under `parent`.
    pub fn can_be_child_of(self, parent: Option<NodeKind>) -> bool {
        Self::allowed_children(parent).contains(&self)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical playground node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub owner_id: OwnerId,
    /// Serialized as `type` to match the external schema naming.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// `None` means root-level node.
    pub parent_id: Option<NodeId>,
    /// Sibling order key; ties fall back to creation order.
    pub sort_order: i64,
    pub name: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub markdown: Option<String>,
    /// Derived from `markdown`; never written by callers.
    pub preview_text: Option<String>,
    /// Open extension bag.
    pub meta: Map<String, Value>,
    /// Published ("free") nodes are readable by every actor.
    pub is_published: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Node {
    /// Creates an unsaved node with a generated id and empty optional fields.
    pub fn new(
        owner_id: impl Into<OwnerId>,
        kind: NodeKind,
        parent_id: Option<NodeId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            kind,
            parent_id,
            sort_order: 0,
            name: name.into(),
            summary: None,
            tags: Vec::new(),
            markdown: None,
            preview_text: None,
            meta: Map::new(),
            is_published: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_setting(&self) -> bool {
        self.kind == NodeKind::Setting
    }

    /// Checks field invariants before persistence.
    pub fn validate(&self) -> Result<(), NodeValidationError> {
        if self.name.trim().is_empty() {
            return Err(NodeValidationError::BlankName);
        }
        if self.sort_order < 0 {
            return Err(NodeValidationError::NegativeSortOrder(self.sort_order));
        }
        if self.parent_id == Some(self.id) {
            return Err(NodeValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Field-level validation failures for `Node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValidationError {
    BlankName,
    NegativeSortOrder(i64),
    SelfParent(NodeId),
}

impl Display for NodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "node name must not be blank"),
            Self::NegativeSortOrder(value) => {
                write!(f, "sort_order must be non-negative, got {value}")
            }
            Self::SelfParent(id) => write!(f, "node cannot be its own parent: {id}"),
        }
    }
}

impl Error for NodeValidationError {}

/// Partial update accepted by `update_node`.
///
/// `None` leaves a field untouched. For `summary` and `markdown`, a blank
/// string clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodePatch {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub sort_order: Option<i64>,
    pub is_published: Option<bool>,
    pub markdown: Option<String>,
    pub meta: Option<Map<String, Value>>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Trims a display name and rejects blanks.
pub fn normalize_name(value: &str) -> Result<String, NodeValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NodeValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}

/// Trims optional free text; blank input becomes `None`.
pub fn normalize_optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims tags, drops blanks, and drops repeats keeping the first occurrence.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_string()))
        .map(str::to_string)
        .collect()
}

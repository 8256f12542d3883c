//! Playground tree use-case service.
//!
//! # Responsibility
//! - Enforce ownership, parent-type and acyclicity rules above repositories.
//! - Resolve inherited toolbox links through the nearest `setting` ancestor.
//! - Assemble the full tree read model used for client reconciliation.
//!
//! # Invariants
//! - Authorization and validation run before any write.
//! - Only `setting` nodes accept link writes; every other node sees its
//!   setting's links read-only.
//! - Moves never create parent cycles or cross owners.

use crate::model::access::{can_edit, can_view, shares_owner, Actor};
use crate::model::node::{
    normalize_name, normalize_optional_text, normalize_tags, Node, NodeId, NodeKind, NodePatch,
    NodeValidationError, OwnerId,
};
use crate::model::toolbox::{EffectiveLinks, LinksMap};
use crate::repo::link_repo::LinkRepository;
use crate::repo::node_repo::{NewNode, NodeRepository, RepoError};
use crate::service::error_code::ErrorCode;
use crate::service::preview::derive_preview_text;
use crate::tree::builder::{build_tree, TreeNode};
use crate::tree::filter::filter_tree;
use crate::tree::resolver::{ancestor_ids, index_nodes, nearest_setting_id};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from playground service operations.
#[derive(Debug)]
pub enum PlaygroundServiceError {
    /// Field-level validation failure.
    Validation(NodeValidationError),
    /// Child type is not allowed under the requested parent type.
    InvalidParentType {
        parent: Option<NodeKind>,
        child: NodeKind,
    },
    /// Link write targeted a node that is not a `setting`.
    NotASetting { node_id: NodeId, kind: NodeKind },
    /// Move would place a node under another owner's tree.
    OwnerMismatch { node_id: NodeId, parent_id: NodeId },
    /// Move would create a parent cycle.
    CycleDetected { node_id: NodeId, parent_id: NodeId },
    /// Target node does not exist.
    NodeNotFound(NodeId),
    /// Requested parent does not exist.
    ParentNotFound(NodeId),
    /// Actor may not access the node.
    Forbidden { user_id: OwnerId, node_id: NodeId },
    /// Write succeeded but read-back disagreed.
    InconsistentState(&'static str),
    /// Repository-level failure.
    Repo(RepoError),
}

impl PlaygroundServiceError {
    /// Maps this error onto the caller-facing taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_)
            | Self::InvalidParentType { .. }
            | Self::NotASetting { .. }
            | Self::OwnerMismatch { .. }
            | Self::CycleDetected { .. } => ErrorCode::Validation,
            Self::NodeNotFound(_) | Self::ParentNotFound(_) => ErrorCode::NotFound,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::InconsistentState(_) | Self::Repo(_) => ErrorCode::Internal,
        }
    }
}

impl Display for PlaygroundServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidParentType { parent, child } => match parent {
                Some(parent) => write!(f, "a {child} node cannot be placed under a {parent} node"),
                None => write!(f, "a {child} node cannot be placed at the root"),
            },
            Self::NotASetting { node_id, kind } => write!(
                f,
                "toolbox links can only be saved on setting nodes; {node_id} is a {kind}"
            ),
            Self::OwnerMismatch { node_id, parent_id } => write!(
                f,
                "node {node_id} cannot move under {parent_id} owned by another user"
            ),
            Self::CycleDetected { node_id, parent_id } => write!(
                f,
                "move would create cycle: node {node_id} under parent {parent_id}"
            ),
            Self::NodeNotFound(id) => write!(f, "playground node not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "playground parent not found: {id}"),
            Self::Forbidden { user_id, node_id } => {
                write!(f, "user {user_id} may not access node {node_id}")
            }
            Self::InconsistentState(details) => {
                write!(f, "inconsistent playground state: {details}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlaygroundServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PlaygroundServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NodeNotFound(node_id) => Self::NodeNotFound(node_id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<NodeValidationError> for PlaygroundServiceError {
    fn from(value: NodeValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type PlaygroundResult<T> = Result<T, PlaygroundServiceError>;

/// Create request accepted by `create_node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
}

/// Full tree read model returned after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaygroundTree {
    /// Nested forest.
    pub tree: Vec<TreeNode>,
    /// Flat node list in creation order.
    pub nodes: Vec<Node>,
    /// One entry per listed `setting` node; unsaved settings map to empty
    /// categories.
    pub links_by_node: HashMap<NodeId, LinksMap>,
}

/// Playground tree service facade.
pub struct PlaygroundService<N: NodeRepository, L: LinkRepository> {
    nodes: N,
    links: L,
}

impl<N: NodeRepository, L: LinkRepository> PlaygroundService<N, L> {
    /// Creates service from repository implementations.
    pub fn new(nodes: N, links: L) -> Self {
        Self { nodes, links }
    }

    /// Lists an owner's tree.
    ///
    /// Owners and admins see every node; other actors see published nodes
    /// only, with unpublished ancestors dropped and their published
    /// descendants promoted to roots.
    pub fn list_tree(&self, actor: &Actor, owner_id: &str) -> PlaygroundResult<PlaygroundTree> {
        let started_at = Instant::now();
        let published_only = !actor.acts_for(owner_id);
        let nodes = self
            .nodes
            .list_nodes(owner_id, published_only)
            .map_err(|err| log_failure("tree_list", actor, err.into()))?;
        let mut stored = self
            .links
            .list_links_for_owner(owner_id)
            .map_err(|err| log_failure("tree_list", actor, err.into()))?;

        let links_by_node = nodes
            .iter()
            .filter(|node| node.is_setting())
            .map(|node| (node.id, stored.remove(&node.id).unwrap_or_default()))
            .collect();
        let tree = build_tree(&nodes);

        debug!(
            "event=tree_list module=playground status=ok node_count={} published_only={} duration_ms={}",
            nodes.len(),
            published_only,
            started_at.elapsed().as_millis()
        );
        Ok(PlaygroundTree {
            tree,
            nodes,
            links_by_node,
        })
    }

    /// Lists an owner's tree pruned to nodes matching `query`.
    pub fn search_tree(
        &self,
        actor: &Actor,
        owner_id: &str,
        query: &str,
    ) -> PlaygroundResult<Vec<TreeNode>> {
        let listed = self.list_tree(actor, owner_id)?;
        let found = filter_tree(&listed.tree, query);
        debug!(
            "event=tree_search module=playground status=ok kept_nodes={} listed_nodes={}",
            found.iter().map(TreeNode::subtree_len).sum::<usize>(),
            listed.nodes.len()
        );
        Ok(found)
    }

    /// Loads one node the actor may read.
    pub fn get_node(&self, actor: &Actor, node_id: NodeId) -> PlaygroundResult<Node> {
        self.require_viewable(actor, node_id)
            .map_err(|err| log_failure("node_get", actor, err))
    }

    /// Creates one node under an optional parent.
    pub fn create_node(
        &self,
        actor: &Actor,
        request: &CreateNodeRequest,
    ) -> PlaygroundResult<Node> {
        let node = self
            .try_create_node(actor, request)
            .map_err(|err| log_failure("node_create", actor, err))?;
        info!(
            "event=node_create module=playground status=ok node_id={} kind={} parent_id={}",
            node.id,
            node.kind,
            display_parent(node.parent_id)
        );
        Ok(node)
    }

    /// Applies a partial update and returns the stored node.
    pub fn update_node(
        &self,
        actor: &Actor,
        node_id: NodeId,
        patch: NodePatch,
    ) -> PlaygroundResult<Node> {
        let node = self
            .try_update_node(actor, node_id, patch)
            .map_err(|err| log_failure("node_update", actor, err))?;
        info!(
            "event=node_update module=playground status=ok node_id={}",
            node.id
        );
        Ok(node)
    }

    /// Deletes a node and every descendant. Returns the removed node count.
    pub fn delete_node(&self, actor: &Actor, node_id: NodeId) -> PlaygroundResult<usize> {
        let removed = self
            .require_editable(actor, node_id)
            .and_then(|_| self.nodes.delete_subtree(node_id).map_err(Into::into))
            .map_err(|err| log_failure("node_delete", actor, err))?;
        info!(
            "event=node_delete module=playground status=ok node_id={} removed={}",
            node_id, removed
        );
        Ok(removed)
    }

    /// Moves a node under a new parent at an optional sibling index.
    pub fn move_node(
        &self,
        actor: &Actor,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        target_index: Option<i64>,
    ) -> PlaygroundResult<()> {
        self.try_move_node(actor, node_id, new_parent_id, target_index)
            .map_err(|err| log_failure("node_move", actor, err))?;
        info!(
            "event=node_move module=playground status=ok node_id={} parent_id={}",
            node_id,
            display_parent(new_parent_id)
        );
        Ok(())
    }

    /// Returns the links visible from `node_id`.
    ///
    /// Non-setting nodes inherit their nearest setting's links. Returns
    /// `None` when no setting exists at or above the node, or when the actor
    /// may not read that setting.
    pub fn get_toolbox_links(
        &self,
        actor: &Actor,
        node_id: NodeId,
    ) -> PlaygroundResult<Option<EffectiveLinks>> {
        self.try_get_toolbox_links(actor, node_id)
            .map_err(|err| log_failure("links_get", actor, err))
    }

    /// Replaces the full link set of a setting and returns what was stored.
    pub fn set_toolbox_links(
        &self,
        actor: &Actor,
        setting_id: NodeId,
        links: &LinksMap,
    ) -> PlaygroundResult<LinksMap> {
        let stored = self
            .try_set_toolbox_links(actor, setting_id, links)
            .map_err(|err| log_failure("links_set", actor, err))?;
        info!(
            "event=links_set module=playground status=ok setting_id={} link_count={}",
            setting_id,
            stored.total()
        );
        Ok(stored)
    }

    fn try_create_node(&self, actor: &Actor, request: &CreateNodeRequest) -> PlaygroundResult<Node> {
        let name = normalize_name(&request.name)?;

        let parent = match request.parent_id {
            Some(parent_id) => Some(
                self.nodes
                    .get_node(parent_id)?
                    .ok_or(PlaygroundServiceError::ParentNotFound(parent_id))?,
            ),
            None => None,
        };
        if let Some(parent) = &parent {
            ensure_can_edit(actor, parent)?;
        }

        let parent_kind = parent.as_ref().map(|parent| parent.kind);
        if !request.kind.can_be_child_of(parent_kind) {
            return Err(PlaygroundServiceError::InvalidParentType {
                parent: parent_kind,
                child: request.kind,
            });
        }

        // Children live in the parent owner's tree even when an admin creates them.
        let owner_id = parent
            .map(|parent| parent.owner_id)
            .unwrap_or_else(|| actor.user_id.clone());
        let created = self.nodes.create_node(&NewNode {
            owner_id,
            kind: request.kind,
            parent_id: request.parent_id,
            name,
        })?;
        Ok(created)
    }

    fn try_update_node(
        &self,
        actor: &Actor,
        node_id: NodeId,
        patch: NodePatch,
    ) -> PlaygroundResult<Node> {
        let mut node = self.require_editable(actor, node_id)?;
        if patch.is_empty() {
            return Ok(node);
        }

        apply_patch(&mut node, patch)?;
        self.nodes.update_node(&node)?;
        self.nodes
            .get_node(node_id)?
            .ok_or(PlaygroundServiceError::InconsistentState(
                "node missing after update",
            ))
    }

    fn try_move_node(
        &self,
        actor: &Actor,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        target_index: Option<i64>,
    ) -> PlaygroundResult<()> {
        let node = self.require_editable(actor, node_id)?;

        let parent_kind = match new_parent_id {
            Some(parent_id) => {
                if parent_id == node_id {
                    return Err(PlaygroundServiceError::CycleDetected { node_id, parent_id });
                }
                let parent = self
                    .nodes
                    .get_node(parent_id)?
                    .ok_or(PlaygroundServiceError::ParentNotFound(parent_id))?;
                ensure_can_edit(actor, &parent)?;
                if !shares_owner(&parent, &node) {
                    return Err(PlaygroundServiceError::OwnerMismatch { node_id, parent_id });
                }
                if self.would_create_cycle(&node, parent_id)? {
                    return Err(PlaygroundServiceError::CycleDetected { node_id, parent_id });
                }
                Some(parent.kind)
            }
            None => None,
        };

        if !node.kind.can_be_child_of(parent_kind) {
            return Err(PlaygroundServiceError::InvalidParentType {
                parent: parent_kind,
                child: node.kind,
            });
        }

        self.nodes
            .move_node(node_id, new_parent_id, target_index.map(|value| value.max(0)))?;
        Ok(())
    }

    fn try_get_toolbox_links(
        &self,
        actor: &Actor,
        node_id: NodeId,
    ) -> PlaygroundResult<Option<EffectiveLinks>> {
        let node = self.require_viewable(actor, node_id)?;
        let owner_nodes = self.nodes.list_nodes(&node.owner_id, false)?;
        let index = index_nodes(&owner_nodes);

        let Some(setting_id) = nearest_setting_id(Some(node_id), &index) else {
            return Ok(None);
        };
        // Links are visible only to actors that may read the owning setting.
        let setting_visible = index
            .get(&setting_id)
            .is_some_and(|setting| can_view(actor, setting));
        if !setting_visible {
            debug!(
                "event=links_get module=playground status=hidden node_id={} user_id={}",
                node_id, actor.user_id
            );
            return Ok(None);
        }
        let links = self.links.get_links(setting_id)?;
        Ok(Some(EffectiveLinks {
            node_id,
            setting_id,
            inherited: setting_id != node_id,
            links,
        }))
    }

    fn try_set_toolbox_links(
        &self,
        actor: &Actor,
        setting_id: NodeId,
        links: &LinksMap,
    ) -> PlaygroundResult<LinksMap> {
        let node = self.require_editable(actor, setting_id)?;
        if !node.is_setting() {
            return Err(PlaygroundServiceError::NotASetting {
                node_id: setting_id,
                kind: node.kind,
            });
        }

        self.links.replace_links(setting_id, &links.normalized())?;
        Ok(self.links.get_links(setting_id)?)
    }

    fn load_node(&self, node_id: NodeId) -> PlaygroundResult<Node> {
        self.nodes
            .get_node(node_id)?
            .ok_or(PlaygroundServiceError::NodeNotFound(node_id))
    }

    fn require_viewable(&self, actor: &Actor, node_id: NodeId) -> PlaygroundResult<Node> {
        let node = self.load_node(node_id)?;
        if !can_view(actor, &node) {
            return Err(forbidden(actor, node_id));
        }
        Ok(node)
    }

    fn require_editable(&self, actor: &Actor, node_id: NodeId) -> PlaygroundResult<Node> {
        let node = self.load_node(node_id)?;
        ensure_can_edit(actor, &node)?;
        Ok(node)
    }

    fn would_create_cycle(&self, node: &Node, candidate_parent_id: NodeId) -> PlaygroundResult<bool> {
        if candidate_parent_id == node.id {
            return Ok(true);
        }
        // Parent and node share an owner, so the owner's nodes hold every ancestor.
        let owner_nodes = self.nodes.list_nodes(&node.owner_id, false)?;
        let index = index_nodes(&owner_nodes);
        Ok(ancestor_ids(candidate_parent_id, &index).contains(&node.id))
    }
}

fn apply_patch(node: &mut Node, patch: NodePatch) -> Result<(), NodeValidationError> {
    if let Some(name) = patch.name {
        node.name = normalize_name(&name)?;
    }
    if let Some(summary) = patch.summary {
        node.summary = normalize_optional_text(&summary);
    }
    if let Some(tags) = patch.tags {
        node.tags = normalize_tags(&tags);
    }
    if let Some(sort_order) = patch.sort_order {
        if sort_order < 0 {
            return Err(NodeValidationError::NegativeSortOrder(sort_order));
        }
        node.sort_order = sort_order;
    }
    if let Some(is_published) = patch.is_published {
        node.is_published = is_published;
    }
    if let Some(markdown) = patch.markdown {
        node.markdown = if markdown.trim().is_empty() {
            None
        } else {
            Some(markdown)
        };
        node.preview_text = node.markdown.as_deref().and_then(derive_preview_text);
    }
    if let Some(meta) = patch.meta {
        node.meta = meta;
    }
    node.validate()
}

fn ensure_can_edit(actor: &Actor, node: &Node) -> PlaygroundResult<()> {
    if can_edit(actor, node) {
        Ok(())
    } else {
        Err(forbidden(actor, node.id))
    }
}

fn forbidden(actor: &Actor, node_id: NodeId) -> PlaygroundServiceError {
    PlaygroundServiceError::Forbidden {
        user_id: actor.user_id.clone(),
        node_id,
    }
}

fn display_parent(parent_id: Option<NodeId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}

fn log_failure(
    event: &'static str,
    actor: &Actor,
    err: PlaygroundServiceError,
) -> PlaygroundServiceError {
    let code = err.code();
    match code {
        ErrorCode::Internal => error!(
            "event={event} module=playground status=error error_code={code} user_id={} error={err}",
            actor.user_id
        ),
        _ => warn!(
            "event={event} module=playground status=rejected error_code={code} user_id={} error={err}",
            actor.user_id
        ),
    }
    err
}

//! Ownership-based authorization.
//!
//! Every mutating use-case asks `can_edit`; every read of another user's
//! content asks `can_view`; cross-owner checks ask `shares_owner`. No other
//! module compares owner ids.

use crate::model::node::{Node, OwnerId};
use crate::model::toolbox::ToolboxEntity;
use serde::{Deserialize, Serialize};

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: OwnerId,
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: impl Into<OwnerId>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<OwnerId>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }

    /// Returns whether this actor owns or administers `owner_id` content.
    pub fn acts_for(&self, owner_id: &str) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Resource with an owner and an optional globally-readable flag.
pub trait Owned {
    fn owner_id(&self) -> &str;

    /// Free content is readable by any actor.
    fn is_free(&self) -> bool {
        false
    }
}

impl Owned for Node {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn is_free(&self) -> bool {
        self.is_published
    }
}

impl Owned for ToolboxEntity {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn is_free(&self) -> bool {
        self.is_free
    }
}

/// Owner or admin may mutate.
pub fn can_edit(actor: &Actor, resource: &impl Owned) -> bool {
    actor.acts_for(resource.owner_id())
}

/// Owner, admin, or anyone for free content may read.
pub fn can_view(actor: &Actor, resource: &impl Owned) -> bool {
    resource.is_free() || can_edit(actor, resource)
}

/// Returns whether both resources belong to the same owner.
pub fn shares_owner(left: &impl Owned, right: &impl Owned) -> bool {
    left.owner_id() == right.owner_id()
}

#[cfg(test)]
mod tests {
    use super::{can_edit, can_view, shares_owner, Actor};
    use crate::model::node::{Node, NodeKind};
    use crate::model::toolbox::{ToolboxCategory, ToolboxEntity};

    fn entity(owner_id: &str, is_free: bool) -> ToolboxEntity {
        ToolboxEntity {
            id: "r-elf".to_string(),
            category: ToolboxCategory::Race,
            owner_id: owner_id.to_string(),
            name: "Elf".to_string(),
            detail: None,
            is_free,
        }
    }

    #[test]
    fn owner_and_admin_can_edit() {
        let node = Node::new("alice", NodeKind::Cosmos, None, "Aeth");
        assert!(can_edit(&Actor::user("alice"), &node));
        assert!(can_edit(&Actor::admin("root"), &node));
        assert!(!can_edit(&Actor::user("bob"), &node));
    }

    #[test]
    fn published_nodes_are_readable_but_not_editable_by_others() {
        let mut node = Node::new("alice", NodeKind::Cosmos, None, "Aeth");
        let bob = Actor::user("bob");
        assert!(!can_view(&bob, &node));

        node.is_published = true;
        assert!(can_view(&bob, &node));
        assert!(!can_edit(&bob, &node));
    }

    #[test]
    fn toolbox_entities_follow_owner_free_and_admin_rules() {
        let private = entity("alice", false);
        let free = entity("bob", true);

        assert!(can_view(&Actor::user("alice"), &private));
        assert!(!can_view(&Actor::user("carol"), &private));
        assert!(can_view(&Actor::admin("root"), &private));
        assert!(can_view(&Actor::user("carol"), &free));
        assert!(!can_edit(&Actor::user("carol"), &free));
    }

    #[test]
    fn shares_owner_compares_across_resource_types() {
        let node = Node::new("alice", NodeKind::Setting, None, "Capital");
        let other = Node::new("bob", NodeKind::Folder, None, "Drafts");
        assert!(shares_owner(&node, &entity("alice", false)));
        assert!(!shares_owner(&node, &other));
    }
}

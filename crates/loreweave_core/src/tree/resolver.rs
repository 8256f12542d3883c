//! Nearest-setting lookup used for toolbox inheritance.
//!
//! # Invariants
//! - The start node itself counts: a setting resolves to itself.
//! - The walk visits at most `nodes_by_id.len()` nodes, so a malformed
//!   parent cycle yields `None` instead of looping.

use crate::model::node::{Node, NodeId, NodeKind};
use std::collections::HashMap;

/// Indexes nodes by id for resolver lookups.
pub fn index_nodes(nodes: &[Node]) -> HashMap<NodeId, Node> {
    nodes.iter().map(|node| (node.id, node.clone())).collect()
}

/// Returns the id of the nearest `setting` at or above `node_id`.
///
/// Returns `None` when `node_id` is `None`, when the chain reaches a root
/// without a setting, or when any link points at a missing node.
pub fn nearest_setting_id(
    node_id: Option<NodeId>,
    nodes_by_id: &HashMap<NodeId, Node>,
) -> Option<NodeId> {
    nearest_of_kind(node_id, NodeKind::Setting, nodes_by_id)
}

/// Generalized upward walk for any node kind.
pub fn nearest_of_kind(
    node_id: Option<NodeId>,
    kind: NodeKind,
    nodes_by_id: &HashMap<NodeId, Node>,
) -> Option<NodeId> {
    let mut cursor = node_id;
    for _ in 0..nodes_by_id.len() {
        let node = nodes_by_id.get(&cursor?)?;
        if node.kind == kind {
            return Some(node.id);
        }
        cursor = node.parent_id;
    }
    None
}

/// Ancestor ids of `node_id`, nearest first, excluding the node itself.
///
/// Stops at a root, at a missing link, or after `nodes_by_id.len()` steps.
pub fn ancestor_ids(node_id: NodeId, nodes_by_id: &HashMap<NodeId, Node>) -> Vec<NodeId> {
    let mut ancestors = Vec::new();
    let mut cursor = nodes_by_id.get(&node_id).and_then(|node| node.parent_id);
    while let Some(current) = cursor {
        if ancestors.len() >= nodes_by_id.len() {
            break;
        }
        let Some(node) = nodes_by_id.get(&current) else {
            break;
        };
        ancestors.push(current);
        cursor = node.parent_id;
    }
    ancestors
}

#[cfg(test)]
mod tests {
    use super::{ancestor_ids, index_nodes, nearest_of_kind, nearest_setting_id};
    use crate::model::node::{Node, NodeKind};
    use uuid::Uuid;

    fn child(kind: NodeKind, parent: &Node, name: &str) -> Node {
        Node::new("u1", kind, Some(parent.id), name)
    }

    #[test]
    fn resolves_setting_for_self_and_descendants() {
        let cosmos = Node::new("u1", NodeKind::Cosmos, None, "Aeth");
        let world = child(NodeKind::World, &cosmos, "Aeth World");
        let era = child(NodeKind::Era, &world, "First Era");
        let capital = child(NodeKind::Setting, &era, "Capital");
        let folder = child(NodeKind::Folder, &capital, "Districts");
        let page = child(NodeKind::Page, &folder, "Harbor");
        let index = index_nodes(&[
            cosmos.clone(),
            world.clone(),
            era.clone(),
            capital.clone(),
            folder.clone(),
            page.clone(),
        ]);

        assert_eq!(nearest_setting_id(Some(capital.id), &index), Some(capital.id));
        assert_eq!(nearest_setting_id(Some(folder.id), &index), Some(capital.id));
        assert_eq!(nearest_setting_id(Some(page.id), &index), Some(capital.id));
        assert_eq!(nearest_setting_id(Some(era.id), &index), None);
        assert_eq!(nearest_setting_id(Some(cosmos.id), &index), None);
        assert_eq!(
            nearest_of_kind(Some(page.id), NodeKind::World, &index),
            Some(world.id)
        );
    }

    #[test]
    fn none_and_missing_ids_resolve_to_none() {
        let setting = Node::new("u1", NodeKind::Setting, None, "Loose");
        let index = index_nodes(&[setting]);
        assert_eq!(nearest_setting_id(None, &index), None);
        assert_eq!(nearest_setting_id(Some(Uuid::new_v4()), &index), None);
    }

    #[test]
    fn broken_link_in_chain_resolves_to_none() {
        let setting = Node::new("u1", NodeKind::Setting, None, "Capital");
        let mut page = child(NodeKind::Page, &setting, "Harbor");
        page.parent_id = Some(Uuid::new_v4());
        let index = index_nodes(&[setting, page.clone()]);
        assert_eq!(nearest_setting_id(Some(page.id), &index), None);
    }

    #[test]
    fn cyclic_chain_terminates() {
        let mut a = Node::new("u1", NodeKind::Folder, None, "A");
        let mut b = Node::new("u1", NodeKind::Folder, None, "B");
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let index = index_nodes(&[a.clone(), b.clone()]);

        assert_eq!(nearest_setting_id(Some(a.id), &index), None);
        assert!(ancestor_ids(a.id, &index).len() <= 2);
    }

    #[test]
    fn ancestor_ids_are_nearest_first() {
        let cosmos = Node::new("u1", NodeKind::Cosmos, None, "Aeth");
        let world = child(NodeKind::World, &cosmos, "World");
        let era = child(NodeKind::Era, &world, "Era");
        let index = index_nodes(&[cosmos.clone(), world.clone(), era.clone()]);
        assert_eq!(ancestor_ids(era.id, &index), vec![world.id, cosmos.id]);
        assert!(ancestor_ids(cosmos.id, &index).is_empty());
    }
}

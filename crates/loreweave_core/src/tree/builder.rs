//! Flat node list -> nested forest.
//!
//! # Invariants
//! - Every input node appears exactly once in the output.
//! - Siblings are ordered by `sort_order ASC`, then input (creation) order.
//! - A node whose parent is missing, or whose parent chain loops back to
//!   itself, is promoted to a root.

use crate::model::node::{Node, NodeId};
use serde::Serialize;
use std::collections::HashMap;

/// One node with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::subtree_len)
            .sum::<usize>()
    }

    #[cfg(test)]
    pub(crate) fn find(&self, id: NodeId) -> Option<&TreeNode> {
        if self.node.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Builds the forest of roots for a flat node list.
///
/// Duplicate ids keep their first occurrence.
pub fn build_tree(nodes: &[Node]) -> Vec<TreeNode> {
    let mut index_by_id: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
    let mut unique = Vec::with_capacity(nodes.len());
    for (position, node) in nodes.iter().enumerate() {
        if index_by_id.contains_key(&node.id) {
            continue;
        }
        index_by_id.insert(node.id, unique.len());
        unique.push(position);
    }

    let parent_of = |slot: usize| -> Option<usize> {
        nodes[unique[slot]]
            .parent_id
            .and_then(|parent_id| index_by_id.get(&parent_id).copied())
    };

    let mut children_of: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
    for slot in 0..unique.len() {
        let parent = parent_of(slot).filter(|_| !lies_on_cycle(slot, unique.len(), &parent_of));
        children_of.entry(parent).or_default().push(slot);
    }

    for siblings in children_of.values_mut() {
        // Stable sort keeps creation order for equal keys.
        siblings.sort_by_key(|slot| nodes[unique[*slot]].sort_order);
    }

    assemble(None, nodes, &unique, &mut children_of)
}

fn lies_on_cycle(start: usize, bound: usize, parent_of: &impl Fn(usize) -> Option<usize>) -> bool {
    let mut cursor = parent_of(start);
    for _ in 0..bound {
        match cursor {
            None => return false,
            Some(current) if current == start => return true,
            Some(current) => cursor = parent_of(current),
        }
    }
    false
}

fn assemble(
    parent: Option<usize>,
    nodes: &[Node],
    unique: &[usize],
    children_of: &mut HashMap<Option<usize>, Vec<usize>>,
) -> Vec<TreeNode> {
    let Some(slots) = children_of.remove(&parent) else {
        return Vec::new();
    };
    slots
        .into_iter()
        .map(|slot| TreeNode {
            node: nodes[unique[slot]].clone(),
            children: assemble(Some(slot), nodes, unique, children_of),
        })
        .collect()
}

/// Flattens a forest back into pre-order.
#[cfg(test)]
pub(crate) fn flatten_tree(tree: &[TreeNode]) -> Vec<&Node> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode> = tree.iter().rev().collect();
    while let Some(current) = stack.pop() {
        out.push(&current.node);
        stack.extend(current.children.iter().rev());
    }
    out
}

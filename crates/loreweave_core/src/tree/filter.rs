//! Text search over a built tree.
//!
//! A node survives when its name or joined tags contain the query
//! (case-insensitive), or when any descendant survives. Surviving nodes keep
//! only surviving children.

use crate::model::node::Node;
use crate::tree::builder::TreeNode;

/// Prunes `tree` down to matches and their ancestors.
///
/// A blank query returns the tree unchanged.
pub fn filter_tree(tree: &[TreeNode], query: &str) -> Vec<TreeNode> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tree.to_vec();
    }
    tree.iter()
        .filter_map(|item| prune(item, needle.as_str()))
        .collect()
}

/// Returns whether `node` matches an already-lowercased needle.
pub fn node_matches(node: &Node, needle: &str) -> bool {
    node.name.to_lowercase().contains(needle) || node.tags.join(" ").to_lowercase().contains(needle)
}

fn prune(item: &TreeNode, needle: &str) -> Option<TreeNode> {
    let children: Vec<TreeNode> = item
        .children
        .iter()
        .filter_map(|child| prune(child, needle))
        .collect();

    if children.is_empty() && !node_matches(&item.node, needle) {
        return None;
    }
    Some(TreeNode {
        node: item.node.clone(),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::{filter_tree, node_matches};
    use crate::model::node::{Node, NodeKind};
    use crate::tree::builder::{build_tree, flatten_tree, TreeNode};

    fn sample() -> (Vec<Node>, Vec<TreeNode>) {
        let cosmos = Node::new("u1", NodeKind::Cosmos, None, "Aeth");
        let world = Node::new("u1", NodeKind::World, Some(cosmos.id), "Aeth World");
        let era = Node::new("u1", NodeKind::Era, Some(world.id), "First Era");
        let capital = Node::new("u1", NodeKind::Setting, Some(era.id), "Capital");
        let other_era = Node::new("u1", NodeKind::Era, Some(world.id), "Second Era");
        let mut tagged = Node::new("u1", NodeKind::Page, Some(other_era.id), "Notes");
        tagged.tags = vec!["Dragons".to_string(), "lore".to_string()];
        let other_world = Node::new("u1", NodeKind::World, Some(cosmos.id), "Nether");
        let nodes = vec![cosmos, world, era, capital, other_era, tagged, other_world];
        let tree = build_tree(&nodes);
        (nodes, tree)
    }

    #[test]
    fn blank_query_is_identity() {
        let (_, tree) = sample();
        assert_eq!(filter_tree(&tree, ""), tree);
        assert_eq!(filter_tree(&tree, "   "), tree);
    }

    #[test]
    fn keeps_ancestor_path_of_match_and_prunes_siblings() {
        let (_, tree) = sample();
        let filtered = filter_tree(&tree, "capital");

        let names: Vec<_> = flatten_tree(&filtered)
            .into_iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["Aeth", "Aeth World", "First Era", "Capital"]);
    }

    #[test]
    fn matches_tags_case_insensitively() {
        let (_, tree) = sample();
        let filtered = filter_tree(&tree, "DRAGON");
        let names: Vec<_> = flatten_tree(&filtered)
            .into_iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["Aeth", "Aeth World", "Second Era", "Notes"]);
    }

    #[test]
    fn no_match_yields_empty_forest() {
        let (_, tree) = sample();
        assert!(filter_tree(&tree, "zzz").is_empty());
    }

    #[test]
    fn never_keeps_a_subtree_without_matches() {
        let (_, tree) = sample();
        for query in ["aeth", "era", "notes", "lore", "nether"] {
            for root in filter_tree(&tree, query) {
                assert_subtree_has_match(&root, query);
            }
        }
    }

    fn assert_subtree_has_match(item: &TreeNode, query: &str) {
        let has_match = flatten_tree(std::slice::from_ref(item))
            .into_iter()
            .any(|node| node_matches(node, query));
        assert!(has_match, "subtree of {} has no match", item.node.name);
        for child in &item.children {
            assert_subtree_has_match(child, query);
        }
    }
}

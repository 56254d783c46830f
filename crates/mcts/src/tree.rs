//! Arena-allocated search tree.
//!
//! Using a Vec<Node> with indices provides simple ownership: the arena owns
//! every node, a parent lists its children by index, and dropping the tree
//! drops everything at once.

use crate::node::{Node, NodeId};

/// Arena-allocated search tree.
///
/// Node 0 is the root. Nodes are appended in expansion order and never
/// removed individually; `reset` discards the whole tree while keeping the
/// allocation for the next search.
#[derive(Debug)]
pub struct Tree<S, A> {
    nodes: Vec<Node<S, A>>,
}

impl<S, A> Tree<S, A> {
    /// Create an empty tree (no root yet).
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Discard every node and install a fresh root.
    pub fn reset(&mut self, root: Node<S, A>) {
        self.nodes.clear();
        self.nodes.push(root);
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get(&self, id: NodeId) -> &Node<S, A> {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<S, A> {
        &mut self.nodes[id.0]
    }

    /// Append a child node and link it under its parent, returning its ID.
    ///
    /// # Panics
    /// Panics if the node has no parent or the parent ID is invalid.
    pub(crate) fn add_child(&mut self, node: Node<S, A>) -> NodeId {
        let parent = node.parent.expect("BUG: add_child called with a root node");
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Get the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True before the first search has installed a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the root node.
    ///
    /// # Panics
    /// Panics if the tree is empty.
    pub fn root(&self) -> &Node<S, A> {
        self.get(NodeId::ROOT)
    }

    /// Children of `id` in expansion order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node<S, A>)> {
        self.get(id).children.iter().map(move |&c| (c, self.get(c)))
    }

    /// Every node with its ID, in expansion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<S, A>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).parent;
        }
        depth
    }
}

impl<S, A> Default for Tree<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_tree() -> (Tree<u8, char>, NodeId, NodeId) {
        let mut tree = Tree::new();
        tree.reset(Node::root(0, false, vec!['a', 'b']));
        let a = tree.add_child(Node::child(1, 'a', 0.0, NodeId::ROOT, false, vec!['a', 'b']));
        let aa = tree.add_child(Node::child(2, 'a', 1.0, a, true, vec!['a', 'b']));
        (tree, a, aa)
    }

    #[test]
    fn test_tree_creation() {
        let tree: Tree<u8, char> = Tree::new();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_add_child_links_parent() {
        let (tree, a, aa) = line_tree();

        assert_eq!(tree.len(), 3);
        assert_eq!(a.index(), 1); // After root
        assert_eq!(tree.root().children, vec![a]);
        assert_eq!(tree.get(a).children, vec![aa]);
        assert_eq!(tree.get(aa).parent, Some(a));
    }

    #[test]
    fn test_tree_depth() {
        let (tree, a, aa) = line_tree();
        assert_eq!(tree.depth(NodeId::ROOT), 0);
        assert_eq!(tree.depth(a), 1);
        assert_eq!(tree.depth(aa), 2);
    }

    #[test]
    fn test_tree_reset() {
        let (mut tree, _, _) = line_tree();

        tree.reset(Node::root(7, false, vec!['b']));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().state, 7);
        assert!(tree.root().children.is_empty());
        assert_eq!(tree.root().stats.visits, 0);
    }

    #[test]
    fn test_children_iteration_order() {
        let mut tree = Tree::new();
        tree.reset(Node::root(0u8, false, vec!['a', 'b']));
        tree.add_child(Node::child(1, 'b', 0.0, NodeId::ROOT, false, vec![]));
        tree.add_child(Node::child(2, 'a', 0.0, NodeId::ROOT, false, vec![]));

        let actions: Vec<char> = tree
            .children(NodeId::ROOT)
            .filter_map(|(_, n)| n.action)
            .collect();
        assert_eq!(actions, vec!['b', 'a']);
    }
}

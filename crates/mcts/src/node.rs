//! MCTS node types for tree storage.
//!
//! Uses arena allocation with indices: children are owned through the arena,
//! and the parent link is a plain index used only for backpropagation.

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in expansion order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Visit statistics for a single node.
///
/// `value` is a running mean of observed returns, so it can be compared
/// directly across nodes with different visit counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeStats {
    /// Number of backpropagation passes through this node.
    pub visits: u64,

    /// Mean discounted return over all visits (0.0 while unvisited).
    pub value: f64,
}

impl NodeStats {
    /// Fold one observed return into the running mean.
    pub fn record(&mut self, reward: f64) {
        self.visits += 1;
        self.value += (reward - self.value) / self.visits as f64;
    }

    /// The same statistics with `value` rescaled by `bounds`.
    pub fn normalized(&self, bounds: &ValueBounds) -> NodeStats {
        NodeStats {
            visits: self.visits,
            value: bounds.normalize(self.value),
        }
    }
}

/// Smallest and largest return recorded anywhere in the tree.
///
/// Used to map mean values into `[0, 1]` before the UCB1 bonus is added, so
/// the exploration weight means the same thing whatever the reward scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueBounds {
    min: f64,
    max: f64,
}

impl Default for ValueBounds {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ValueBounds {
    pub fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Position of `value` inside the observed range. Until two distinct
    /// returns have been seen `value` is passed through unchanged.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max > self.min {
            (value - self.min) / (self.max - self.min)
        } else {
            value
        }
    }
}

/// A node in the search tree.
#[derive(Clone, Debug)]
pub struct Node<S, A> {
    /// State this node stands for.
    pub state: S,

    /// Edge label: the action that produced this node (None for root).
    pub action: Option<A>,

    /// Non-owning back-reference (None for root).
    pub parent: Option<NodeId>,

    /// Reward of the sampled transition into this node (0.0 for root).
    pub reward: f64,

    /// Children in expansion order.
    pub children: Vec<NodeId>,

    /// Actions not yet expanded from this node. Empty for terminal nodes.
    pub untried_actions: Vec<A>,

    /// Whether the state satisfies the environment's terminal predicate.
    pub terminal: bool,

    pub stats: NodeStats,
}

impl<S, A> Node<S, A> {
    /// Create the root node for `state`.
    pub fn root(state: S, terminal: bool, actions: Vec<A>) -> Self {
        Self::new(state, None, None, 0.0, terminal, actions)
    }

    /// Create a child reached from `parent` by `action`, paying `reward`.
    pub fn child(
        state: S,
        action: A,
        reward: f64,
        parent: NodeId,
        terminal: bool,
        actions: Vec<A>,
    ) -> Self {
        Self::new(state, Some(action), Some(parent), reward, terminal, actions)
    }

    fn new(
        state: S,
        action: Option<A>,
        parent: Option<NodeId>,
        reward: f64,
        terminal: bool,
        actions: Vec<A>,
    ) -> Self {
        Self {
            state,
            action,
            parent,
            reward,
            children: Vec::new(),
            // Terminal states are never expanded
            untried_actions: if terminal { Vec::new() } else { actions },
            terminal,
            stats: NodeStats::default(),
        }
    }

    /// True once every action has been instantiated as a child.
    pub fn is_fully_expanded(&self) -> bool {
        self.untried_actions.is_empty()
    }

    /// A non-terminal node with nothing left to expand and nothing below it.
    pub fn is_dead_end(&self) -> bool {
        !self.terminal && self.untried_actions.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_running_mean() {
        let mut stats = NodeStats::default();

        // Unvisited node has value 0
        assert_eq!(stats.visits, 0);
        assert_eq!(stats.value, 0.0);

        stats.record(1.0);
        stats.record(2.0);
        stats.record(6.0);
        assert_eq!(stats.visits, 3);
        assert!((stats.value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_root_node() {
        let root: Node<u8, char> = Node::root(4, false, vec!['l', 'r']);
        assert_eq!(root.action, None);
        assert_eq!(root.parent, None);
        assert_eq!(root.reward, 0.0);
        assert_eq!(root.untried_actions, vec!['l', 'r']);
        assert!(!root.is_fully_expanded());
    }

    #[test]
    fn test_terminal_node_has_no_untried_actions() {
        let node: Node<u8, char> = Node::child(9, 'r', 2.5, NodeId::ROOT, true, vec!['l', 'r']);
        assert_eq!(node.action, Some('r'));
        assert_eq!(node.reward, 2.5);
        assert_eq!(node.parent, Some(NodeId::ROOT));
        assert!(node.untried_actions.is_empty());
        assert!(!node.is_dead_end());
    }

    #[test]
    fn test_bounds_normalize_into_unit_range() {
        let mut bounds = ValueBounds::default();

        // Nothing to scale against yet
        assert_eq!(bounds.normalize(-3.0), -3.0);
        bounds.update(-100.0);
        assert_eq!(bounds.normalize(-100.0), -100.0);

        bounds.update(10.0);
        bounds.update(-1.0);
        assert_eq!(bounds.normalize(-100.0), 0.0);
        assert_eq!(bounds.normalize(10.0), 1.0);
        assert!((bounds.normalize(-45.0) - 0.5).abs() < 1e-12);

        let stats = NodeStats { visits: 7, value: 10.0 }.normalized(&bounds);
        assert_eq!(stats, NodeStats { visits: 7, value: 1.0 });
    }

    #[test]
    fn test_visits_past_u32_range() {
        let mut stats = NodeStats {
            visits: u64::from(u32::MAX),
            value: 2.0,
        };
        stats.record(2.0);
        assert_eq!(stats.visits, u64::from(u32::MAX) + 1);
        assert_eq!(stats.value, 2.0);
    }

    #[test]
    fn test_dead_end() {
        let node: Node<u8, char> = Node::root(0, false, Vec::new());
        assert!(node.is_dead_end());
    }
}

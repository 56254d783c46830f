//! Monte Carlo Tree Search implementation.
//!
//! Implements UCB1 tree search for single-agent MDPs: each iteration selects
//! a path with UCB1, expands one new child, scores it with a rollout and
//! backpropagates the discounted return to the root.
//!
//! A node's value is the mean return of entering it: the reward sampled on
//! its incoming edge plus the discounted value of what follows.

use crate::{
    config::{Budget, MctsConfig, Recommendation},
    evaluator::{Evaluator, RolloutEvaluator},
    node::{Node, NodeId, NodeStats, ValueBounds},
    tree::Tree,
};
use log::{debug, trace};
use mdp_core::{ActionDistribution, Environment, MdpError, Result, WorkingStateGuard};
use rand::Rng;
use std::time::Instant;

/// UCB1 score of a child whose parent has been visited `parent_visits` times.
///
/// Unvisited children score `+∞`, so every child is tried once before the
/// exploration bonus is computed; the logarithm is therefore never taken of 0.
pub fn ucb1(child: &NodeStats, parent_visits: u64, exploration_weight: f64) -> f64 {
    if child.visits == 0 {
        return f64::INFINITY;
    }
    // A parent is visited at least as often as any of its children
    let parent_visits = parent_visits.max(child.visits) as f64;
    child.value + exploration_weight * (parent_visits.ln() / child.visits as f64).sqrt()
}

/// Statistics for one root child.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildStats<A> {
    /// Edge label of the child.
    pub action: A,
    pub visits: u64,
    /// Mean discounted return observed from the child.
    pub value: f64,
}

/// Softmax policy over root children plus the best single value estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftmaxPolicy<A> {
    pub distribution: ActionDistribution<A>,
    pub best_value: f64,
}

/// Result of an MCTS search.
#[derive(Clone, Debug)]
pub struct SearchResult<A> {
    /// Root children in expansion order.
    pub children: Vec<ChildStats<A>>,

    /// Most-visited root child, or the first action in `actions()` order if
    /// no child was expanded. None only when the environment has no actions.
    pub best_action: Option<A>,

    /// Mean return observed at the root.
    pub root_value: f64,

    /// Completed selection/rollout/backpropagation cycles.
    pub iterations: usize,

    /// The environment's action set at search time.
    pub actions: Vec<A>,
}

impl<A: Copy + PartialEq> SearchResult<A> {
    /// Visit count per root child.
    pub fn visit_counts(&self) -> Vec<(A, u64)> {
        self.children.iter().map(|c| (c.action, c.visits)).collect()
    }

    /// Highest value among root children.
    pub fn best_value(&self) -> Option<f64> {
        self.children.iter().map(|c| c.value).reduce(f64::max)
    }

    /// Softmax over root children's value estimates.
    ///
    /// Only expanded children take part. Without any child the distribution is
    /// uniform over the action set and `best_value` is the root value; with no
    /// actions at all there is nothing to return.
    ///
    /// # Errors
    /// Returns error if `temperature` is not positive.
    pub fn softmax(&self, temperature: f64) -> Result<Option<SoftmaxPolicy<A>>> {
        match self.best_value() {
            Some(best_value) => {
                let values: Vec<(A, f64)> =
                    self.children.iter().map(|c| (c.action, c.value)).collect();
                Ok(Some(SoftmaxPolicy {
                    distribution: ActionDistribution::softmax(&values, temperature)?,
                    best_value,
                }))
            }
            None if self.actions.is_empty() => Ok(None),
            None => Ok(Some(SoftmaxPolicy {
                distribution: ActionDistribution::uniform(&self.actions)?,
                best_value: self.root_value,
            })),
        }
    }
}

/// Monte Carlo Tree Search with UCB1 selection.
///
/// Generic over:
/// - `E`: The environment being planned in
/// - `V`: The leaf evaluation strategy (random rollouts by default)
/// - `R`: The random number generator; every stochastic choice draws from it
pub struct Mcts<E: Environment, V, R> {
    config: MctsConfig,
    evaluator: V,
    rng: R,
    tree: Tree<E::State, E::Action>,
    bounds: ValueBounds,
}

impl<E, V, R> Mcts<E, V, R>
where
    E: Environment,
    V: Evaluator<E>,
    R: Rng,
{
    /// Create a new MCTS instance.
    pub fn new(config: MctsConfig, evaluator: V, rng: R) -> Self {
        Self {
            config,
            evaluator,
            rng,
            tree: Tree::new(),
            bounds: ValueBounds::default(),
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// The tree built by the most recent search (empty before the first).
    pub fn tree(&self) -> &Tree<E::State, E::Action> {
        &self.tree
    }

    /// Run MCTS from `root_state`, returning search results.
    ///
    /// The tree is rebuilt from scratch. The environment's working state is
    /// only borrowed and is unchanged when this returns.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a bad configuration and propagates
    /// environment errors (`InvalidAction`, `MalformedTransition`).
    pub fn search(&mut self, env: &mut E, root_state: &E::State) -> Result<SearchResult<E::Action>> {
        self.config.validate()?;

        let actions = env.actions();
        let terminal = env.is_terminal(root_state);
        self.tree
            .reset(Node::root(root_state.clone(), terminal, actions.clone()));
        self.bounds = ValueBounds::default();

        let start = Instant::now();
        let mut iterations = 0;
        while self.has_budget(iterations, start) {
            self.iterate(env)?;
            iterations += 1;
        }

        let result = self.extract_results(actions, iterations);
        debug!(
            "search from {:?}: {} iterations, {} nodes in {:?}, best {:?} (root value {:.3})",
            root_state,
            iterations,
            self.tree.len(),
            start.elapsed(),
            result.best_action,
            result.root_value
        );
        Ok(result)
    }

    /// Search and return the recommended action.
    ///
    /// Uses `config.recommendation`: the most-visited root child by default,
    /// or a sample from the softmax over child values. Returns None only when
    /// the environment has no actions.
    pub fn select_action(&mut self, env: &mut E, root_state: &E::State) -> Result<Option<E::Action>> {
        let result = self.search(env, root_state)?;

        match self.config.recommendation {
            Recommendation::MostVisits => Ok(result.best_action),
            Recommendation::Softmax => Ok(result
                .softmax(self.config.softmax_temperature)?
                .map(|policy| policy.distribution.sample(&mut self.rng))),
        }
    }

    /// Search and return a softmax distribution over root actions.
    pub fn action_distribution(
        &mut self,
        env: &mut E,
        root_state: &E::State,
    ) -> Result<Option<SoftmaxPolicy<E::Action>>> {
        let result = self.search(env, root_state)?;
        result.softmax(self.config.softmax_temperature)
    }

    fn has_budget(&self, iterations: usize, start: Instant) -> bool {
        match self.config.budget {
            Budget::Iterations(limit) => iterations < limit,
            Budget::TimeLimit(limit) => start.elapsed() < limit,
        }
    }

    /// Run a single iteration: select -> expand -> evaluate -> backpropagate.
    fn iterate(&mut self, env: &mut E) -> Result<()> {
        let leaf = self.select_and_expand(env)?;
        let reward = self.evaluate_leaf(env, leaf)?;
        self.backpropagate(leaf, reward);
        Ok(())
    }

    /// Descend with UCB1 to a node with untried actions, a terminal node or a
    /// dead end. Expands one child in the first case and returns it.
    fn select_and_expand(&mut self, env: &mut E) -> Result<NodeId> {
        let mut current = NodeId::ROOT;

        loop {
            let node = self.tree.get(current);

            if node.terminal {
                return Ok(current);
            }
            if !node.untried_actions.is_empty() {
                return self.expand(env, current);
            }
            if node.children.is_empty() {
                // Dead end: nothing to expand, nothing to descend into
                return Ok(current);
            }

            current = self.select_child(current);
        }
    }

    /// Select the child with the highest UCB1 score; ties go to the earliest
    /// expanded child.
    fn select_child(&self, node_id: NodeId) -> NodeId {
        let node = self.tree.get(node_id);
        let parent_visits = node.stats.visits;

        let mut best = None;
        let mut best_score = f64::NEG_INFINITY;

        for &child_id in &node.children {
            let stats = &self.tree.get(child_id).stats;
            let score = if self.config.normalize_values {
                ucb1(&stats.normalized(&self.bounds), parent_visits, self.config.exploration_weight)
            } else {
                ucb1(stats, parent_visits, self.config.exploration_weight)
            };
            if best.is_none() || score > best_score {
                best = Some(child_id);
                best_score = score;
            }
        }

        // INVARIANT: only called on nodes with children
        best.expect("BUG: select_child called on node without children")
    }

    /// Expand one untried action of `node_id`, chosen uniformly at random.
    fn expand(&mut self, env: &mut E, node_id: NodeId) -> Result<NodeId> {
        let node = self.tree.get_mut(node_id);
        let index = self.rng.gen_range(0..node.untried_actions.len());
        let action = node.untried_actions.swap_remove(index);
        let state = node.state.clone();

        let transition = {
            let mut scratch = WorkingStateGuard::enter(env, state);
            scratch.step(action, &mut self.rng)?.validated()?
        };

        let terminal = transition.done || env.is_terminal(&transition.state);
        let child = Node::child(
            transition.state,
            action,
            transition.reward,
            node_id,
            terminal,
            env.actions(),
        );
        let child_id = self.tree.add_child(child);

        trace!(
            "expanded node {} via {:?} -> node {} {:?} reward {}{}",
            node_id.index(),
            action,
            child_id.index(),
            self.tree.get(child_id).state,
            self.tree.get(child_id).reward,
            if terminal { " (terminal)" } else { "" }
        );
        Ok(child_id)
    }

    /// Return estimate for a leaf.
    ///
    /// Terminal nodes and dead ends have no future, so a child is worth its
    /// edge reward alone and the root its state's reward. Anything else is
    /// worth its edge reward plus the discounted evaluator estimate.
    fn evaluate_leaf(&mut self, env: &mut E, node_id: NodeId) -> Result<f64> {
        let node = self.tree.get(node_id);
        let edge_reward = node.reward;

        if node.terminal || node.is_dead_end() {
            if node.parent.is_some() {
                return Ok(edge_reward);
            }
            let reward = env.reward(&node.state);
            if !reward.is_finite() {
                return Err(MdpError::MalformedTransition(format!(
                    "reward {} for {:?} is not finite",
                    reward, node.state
                )));
            }
            return Ok(reward);
        }

        let state = node.state.clone();
        let future = self
            .evaluator
            .evaluate(env, &state, &self.config, &mut self.rng)?;
        Ok(edge_reward + self.config.discount_factor * future)
    }

    /// Fold `reward` into every node from `leaf` up to the root. Each level
    /// up discounts the return once and adds that level's edge reward.
    fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let discount = self.config.discount_factor;
        let mut reward = reward;
        let mut current = Some(leaf);

        while let Some(node_id) = current {
            let node = self.tree.get_mut(node_id);
            node.stats.record(reward);
            current = node.parent;
            self.bounds.update(reward);

            if let Some(parent) = current {
                reward = self.tree.get(parent).reward + discount * reward;
            }
        }
    }

    /// Extract search results from the root node.
    fn extract_results(&self, actions: Vec<E::Action>, iterations: usize) -> SearchResult<E::Action> {
        let children: Vec<ChildStats<E::Action>> = self
            .tree
            .children(NodeId::ROOT)
            .map(|(_, child)| ChildStats {
                // INVARIANT: every non-root node carries its edge label
                action: child.action.expect("BUG: child node without an action"),
                visits: child.stats.visits,
                value: child.stats.value,
            })
            .collect();

        // Most visits wins; ties keep the earliest expanded child
        let mut best: Option<&ChildStats<E::Action>> = None;
        for child in &children {
            if best.map_or(true, |b| child.visits > b.visits) {
                best = Some(child);
            }
        }

        // Nothing expanded (zero budget, terminal root or dead end) - fall
        // back to the first action so callers always get one
        let best_action = best.map(|c| c.action).or_else(|| actions.first().copied());

        SearchResult {
            children,
            best_action,
            root_value: self.tree.root().stats.value,
            iterations,
            actions,
        }
    }
}

/// Run a fresh search with the uniform rollout evaluator and return the
/// recommended action.
///
/// # Example
///
/// ```
/// use mdp_core::Environment;
/// use mdp_gridworld::{LineWorld, Move};
/// use mdp_mcts::{select_action, MctsConfig};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut env = LineWorld::new(3, 10.0);
/// let start = env.reset();
/// let config = MctsConfig::with_iterations(500);
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
///
/// let action = select_action(&mut env, &start, &config, &mut rng).unwrap();
/// assert_eq!(action, Some(Move::Right));
/// ```
pub fn select_action<E, R>(
    env: &mut E,
    root_state: &E::State,
    config: &MctsConfig,
    rng: &mut R,
) -> Result<Option<E::Action>>
where
    E: Environment,
    R: Rng,
{
    let mut mcts = Mcts::new(config.clone(), RolloutEvaluator::uniform(), rng);
    mcts.select_action(env, root_state)
}

//! Monte Carlo Tree Search for single-agent MDPs.
//!
//! This crate provides a generic UCB1 tree search that can be used with
//! any environment implementing the `mdp_core::Environment` trait.
//!
//! # Features
//!
//! - **Generic**: Works with any `Environment` implementation
//! - **UCB1 Selection**: Unvisited children first, then mean value plus an
//!   exploration bonus; values are rescaled to the tree's observed return
//!   range by default
//! - **Edge Rewards**: Rewards sampled while expanding are folded into every
//!   ancestor's return
//! - **Evaluator Abstraction**: Random rollouts by default, pluggable
//!   default policy
//! - **Budgets**: Fixed iteration count or wall-clock time limit
//! - **Recommendations**: Most-visited action, or a softmax distribution over
//!   root values
//!
//! # Example
//!
//! ```
//! use mdp_core::Environment;
//! use mdp_gridworld::GridWorld;
//! use mdp_mcts::{Mcts, MctsConfig, RolloutEvaluator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut env = GridWorld::classic();
//! let state = env.reset();
//!
//! let config = MctsConfig::with_iterations(200).discount_factor(0.9);
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let mut mcts = Mcts::new(config, RolloutEvaluator::uniform(), rng);
//!
//! let result = mcts.search(&mut env, &state).unwrap();
//! println!("Best action: {:?}", result.best_action);
//! println!("Root value: {}", result.root_value);
//!
//! // The search only borrowed the working state
//! assert_eq!(env.state(), state);
//! ```

pub mod config;
pub mod evaluator;
mod node;
pub mod search;
mod tree;

pub use config::{Budget, MctsConfig, Recommendation};
pub use evaluator::{rollout, Evaluator, RolloutEvaluator, RolloutPolicy, UniformPolicy};
pub use node::{Node, NodeId, NodeStats, ValueBounds};
pub use search::{select_action, ucb1, ChildStats, Mcts, SearchResult, SoftmaxPolicy};
pub use tree::Tree;

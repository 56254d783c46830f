//! MDP Core - Environment abstraction and common types
//!
//! This crate provides the [`Environment`] trait through which planners
//! interact with a single-agent Markov Decision Process, plus the shared
//! error and distribution types.
//!
//! # Types
//!
//! - [`Environment`] - Trait for MDP implementations
//! - [`Transition`] - Result of a single step
//! - [`WorkingStateGuard`] - Scoped borrow of the environment's working state
//! - [`ActionDistribution`] - Probability distribution over actions (sums to 1.0)

mod env;
mod error;
mod types;

pub use env::{Environment, Transition, WorkingStateGuard};
pub use error::{MdpError, Result};
pub use types::ActionDistribution;

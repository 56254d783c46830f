//! MCTS configuration parameters.
//!
//! These parameters control the behavior of the Monte Carlo Tree Search algorithm.

use mdp_core::{MdpError, Result};
use std::time::Duration;

/// How much search to run per decision.
///
/// The budget is checked only between iterations, so a time limit may be
/// overrun by at most one selection/rollout cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Run exactly this many iterations.
    Iterations(usize),

    /// Keep starting new iterations until this much wall-clock time has passed.
    TimeLimit(Duration),
}

/// How the recommended action is extracted from the root's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Recommendation {
    /// Action of the most-visited root child (ties: earliest expanded).
    #[default]
    MostVisits,

    /// Sample from a softmax over root children's value estimates.
    Softmax,
}

/// MCTS configuration parameters.
#[derive(Clone, Debug)]
pub struct MctsConfig {
    /// Search budget per call.
    pub budget: Budget,

    /// UCB1 exploration weight `c` in `value + c * sqrt(ln(N) / n)`.
    /// 0 = pure exploitation once every child has been visited.
    pub exploration_weight: f64,

    /// Rescale `value` in the UCB1 score into `[0, 1]` using the range of
    /// returns seen so far in the tree. When false the raw mean is used and
    /// `exploration_weight` has to be tuned to the environment's reward scale.
    pub normalize_values: bool,

    /// Discount applied per step in rollouts and per level in backpropagation.
    /// Must lie in [0, 1].
    pub discount_factor: f64,

    /// Maximum number of steps in a single rollout.
    pub rollout_horizon: usize,

    /// Temperature for the softmax action distribution.
    /// - small: nearly greedy on value
    /// - large: nearly uniform
    pub softmax_temperature: f64,

    /// Which action `select_action` returns.
    pub recommendation: Recommendation,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            budget: Budget::Iterations(1000),
            exploration_weight: 1.0,
            normalize_values: true,
            discount_factor: 0.9,
            rollout_horizon: 100,
            softmax_temperature: 1.0,
            recommendation: Recommendation::MostVisits,
        }
    }
}

impl MctsConfig {
    /// Create a new config running the given number of iterations.
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            budget: Budget::Iterations(iterations),
            ..Default::default()
        }
    }

    /// Create a new config bounded by wall-clock time.
    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            budget: Budget::TimeLimit(limit),
            ..Default::default()
        }
    }

    pub fn exploration_weight(mut self, exploration_weight: f64) -> Self {
        self.exploration_weight = exploration_weight;
        self
    }

    pub fn normalize_values(mut self, normalize_values: bool) -> Self {
        self.normalize_values = normalize_values;
        self
    }

    pub fn discount_factor(mut self, discount_factor: f64) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    pub fn rollout_horizon(mut self, rollout_horizon: usize) -> Self {
        self.rollout_horizon = rollout_horizon;
        self
    }

    pub fn softmax_temperature(mut self, softmax_temperature: f64) -> Self {
        self.softmax_temperature = softmax_temperature;
        self
    }

    pub fn recommendation(mut self, recommendation: Recommendation) -> Self {
        self.recommendation = recommendation;
        self
    }

    /// Check that every parameter is inside its domain.
    ///
    /// # Errors
    /// Returns `MdpError::InvalidConfig` describing the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.exploration_weight.is_finite() && self.exploration_weight >= 0.0) {
            return Err(MdpError::InvalidConfig(format!(
                "exploration weight {} must be a non-negative number",
                self.exploration_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(MdpError::InvalidConfig(format!(
                "discount factor {} is outside [0, 1]",
                self.discount_factor
            )));
        }
        if !(self.softmax_temperature.is_finite() && self.softmax_temperature > 0.0) {
            return Err(MdpError::InvalidConfig(format!(
                "softmax temperature {} must be positive",
                self.softmax_temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.budget, Budget::Iterations(1000));
        assert!((config.exploration_weight - 1.0).abs() < 1e-12);
        assert!((config.discount_factor - 0.9).abs() < 1e-12);
        assert_eq!(config.rollout_horizon, 100);
        assert_eq!(config.recommendation, Recommendation::MostVisits);
        assert!(config.normalize_values);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_iterations() {
        let config = MctsConfig::with_iterations(500);
        assert_eq!(config.budget, Budget::Iterations(500));
        // Other values should be default
        assert!((config.discount_factor - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_with_time_limit() {
        let config = MctsConfig::with_time_limit(Duration::from_millis(20));
        assert_eq!(config.budget, Budget::TimeLimit(Duration::from_millis(20)));
    }

    #[test]
    fn test_builders() {
        let config = MctsConfig::with_iterations(10)
            .exploration_weight(0.0)
            .normalize_values(false)
            .discount_factor(1.0)
            .rollout_horizon(5)
            .softmax_temperature(0.5)
            .recommendation(Recommendation::Softmax);

        assert_eq!(config.exploration_weight, 0.0);
        assert!(!config.normalize_values);
        assert_eq!(config.discount_factor, 1.0);
        assert_eq!(config.rollout_horizon, 5);
        assert_eq!(config.softmax_temperature, 0.5);
        assert_eq!(config.recommendation, Recommendation::Softmax);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_domain() {
        assert!(MctsConfig::default().discount_factor(1.5).validate().is_err());
        assert!(MctsConfig::default().discount_factor(-0.1).validate().is_err());
        assert!(MctsConfig::default().exploration_weight(-1.0).validate().is_err());
        assert!(MctsConfig::default().exploration_weight(f64::NAN).validate().is_err());
        assert!(MctsConfig::default().softmax_temperature(0.0).validate().is_err());
    }
}

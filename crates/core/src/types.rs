//! Planning output types with enforced invariants.
//!
//! - ActionDistribution: probability distribution over actions summing to 1.0

use crate::{MdpError, Result};
use rand::Rng;

/// Tolerance for probability sum validation.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-9;

/// A probability distribution over actions.
///
/// Invariant: non-empty, all probabilities non-negative, summing to 1.0
/// (±1e-9). Entries keep the order they were built in.
///
/// # Example
/// ```
/// use mdp_core::ActionDistribution;
///
/// let dist = ActionDistribution::softmax(&[('a', 1.0), ('b', 1.0)], 1.0).unwrap();
/// assert!((dist.probability('a') - 0.5).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDistribution<A> {
    entries: Vec<(A, f64)>,
}

impl<A: Copy + PartialEq> ActionDistribution<A> {
    /// Create a distribution from `(action, probability)` pairs.
    ///
    /// # Errors
    /// Returns `MdpError::InvalidDistribution` if:
    /// - The entry list is empty
    /// - Any probability is negative or not finite
    /// - Probabilities don't sum to 1.0 (±1e-9)
    pub fn new(entries: Vec<(A, f64)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(MdpError::InvalidDistribution(
                "distribution cannot be empty".to_string(),
            ));
        }

        if entries.iter().any(|&(_, p)| !p.is_finite() || p < 0.0) {
            return Err(MdpError::InvalidDistribution(
                "distribution contains negative or non-finite values".to_string(),
            ));
        }

        let sum: f64 = entries.iter().map(|&(_, p)| p).sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(MdpError::InvalidDistribution(format!(
                "distribution sum {} is not 1.0 (tolerance {})",
                sum, PROBABILITY_SUM_TOLERANCE
            )));
        }

        Ok(Self { entries })
    }

    /// Uniform distribution over `actions`.
    ///
    /// # Errors
    /// Returns error if `actions` is empty.
    pub fn uniform(actions: &[A]) -> Result<Self> {
        if actions.is_empty() {
            return Err(MdpError::InvalidDistribution(
                "cannot create uniform distribution over 0 actions".to_string(),
            ));
        }

        let p = 1.0 / actions.len() as f64;
        Ok(Self {
            entries: actions.iter().map(|&a| (a, p)).collect(),
        })
    }

    /// Softmax over value estimates: P(a) ∝ exp(v(a) / τ).
    ///
    /// The maximum value is subtracted before exponentiating, so large
    /// returns don't overflow.
    ///
    /// # Errors
    /// Returns error if `values` is empty, a value is not finite, or
    /// `temperature` is not a positive finite number.
    pub fn softmax(values: &[(A, f64)], temperature: f64) -> Result<Self> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(MdpError::InvalidDistribution(format!(
                "softmax temperature {} must be positive",
                temperature
            )));
        }
        if values.is_empty() {
            return Err(MdpError::InvalidDistribution(
                "cannot take softmax of 0 values".to_string(),
            ));
        }
        if values.iter().any(|&(_, v)| !v.is_finite()) {
            return Err(MdpError::InvalidDistribution(
                "softmax input contains non-finite values".to_string(),
            ));
        }

        let max = values
            .iter()
            .map(|&(_, v)| v)
            .fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = values
            .iter()
            .map(|&(_, v)| ((v - max) / temperature).exp())
            .collect();
        // The max entry contributes exp(0) = 1, so the sum is at least 1
        let sum: f64 = weights.iter().sum();

        Ok(Self {
            entries: values
                .iter()
                .zip(weights)
                .map(|(&(a, _), w)| (a, w / sum))
                .collect(),
        })
    }

    /// Probability of `action`, or 0 if it is not in the distribution.
    pub fn probability(&self, action: A) -> f64 {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map(|&(_, p)| p)
            .unwrap_or(0.0)
    }

    /// The most likely action; ties go to the earliest entry.
    pub fn most_likely(&self) -> A {
        let mut best = self.entries[0];
        for &entry in &self.entries[1..] {
            if entry.1 > best.1 {
                best = entry;
            }
        }
        best.0
    }

    /// Sample an action according to the distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> A {
        let threshold: f64 = rng.gen::<f64>();
        let mut cumulative = 0.0;

        for &(action, p) in &self.entries {
            cumulative += p;
            if cumulative > threshold {
                return action;
            }
        }

        // Rounding left the cumulative sum just under the threshold
        self.entries[self.entries.len() - 1].0
    }

    /// Number of actions in the distribution.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed distribution.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all probabilities (should be ~1.0).
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|&(_, p)| p).sum()
    }

    /// Iterate over `(action, probability)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = &(A, f64)> {
        self.entries.iter()
    }
}

//! Leaf evaluation for MCTS.
//!
//! The `Evaluator` trait lets the search swap how a freshly expanded leaf is
//! scored. The default, `RolloutEvaluator`, plays a `RolloutPolicy` forward
//! from the leaf's state and returns the discounted sum of rewards.

use crate::config::MctsConfig;
use mdp_core::{Environment, Result, WorkingStateGuard};
use rand::Rng;

/// Default policy used to pick actions during a rollout.
pub trait RolloutPolicy<E: Environment> {
    /// Choose the next action from `state`, or None to end the rollout.
    fn choose<R: Rng + ?Sized>(&self, env: &E, state: &E::State, rng: &mut R)
        -> Option<E::Action>;
}

/// Uniformly random rollout policy, using the environment's action sampler.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformPolicy;

impl<E: Environment> RolloutPolicy<E> for UniformPolicy {
    fn choose<R: Rng + ?Sized>(&self, env: &E, _state: &E::State, rng: &mut R) -> Option<E::Action> {
        env.sample_action(rng)
    }
}

/// Trait for estimating the return of a non-terminal leaf.
pub trait Evaluator<E: Environment> {
    /// Estimate the discounted return obtainable from `state`.
    ///
    /// Implementations may borrow the environment's working state but must
    /// leave it exactly as they found it.
    fn evaluate<R: Rng + ?Sized>(
        &self,
        env: &mut E,
        state: &E::State,
        config: &MctsConfig,
        rng: &mut R,
    ) -> Result<f64>;
}

/// Evaluator using random rollouts.
///
/// Rollouts run for at most `config.rollout_horizon` steps with rewards
/// discounted by `config.discount_factor` per step.
#[derive(Clone, Debug, Default)]
pub struct RolloutEvaluator<P = UniformPolicy> {
    policy: P,
}

impl RolloutEvaluator<UniformPolicy> {
    /// Rollout evaluator with the uniform-random default policy.
    pub fn uniform() -> Self {
        Self {
            policy: UniformPolicy,
        }
    }
}

impl<P> RolloutEvaluator<P> {
    /// Create a rollout evaluator with a custom default policy.
    pub fn new(policy: P) -> Self {
        Self { policy }
    }
}

impl<E: Environment, P: RolloutPolicy<E>> Evaluator<E> for RolloutEvaluator<P> {
    fn evaluate<R: Rng + ?Sized>(
        &self,
        env: &mut E,
        state: &E::State,
        config: &MctsConfig,
        rng: &mut R,
    ) -> Result<f64> {
        rollout(
            env,
            &self.policy,
            state.clone(),
            config.rollout_horizon,
            config.discount_factor,
            rng,
        )
    }
}

/// Perform one rollout from `start`.
///
/// Returns `Σ discount^depth * reward_depth` over the steps taken. The
/// rollout stops when a step reports `done`, when `horizon` steps have been
/// taken, or when the policy has no action to offer. The environment's
/// working state is restored before returning, on the error path too.
///
/// # Errors
/// Propagates `InvalidAction` from the policy and `MalformedTransition` for
/// non-finite rewards.
pub fn rollout<E, P, R>(
    env: &mut E,
    policy: &P,
    start: E::State,
    horizon: usize,
    discount: f64,
    rng: &mut R,
) -> Result<f64>
where
    E: Environment,
    P: RolloutPolicy<E>,
    R: Rng + ?Sized,
{
    let mut scratch = WorkingStateGuard::enter(env, start);
    let mut total = 0.0;
    // discount^depth
    let mut weight = 1.0;

    for _ in 0..horizon {
        let state = scratch.state();
        if scratch.is_terminal(&state) {
            break;
        }
        let Some(action) = policy.choose(&*scratch, &state, rng) else {
            break;
        };

        let transition = scratch.step(action, rng)?.validated()?;
        total += weight * transition.reward;
        weight *= discount;

        if transition.done {
            break;
        }
    }

    Ok(total)
}

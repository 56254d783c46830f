use crate::{MdpError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// Outcome of a single environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
    /// State the environment moved to.
    pub state: S,

    /// Reward received for arriving in `state`.
    pub reward: f64,

    /// Whether `state` ends the episode.
    pub done: bool,
}

impl<S> Transition<S> {
    pub fn new(state: S, reward: f64, done: bool) -> Self {
        Self {
            state,
            reward,
            done,
        }
    }

    /// Reject transitions whose reward is NaN or infinite.
    pub fn validated(self) -> Result<Self> {
        if self.reward.is_finite() {
            Ok(self)
        } else {
            Err(MdpError::MalformedTransition(format!(
                "reward {} is not finite",
                self.reward
            )))
        }
    }
}

/// A single-agent MDP environment for planning.
///
/// The environment owns one mutable *working state*: `step` reads and advances
/// it. Planners explore hypothetical futures by borrowing that working state
/// through [`WorkingStateGuard`], which puts it back when dropped.
///
/// The action set is fixed and independent of state, as in grid-world style
/// problems. An environment may expose no actions at all.
pub trait Environment {
    /// A position in the state space (compared by equality only).
    type State: Clone + Eq + Hash + Debug;

    /// An opaque action token.
    type Action: Clone + Copy + Eq + Hash + Debug;

    /// Returns the full, ordered action set.
    fn actions(&self) -> Vec<Self::Action>;

    /// Returns a copy of the current working state.
    fn state(&self) -> Self::State;

    /// Overwrites the working state.
    fn set_state(&mut self, state: Self::State);

    /// Samples a transition for `action` from the working state and advances it.
    ///
    /// # Errors
    /// Returns `MdpError::InvalidAction` if `action` is not in `actions()`.
    fn step<R: Rng + ?Sized>(
        &mut self,
        action: Self::Action,
        rng: &mut R,
    ) -> Result<Transition<Self::State>>;

    /// Returns true if `state` is absorbing (goal reached, episode over).
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Reward for arriving in (or sitting on) `state`.
    fn reward(&self, state: &Self::State) -> f64;

    /// Returns the environment to its canonical start state.
    fn reset(&mut self) -> Self::State;

    /// Default-policy action sampler: uniform over `actions()`.
    fn sample_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Self::Action> {
        self.actions().choose(rng).copied()
    }

    /// Fails with `MdpError::InvalidAction` unless `action` is in `actions()`.
    fn check_action(&self, action: Self::Action) -> Result<()> {
        if self.actions().contains(&action) {
            Ok(())
        } else {
            Err(MdpError::InvalidAction(format!("{:?}", action)))
        }
    }
}

/// Scoped borrow of an environment's working state.
///
/// `enter` snapshots the working state and moves the environment to a
/// scratch state. The snapshot is restored when the guard is dropped, which
/// covers early returns, `?` propagation and unwinding alike.
pub struct WorkingStateGuard<'a, E: Environment> {
    env: &'a mut E,
    saved: Option<E::State>,
}

impl<'a, E: Environment> WorkingStateGuard<'a, E> {
    /// Snapshot the working state and set it to `scratch`.
    pub fn enter(env: &'a mut E, scratch: E::State) -> Self {
        let saved = env.state();
        env.set_state(scratch);
        Self {
            env,
            saved: Some(saved),
        }
    }
}

impl<E: Environment> Deref for WorkingStateGuard<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.env
    }
}

impl<E: Environment> DerefMut for WorkingStateGuard<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.env
    }
}

impl<E: Environment> Drop for WorkingStateGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.env.set_state(saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Counter that increments or decrements; reaching 3 ends the episode.
    #[derive(Clone, Debug)]
    struct Counter {
        value: i32,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Bump {
        Up,
        Down,
        Sideways,
    }

    impl Environment for Counter {
        type State = i32;
        type Action = Bump;

        fn actions(&self) -> Vec<Bump> {
            vec![Bump::Up, Bump::Down]
        }

        fn state(&self) -> i32 {
            self.value
        }

        fn set_state(&mut self, state: i32) {
            self.value = state;
        }

        fn step<R: Rng + ?Sized>(&mut self, action: Bump, _rng: &mut R) -> Result<Transition<i32>> {
            self.check_action(action)?;
            self.value += if action == Bump::Up { 1 } else { -1 };
            Transition::new(self.value, self.reward(&self.value), self.is_terminal(&self.value))
                .validated()
        }

        fn is_terminal(&self, state: &i32) -> bool {
            *state >= 3
        }

        fn reward(&self, state: &i32) -> f64 {
            if *state >= 3 {
                1.0
            } else {
                0.0
            }
        }

        fn reset(&mut self) -> i32 {
            self.value = 0;
            self.value
        }
    }

    #[test]
    fn test_step_advances_working_state() {
        let mut env = Counter { value: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let t = env.step(Bump::Up, &mut rng).unwrap();
        assert_eq!(t.state, 1);
        assert_eq!(env.state(), 1);
        assert!(!t.done);
    }

    #[test]
    fn test_invalid_action_rejected() {
        let mut env = Counter { value: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = env.step(Bump::Sideways, &mut rng).unwrap_err();
        assert!(matches!(err, MdpError::InvalidAction(_)));
        // Working state untouched
        assert_eq!(env.state(), 0);
    }

    #[test]
    fn test_sample_action_is_legal() {
        let env = Counter { value: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..20 {
            let action = env.sample_action(&mut rng).unwrap();
            assert!(env.actions().contains(&action));
        }
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut env = Counter { value: -5 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        {
            let mut scratch = WorkingStateGuard::enter(&mut env, 2);
            assert_eq!(scratch.state(), 2);
            let t = scratch.step(Bump::Up, &mut rng).unwrap();
            assert!(t.done);
        }

        assert_eq!(env.state(), -5);
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        fn failing(env: &mut Counter) -> Result<()> {
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let mut scratch = WorkingStateGuard::enter(env, 1);
            scratch.step(Bump::Up, &mut rng)?;
            scratch.step(Bump::Sideways, &mut rng)?;
            Ok(())
        }

        let mut env = Counter { value: 0 };
        assert!(failing(&mut env).is_err());
        assert_eq!(env.state(), 0);
    }

    #[test]
    fn test_validated_rejects_nan() {
        let t = Transition::new(0, f64::NAN, false);
        assert!(matches!(
            t.validated(),
            Err(MdpError::MalformedTransition(_))
        ));
    }
}

//! Implementation of the MDP Environment trait for stochastic grid worlds.

use crate::cell::{Cell, Move};
use crate::layout::{GridLayout, Hazard, SlipModel};
use mdp_core::{Environment, Result, Transition};
use rand::Rng;

/// A rectangular grid world with slippery moves.
///
/// The agent's position is the working state. Entering the goal ends the
/// episode; hazards only hurt (and possibly send the agent back to start).
#[derive(Clone, Debug)]
pub struct GridWorld {
    layout: GridLayout,
    current: Cell,
}

impl GridWorld {
    /// Create a grid world positioned at the layout's start cell.
    ///
    /// # Errors
    /// Returns `MdpError::InvalidConfig` if the layout doesn't validate.
    pub fn new(layout: GridLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self::from_layout(layout))
    }

    fn from_layout(layout: GridLayout) -> Self {
        let current = layout.start;
        Self { layout, current }
    }

    /// 5x5 world with two obstacles, a water cell and a goal in the far corner.
    ///
    /// ```text
    /// S . . . .
    /// . . . . .
    /// . . # . .
    /// . . # . .
    /// . . W . G
    /// ```
    pub fn classic() -> Self {
        Self::from_layout(GridLayout {
            rows: 5,
            cols: 5,
            start: Cell::new(0, 0),
            goal: Cell::new(4, 4),
            obstacles: vec![Cell::new(2, 2), Cell::new(3, 2)],
            hazards: vec![Hazard {
                cell: Cell::new(4, 2),
                reward: -10.0,
                sends_to_start: false,
            }],
            goal_reward: 10.0,
            step_reward: 0.0,
            slip: SlipModel::new(0.8, 0.05, 0.05, 0.1),
        })
    }

    /// 5x5 world where a cat dodges furniture and two monsters to reach food.
    ///
    /// ```text
    /// S . . M .
    /// . . . . .
    /// . # # # .
    /// . . # . .
    /// . M . . F
    /// ```
    pub fn cat_vs_monsters() -> Self {
        let monster = |row, col| Hazard {
            cell: Cell::new(row, col),
            reward: -8.0,
            sends_to_start: false,
        };

        Self::from_layout(GridLayout {
            rows: 5,
            cols: 5,
            start: Cell::new(0, 0),
            goal: Cell::new(4, 4),
            obstacles: vec![
                Cell::new(2, 1),
                Cell::new(2, 2),
                Cell::new(2, 3),
                Cell::new(3, 2),
            ],
            hazards: vec![monster(0, 3), monster(4, 1)],
            goal_reward: 10.0,
            step_reward: -0.05,
            slip: SlipModel::new(0.70, 0.12, 0.12, 0.06),
        })
    }

    /// 4x12 cliff walk: every step costs 1, falling off the cliff costs 100
    /// and returns the agent to start. Moves are deterministic.
    ///
    /// ```text
    /// . . . . . . . . . . . .
    /// . . . . . . . . . . . .
    /// . . . . . . . . . . . .
    /// S C C C C C C C C C C G
    /// ```
    pub fn cliff_walking() -> Self {
        Self::from_layout(GridLayout {
            rows: 4,
            cols: 12,
            start: Cell::new(3, 0),
            goal: Cell::new(3, 11),
            obstacles: Vec::new(),
            hazards: (1..11)
                .map(|col| Hazard {
                    cell: Cell::new(3, col),
                    reward: -100.0,
                    sends_to_start: true,
                })
                .collect(),
            goal_reward: -1.0,
            step_reward: -1.0,
            slip: SlipModel::DETERMINISTIC,
        })
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }
}

impl Environment for GridWorld {
    type State = Cell;
    type Action = Move;

    fn actions(&self) -> Vec<Move> {
        Move::ALL.to_vec()
    }

    fn state(&self) -> Cell {
        self.current
    }

    fn set_state(&mut self, state: Cell) {
        self.current = state;
    }

    fn step<R: Rng + ?Sized>(&mut self, action: Move, rng: &mut R) -> Result<Transition<Cell>> {
        self.check_action(action)?;

        let entered = match self.layout.slip.sample(action, rng) {
            Some(mv) => self.layout.destination(self.current, mv),
            None => self.current,
        };
        let reward = self.layout.reward(entered);

        self.current = match self.layout.hazard(entered) {
            Some(hazard) if hazard.sends_to_start => self.layout.start,
            _ => entered,
        };

        Ok(Transition::new(
            self.current,
            reward,
            self.current == self.layout.goal,
        ))
    }

    fn is_terminal(&self, state: &Cell) -> bool {
        *state == self.layout.goal
    }

    fn reward(&self, state: &Cell) -> f64 {
        self.layout.reward(*state)
    }

    fn reset(&mut self) -> Cell {
        self.current = self.layout.start;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_presets_validate() {
        for world in [
            GridWorld::classic(),
            GridWorld::cat_vs_monsters(),
            GridWorld::cliff_walking(),
        ] {
            assert!(world.layout().validate().is_ok());
        }
    }

    #[test]
    fn test_reset_returns_start() {
        let mut world = GridWorld::classic();
        world.set_state(Cell::new(3, 3));
        assert_eq!(world.reset(), Cell::new(0, 0));
        assert_eq!(world.state(), Cell::new(0, 0));
    }

    #[test]
    fn test_goal_is_only_terminal() {
        let world = GridWorld::classic();
        let terminal: Vec<Cell> = world
            .layout()
            .open_cells()
            .filter(|c| world.is_terminal(c))
            .collect();
        assert_eq!(terminal, vec![Cell::new(4, 4)]);
    }

    #[test]
    fn test_step_into_goal() {
        let mut world = GridWorld::cliff_walking();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        world.set_state(Cell::new(2, 11));

        let t = world.step(Move::Down, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(3, 11));
        assert!(t.done);
    }

    #[test]
    fn test_cliff_sends_back_to_start() {
        let mut world = GridWorld::cliff_walking();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        world.reset();

        let t = world.step(Move::Right, &mut rng).unwrap();
        assert_eq!(t.reward, -100.0);
        assert_eq!(t.state, Cell::new(3, 0));
        assert!(!t.done);
    }

    #[test]
    fn test_water_penalty() {
        let mut layout = GridWorld::classic().layout().clone();
        layout.slip = SlipModel::DETERMINISTIC;
        let mut world = GridWorld::new(layout).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        world.set_state(Cell::new(4, 1));

        let t = world.step(Move::Right, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(4, 2));
        assert_eq!(t.reward, -10.0);
        assert!(!t.done);
    }

    #[test]
    fn test_obstacle_blocks_move() {
        let mut layout = GridWorld::classic().layout().clone();
        layout.slip = SlipModel::DETERMINISTIC;
        let mut world = GridWorld::new(layout).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        world.set_state(Cell::new(1, 2));

        let t = world.step(Move::Down, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(1, 2));
        assert_eq!(t.reward, 0.0);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let mut layout = GridWorld::classic().layout().clone();
        layout.start = Cell::new(2, 2);
        assert!(GridWorld::new(layout).is_err());
    }

    #[test]
    fn test_slippery_steps_stay_adjacent() {
        let mut world = GridWorld::cat_vs_monsters();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for _ in 0..500 {
            let before = world.state();
            let t = world.step(Move::Down, &mut rng).unwrap();
            let distance = before.row.abs_diff(t.state.row) + before.col.abs_diff(t.state.col);
            assert!(distance <= 1);
            assert!(world.layout().is_open(t.state));
            if t.done {
                world.reset();
            }
        }
    }
}

use crate::cell::{Cell, Move};
use mdp_core::{Environment, Result, Transition};
use rand::Rng;

/// A single row of cells with the goal at the right end.
///
/// Only `Left` and `Right` are legal; moves are deterministic and the walls
/// stop the agent. Arriving at the rightmost cell pays `goal_reward` and ends
/// the episode, every other cell pays nothing.
#[derive(Clone, Debug)]
pub struct LineWorld {
    cells: usize,
    goal_reward: f64,
    current: Cell,
}

impl LineWorld {
    /// A line of `cells` cells (at least one) starting at the left end.
    pub fn new(cells: usize, goal_reward: f64) -> Self {
        Self {
            cells: cells.max(1),
            goal_reward,
            current: Cell::new(0, 0),
        }
    }

    pub fn goal(&self) -> Cell {
        Cell::new(0, self.cells - 1)
    }

    pub fn len(&self) -> usize {
        self.cells
    }

    /// Always false; a line has at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Environment for LineWorld {
    type State = Cell;
    type Action = Move;

    fn actions(&self) -> Vec<Move> {
        vec![Move::Left, Move::Right]
    }

    fn state(&self) -> Cell {
        self.current
    }

    fn set_state(&mut self, state: Cell) {
        self.current = state;
    }

    fn step<R: Rng + ?Sized>(&mut self, action: Move, _rng: &mut R) -> Result<Transition<Cell>> {
        self.check_action(action)?;

        if let Some(next) = self.current.offset(action, 1, self.cells) {
            self.current = next;
        }

        Ok(Transition::new(
            self.current,
            self.reward(&self.current),
            self.is_terminal(&self.current),
        ))
    }

    fn is_terminal(&self, state: &Cell) -> bool {
        *state == self.goal()
    }

    fn reward(&self, state: &Cell) -> f64 {
        if self.is_terminal(state) {
            self.goal_reward
        } else {
            0.0
        }
    }

    fn reset(&mut self) -> Cell {
        self.current = Cell::new(0, 0);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdp_core::MdpError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_walk_to_goal() {
        let mut world = LineWorld::new(3, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let t = world.step(Move::Right, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(0, 1));
        assert_eq!(t.reward, 0.0);
        assert!(!t.done);

        let t = world.step(Move::Right, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(0, 2));
        assert_eq!(t.reward, 10.0);
        assert!(t.done);
    }

    #[test]
    fn test_left_wall() {
        let mut world = LineWorld::new(3, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let t = world.step(Move::Left, &mut rng).unwrap();
        assert_eq!(t.state, Cell::new(0, 0));
    }

    #[test]
    fn test_vertical_moves_are_invalid() {
        let mut world = LineWorld::new(3, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        for mv in [Move::Up, Move::Down] {
            let err = world.step(mv, &mut rng).unwrap_err();
            assert!(matches!(err, MdpError::InvalidAction(_)));
        }
        assert_eq!(world.state(), Cell::new(0, 0));
    }

    #[test]
    fn test_single_cell_line_starts_terminal() {
        let mut world = LineWorld::new(0, 1.0);
        assert_eq!(world.len(), 1);
        let start = world.reset();
        assert!(world.is_terminal(&start));
    }
}

//! Static description of a grid world: geometry, rewards and slip noise.

use crate::cell::{Cell, Move};
use mdp_core::{MdpError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tolerance for slip probability sum validation.
const SLIP_SUM_TOLERANCE: f64 = 1e-9;

/// How a commanded move is corrupted by noise.
///
/// On each step one outcome is drawn: the agent stays put, moves as
/// commanded, or veers a quarter turn to the right or left of the command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlipModel {
    pub intended: f64,
    pub veer_right: f64,
    pub veer_left: f64,
    pub stay: f64,
}

impl SlipModel {
    pub const DETERMINISTIC: SlipModel = SlipModel {
        intended: 1.0,
        veer_right: 0.0,
        veer_left: 0.0,
        stay: 0.0,
    };

    pub fn new(intended: f64, veer_right: f64, veer_left: f64, stay: f64) -> Self {
        Self {
            intended,
            veer_right,
            veer_left,
            stay,
        }
    }

    /// # Errors
    /// Returns `MdpError::InvalidConfig` if a probability is negative or the
    /// four don't sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        let probs = [self.intended, self.veer_right, self.veer_left, self.stay];
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(MdpError::InvalidConfig(format!(
                "slip probabilities {:?} must be non-negative",
                probs
            )));
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > SLIP_SUM_TOLERANCE {
            return Err(MdpError::InvalidConfig(format!(
                "slip probabilities sum to {}, not 1.0",
                sum
            )));
        }
        Ok(())
    }

    /// Draw the move actually executed for `commanded`; None means stay.
    pub fn sample<R: Rng + ?Sized>(&self, commanded: Move, rng: &mut R) -> Option<Move> {
        let p: f64 = rng.gen();

        if p < self.stay {
            None
        } else if p < self.stay + self.intended {
            Some(commanded)
        } else if p < self.stay + self.intended + self.veer_right {
            Some(commanded.veer_right())
        } else {
            Some(commanded.veer_left())
        }
    }
}

/// A cell with its own reward, optionally sending the agent back to start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub cell: Cell,
    pub reward: f64,
    pub sends_to_start: bool,
}

/// Everything that defines a grid world except the agent's position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    pub start: Cell,
    /// The only terminal cell.
    pub goal: Cell,
    /// Blocked cells; moving into one leaves the agent in place.
    pub obstacles: Vec<Cell>,
    pub hazards: Vec<Hazard>,
    pub goal_reward: f64,
    /// Reward for entering any ordinary cell.
    pub step_reward: f64,
    pub slip: SlipModel,
}

impl GridLayout {
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// In bounds and not an obstacle.
    pub fn is_open(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.is_blocked(cell)
    }

    pub fn hazard(&self, cell: Cell) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.cell == cell)
    }

    /// Where `mv` takes the agent from `cell`; walls and obstacles stop it.
    pub fn destination(&self, cell: Cell, mv: Move) -> Cell {
        match cell.offset(mv, self.rows, self.cols) {
            Some(next) if !self.is_blocked(next) => next,
            _ => cell,
        }
    }

    /// Reward for entering (or sitting on) `cell`.
    pub fn reward(&self, cell: Cell) -> f64 {
        if cell == self.goal {
            self.goal_reward
        } else if let Some(hazard) = self.hazard(cell) {
            hazard.reward
        } else {
            self.step_reward
        }
    }

    /// Every open cell in row-major order.
    pub fn open_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
            .filter(move |&cell| !self.is_blocked(cell))
    }

    /// Check geometry, rewards and the slip model.
    ///
    /// # Errors
    /// Returns `MdpError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(MdpError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.rows, self.cols
            )));
        }
        for (name, cell) in [("start", self.start), ("goal", self.goal)] {
            if !self.is_open(cell) {
                return Err(MdpError::InvalidConfig(format!(
                    "{} cell {} is outside the grid or blocked",
                    name, cell
                )));
            }
        }
        let placed = self
            .obstacles
            .iter()
            .copied()
            .chain(self.hazards.iter().map(|h| h.cell));
        for cell in placed {
            if !self.in_bounds(cell) {
                return Err(MdpError::InvalidConfig(format!(
                    "cell {} is outside the {}x{} grid",
                    cell, self.rows, self.cols
                )));
            }
        }
        let mut rewards = [self.goal_reward, self.step_reward]
            .into_iter()
            .chain(self.hazards.iter().map(|h| h.reward));
        if rewards.any(|r| !r.is_finite()) {
            return Err(MdpError::InvalidConfig(
                "rewards must be finite".to_string(),
            ));
        }
        self.slip.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_layout() -> GridLayout {
        GridLayout {
            rows: 2,
            cols: 3,
            start: Cell::new(0, 0),
            goal: Cell::new(1, 2),
            obstacles: vec![Cell::new(0, 1)],
            hazards: vec![Hazard {
                cell: Cell::new(1, 1),
                reward: -4.0,
                sends_to_start: false,
            }],
            goal_reward: 10.0,
            step_reward: -0.5,
            slip: SlipModel::DETERMINISTIC,
        }
    }

    #[test]
    fn test_destination_respects_walls_and_obstacles() {
        let layout = small_layout();
        // Obstacle to the right
        assert_eq!(layout.destination(Cell::new(0, 0), Move::Right), Cell::new(0, 0));
        // Wall above
        assert_eq!(layout.destination(Cell::new(0, 0), Move::Up), Cell::new(0, 0));
        assert_eq!(layout.destination(Cell::new(0, 0), Move::Down), Cell::new(1, 0));
    }

    #[test]
    fn test_rewards() {
        let layout = small_layout();
        assert_eq!(layout.reward(Cell::new(1, 2)), 10.0);
        assert_eq!(layout.reward(Cell::new(1, 1)), -4.0);
        assert_eq!(layout.reward(Cell::new(1, 0)), -0.5);
    }

    #[test]
    fn test_open_cells_skip_obstacles() {
        let layout = small_layout();
        let cells: Vec<Cell> = layout.open_cells().collect();
        assert_eq!(cells.len(), 5);
        assert!(!cells.contains(&Cell::new(0, 1)));
    }

    #[test]
    fn test_validate() {
        assert!(small_layout().validate().is_ok());

        let mut blocked_goal = small_layout();
        blocked_goal.goal = Cell::new(0, 1);
        assert!(blocked_goal.validate().is_err());

        let mut outside = small_layout();
        outside.hazards[0].cell = Cell::new(5, 5);
        assert!(outside.validate().is_err());

        let mut bad_slip = small_layout();
        bad_slip.slip = SlipModel::new(0.5, 0.1, 0.1, 0.1);
        assert!(bad_slip.validate().is_err());

        let mut empty = small_layout();
        empty.rows = 0;
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_deterministic_slip_always_intended() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(SlipModel::DETERMINISTIC.sample(Move::Up, &mut rng), Some(Move::Up));
        }
    }

    #[test]
    fn test_slip_frequencies() {
        let slip = SlipModel::new(0.8, 0.05, 0.05, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let mut stay = 0;
        let mut intended = 0;
        let mut right = 0;
        let mut left = 0;

        for _ in 0..n {
            match slip.sample(Move::Up, &mut rng) {
                None => stay += 1,
                Some(Move::Up) => intended += 1,
                Some(Move::Right) => right += 1,
                Some(Move::Left) => left += 1,
                Some(Move::Down) => panic!("slip never reverses a move"),
            }
        }

        let freq = |count: i32| count as f64 / n as f64;
        assert!((freq(stay) - 0.1).abs() < 0.02);
        assert!((freq(intended) - 0.8).abs() < 0.02);
        assert!((freq(right) - 0.05).abs() < 0.02);
        assert!((freq(left) - 0.05).abs() < 0.02);
    }
}

//! MDP Grid Worlds - Stochastic grid environments
//!
//! This crate implements the [`mdp_core::Environment`] trait for small
//! grid-world problems used to exercise planners:
//!
//! - [`GridWorld`] - rectangular grid with obstacles, hazards, a goal and
//!   slippery moves (presets: classic, cat vs monsters, cliff walking)
//! - [`LineWorld`] - deterministic one-row corridor with two actions

mod cell;
mod grid;
mod layout;
mod line;

pub use cell::{Cell, Move};
pub use grid::GridWorld;
pub use layout::{GridLayout, Hazard, SlipModel};
pub use line::LineWorld;

//! Discrete single-machine multi-item lot sizing.
//!
//! An instance gives, for each item type, the periods in which one unit is
//! due, a holding cost per unit and period, and the cost of switching the
//! machine between two types. [`ProblemInstance`] checks and costs candidate
//! schedules; [`resolution`] formulates the problem as a mixed integer program
//! over any [`MipBackend`] and solves it with `good_lp`.

pub mod error;
pub mod evaluate;
pub mod generate;
pub mod instance;
pub mod resolution;

pub use error::{LotSizingError, Result};
pub use instance::{ProblemInstance, Schedule};
pub use resolution::{decode_schedule, solve_instance, MipBackend, MipModel, MipSolution, Resolution};

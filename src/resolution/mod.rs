//! Resolution of lot sizing instances through a mixed integer program.

pub mod backend;
pub mod good_lp_backend;
pub mod lp_format;
pub mod model;
pub mod solve;

pub use backend::{LinearConstraint, LinearExpr, MipBackend, MipSolution, Sense};
pub use good_lp_backend::{GoodLpBackend, GoodLpSolution, GoodLpVar};
pub use lp_format::{LpFormatWriter, LpVar};
pub use model::MipModel;
pub use solve::{decode_schedule, export_lp, solve_instance, Resolution, Solve};

// Exact 0-1 branch-and-bound solver for `ConstraintModel`.

pub mod bnb;
mod bound;
pub mod limits;
pub mod result;
pub mod stats;
mod trail;

pub use bnb::BnbSolver;
pub use limits::SolverLimits;
pub use result::{SolveOutcome, SolveStatus, Solution, TerminationReason};
pub use stats::SolverStatistics;

// Lineup optimizer: an incremental constraint store, a branch-and-bound
// solver over it, and the iterative batch loop that turns solutions into
// lineups.

pub mod model;
pub mod optimizer;
pub mod solver;

pub use model::{Comparison, ConstraintId, ConstraintModel, VarId};
pub use optimizer::{optimize, LineupOptimizer, OptimizeError};
pub use solver::{BnbSolver, SolveStatus, SolverLimits};

// Counters collected during one solve.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    /// Branch decisions applied.
    pub nodes_explored: u64,
    /// Frames exhausted and popped.
    pub backtracks: u64,
    /// The deepest level reached in the tree.
    pub max_depth: u64,
    /// Branches cut because a constraint could no longer be satisfied.
    pub prunings_infeasible: u64,
    /// Branches cut because the objective bound could not beat the incumbent.
    pub prunings_bound: u64,
    /// Improving solutions found.
    pub solutions_found: u64,
    pub time_total: Duration,
}

impl SolverStatistics {
    #[inline]
    pub fn on_node_explored(&mut self) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
    }

    #[inline]
    pub fn on_backtrack(&mut self) {
        self.backtracks = self.backtracks.saturating_add(1);
    }

    #[inline]
    pub fn on_depth_update(&mut self, depth: u64) {
        self.max_depth = self.max_depth.max(depth);
    }

    #[inline]
    pub fn on_pruning_infeasible(&mut self) {
        self.prunings_infeasible = self.prunings_infeasible.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    #[inline]
    pub fn on_solution_found(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add(1);
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }
}

impl fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes={} backtracks={} depth={} pruned(infeasible)={} pruned(bound)={} solutions={} time={:.2?}",
            self.nodes_explored,
            self.backtracks,
            self.max_depth,
            self.prunings_infeasible,
            self.prunings_bound,
            self.solutions_found,
            self.time_total
        )
    }
}

// Solve status and outcome returned by the branch-and-bound solver.

use std::fmt;

use crate::model::VarId;
use crate::solver::stats::SolverStatistics;

/// How a single solve call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Best solution found and proven optimal.
    Optimal,
    /// A solution was found but the search stopped before proving optimality.
    Feasible,
    /// The search space was exhausted without a solution.
    Infeasible,
    /// The search stopped before finding any solution.
    Unknown,
}

impl SolveStatus {
    /// Optimal and feasible-but-unproven both yield a usable solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    OptimalityProven,
    InfeasibilityProven,
    Aborted(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::OptimalityProven => f.write_str("optimality proven"),
            TerminationReason::InfeasibilityProven => f.write_str("infeasibility proven"),
            TerminationReason::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// A full 0/1 assignment and its objective value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    values: Vec<bool>,
    objective: i64,
}

impl Solution {
    pub fn new(values: Vec<bool>, objective: i64) -> Self {
        Solution { values, objective }
    }

    pub fn value(&self, var: VarId) -> bool {
        self.values[var.index()]
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn objective(&self) -> i64 {
        self.objective
    }

    /// Variables set to 1, in index order.
    pub fn selected(&self) -> Vec<VarId> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| VarId::from_index(i))
            .collect()
    }
}

/// Result of the solver after termination.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    status: SolveStatus,
    solution: Option<Solution>,
    termination_reason: TerminationReason,
    statistics: SolverStatistics,
}

impl SolveOutcome {
    pub fn optimal(solution: Solution, statistics: SolverStatistics) -> Self {
        SolveOutcome {
            status: SolveStatus::Optimal,
            solution: Some(solution),
            termination_reason: TerminationReason::OptimalityProven,
            statistics,
        }
    }

    pub fn infeasible(statistics: SolverStatistics) -> Self {
        SolveOutcome {
            status: SolveStatus::Infeasible,
            solution: None,
            termination_reason: TerminationReason::InfeasibilityProven,
            statistics,
        }
    }

    pub fn aborted<R>(solution: Option<Solution>, reason: R, statistics: SolverStatistics) -> Self
    where
        R: Into<String>,
    {
        let status = if solution.is_some() {
            SolveStatus::Feasible
        } else {
            SolveStatus::Unknown
        };
        SolveOutcome {
            status,
            solution,
            termination_reason: TerminationReason::Aborted(reason.into()),
            statistics,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn into_solution(self) -> Option<Solution> {
        self.solution
    }

    pub fn termination_reason(&self) -> &TerminationReason {
        &self.termination_reason
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_with_incumbent_is_feasible() {
        let sol = Solution::new(vec![true, false, true], 7);
        let outcome = SolveOutcome::aborted(Some(sol), "node limit", SolverStatistics::default());
        assert_eq!(outcome.status(), SolveStatus::Feasible);
        assert!(outcome.status().has_solution());
        match outcome.termination_reason() {
            TerminationReason::Aborted(msg) => assert_eq!(msg, "node limit"),
            other => panic!("expected Aborted, got {other:?}"),
        }
    }

    #[test]
    fn termination_reason_reads_as_a_log_line() {
        let outcome =
            SolveOutcome::aborted(None, "time limit of 2s exceeded", SolverStatistics::default());
        assert_eq!(
            outcome.termination_reason().to_string(),
            "aborted: time limit of 2s exceeded"
        );
        let proven = SolveOutcome::infeasible(SolverStatistics::default());
        assert_eq!(proven.termination_reason().to_string(), "infeasibility proven");
    }

    #[test]
    fn aborted_without_incumbent_is_unknown() {
        let outcome = SolveOutcome::aborted(None, "time limit", SolverStatistics::default());
        assert_eq!(outcome.status(), SolveStatus::Unknown);
        assert!(!outcome.status().has_solution());
        assert!(outcome.solution().is_none());
    }

    #[test]
    fn selected_lists_true_indices() {
        let sol = Solution::new(vec![false, true, false, true], 3);
        let picked: Vec<usize> = sol.selected().into_iter().map(VarId::index).collect();
        assert_eq!(picked, vec![1, 3]);
        assert!(sol.value(VarId::from_index(1)));
    }
}

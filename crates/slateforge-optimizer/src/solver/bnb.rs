// Depth-first branch-and-bound over 0-1 decision variables.
//
// Free variables are branched in descending reduced-cost order, `1` before
// `0`. Every linear constraint keeps its current activity plus the positive
// and negative coefficient mass of its still-free variables, so feasibility
// of a partial assignment is an O(1) interval test per touched constraint.
// All mutations go through the trail and are rolled back on backtrack. Nodes
// are cut by the Lagrangian bound in `bound.rs`.

use tracing::debug;

use crate::model::{ConstraintModel, VarId};
use crate::solver::bound::LagrangianBound;
use crate::solver::limits::{LimitTracker, SolverLimits};
use crate::solver::result::{SolveOutcome, Solution};
use crate::solver::stats::SolverStatistics;
use crate::solver::trail::SearchTrail;

/// Exact solver for `ConstraintModel`. Deterministic: the same model always
/// yields the same solution, with ties going to the first optimum found.
#[derive(Debug, Clone, Default)]
pub struct BnbSolver {
    limits: SolverLimits,
}

impl BnbSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SolverLimits) -> Self {
        BnbSolver { limits }
    }

    /// Maximize the model's objective subject to all registered constraints.
    pub fn solve(&self, model: &ConstraintModel) -> SolveOutcome {
        let mut tracker = LimitTracker::start(self.limits);
        let mut session = SearchSession::new(model);
        let mut stats = SolverStatistics::default();

        let outcome = session.run(&mut tracker, &mut stats);
        stats.set_total_time(tracker.elapsed());

        let outcome = match outcome {
            SessionEnd::Exhausted => match session.best.take() {
                Some(best) => SolveOutcome::optimal(best, stats),
                None => SolveOutcome::infeasible(stats),
            },
            SessionEnd::Aborted(reason) => SolveOutcome::aborted(session.best.take(), reason, stats),
        };

        debug!(
            status = %outcome.status(),
            vars = model.num_vars(),
            constraints = model.num_constraints(),
            "solve finished: {}",
            outcome.statistics()
        );
        outcome
    }
}

/// Slack on the fractional bound before comparing it with an integer
/// objective.
const BOUND_TOLERANCE: f64 = 1e-6;

enum SessionEnd {
    Exhausted,
    Aborted(String),
}

/// A decision level: which variable in branching order, how many of its two
/// branches have been tried, and the trail length when it was opened.
#[derive(Debug, Clone, Copy)]
struct Frame {
    depth: usize,
    branches_tried: u8,
    mark: usize,
}

/// Per-solve search state derived from the model.
struct SearchSession<'m> {
    model: &'m ConstraintModel,

    bound: LagrangianBound,
    /// Free variables in branching order.
    order: Vec<VarId>,

    /// Per variable: `(linear constraint, coefficient)` occurrences.
    linear_cols: Vec<Vec<(usize, i64)>>,
    /// Per variable: implications where it is the premise.
    premise_of: Vec<Vec<usize>>,
    /// Per variable: implications where it is a consequent.
    consequent_of: Vec<Vec<usize>>,

    activity: Vec<i64>,
    free_pos: Vec<i64>,
    free_neg: Vec<i64>,

    premise_on: Vec<bool>,
    chosen: Vec<u32>,
    open: Vec<u32>,

    values: Vec<bool>,
    objective: i64,
    selected: i64,
    /// Sum of reduced costs of the variables set to one.
    picked_reduced: f64,

    trail: SearchTrail,
    best: Option<Solution>,
}

impl<'m> SearchSession<'m> {
    fn new(model: &'m ConstraintModel) -> Self {
        let n = model.num_vars();
        let linear = model.linear_constraints();
        let implications = model.implications();

        let bound = LagrangianBound::new(model);
        let order = bound.order().to_vec();

        let mut linear_cols = vec![Vec::new(); n];
        let mut free_pos = vec![0i64; linear.len()];
        let mut free_neg = vec![0i64; linear.len()];
        for (ci, constraint) in linear.iter().enumerate() {
            for term in &constraint.terms {
                if model.is_fixed_zero(term.var) {
                    continue;
                }
                linear_cols[term.var.index()].push((ci, term.coef));
                if term.coef > 0 {
                    free_pos[ci] += term.coef;
                } else {
                    free_neg[ci] += term.coef;
                }
            }
        }

        let mut premise_of = vec![Vec::new(); n];
        let mut consequent_of = vec![Vec::new(); n];
        let mut open = vec![0u32; implications.len()];
        for (ii, imp) in implications.iter().enumerate() {
            if !model.is_fixed_zero(imp.premise) {
                premise_of[imp.premise.index()].push(ii);
            }
            for &v in &imp.any_of {
                if model.is_fixed_zero(v) {
                    continue;
                }
                consequent_of[v.index()].push(ii);
                open[ii] += 1;
            }
        }

        SearchSession {
            model,
            bound,
            linear_cols,
            premise_of,
            consequent_of,
            activity: vec![0; linear.len()],
            free_pos,
            free_neg,
            premise_on: vec![false; implications.len()],
            chosen: vec![0; implications.len()],
            open,
            values: vec![false; n],
            objective: 0,
            selected: 0,
            picked_reduced: 0.0,
            trail: SearchTrail::with_capacity(order.len()),
            best: None,
            order,
        }
    }

    fn run(&mut self, tracker: &mut LimitTracker, stats: &mut SolverStatistics) -> SessionEnd {
        let constraints = self.model.linear_constraints();
        let root_ok = (0..constraints.len()).all(|ci| self.linear_reachable(ci));
        if !root_ok {
            stats.on_pruning_infeasible();
            return SessionEnd::Exhausted;
        }

        let n = self.order.len();
        if n == 0 {
            self.record_solution(stats);
            return SessionEnd::Exhausted;
        }
        if self.bound.evaluate(0, 0.0, 0, &self.activity).is_none() {
            stats.on_pruning_infeasible();
            return SessionEnd::Exhausted;
        }

        let mut frames: Vec<Frame> = Vec::with_capacity(n);
        frames.push(Frame {
            depth: 0,
            branches_tried: 0,
            mark: self.trail.len(),
        });

        while let Some(frame) = frames.last_mut() {
            if let Some(reason) = tracker.check(stats.nodes_explored) {
                return SessionEnd::Aborted(reason);
            }

            // Roll back whatever the previous branch of this frame applied.
            let mark = frame.mark;
            self.undo_to(mark);

            if frame.branches_tried >= 2 {
                frames.pop();
                stats.on_backtrack();
                continue;
            }

            let value = frame.branches_tried == 0;
            frame.branches_tried += 1;
            let depth = frame.depth;
            let var = self.order[depth];

            stats.on_node_explored();
            stats.on_depth_update(depth as u64 + 1);

            if !self.assign(var, value) {
                stats.on_pruning_infeasible();
                continue;
            }

            // Nothing left to decide, or nothing left that may be selected.
            let next = depth + 1;
            let saturated = self.bound.max_selected() == Some(self.selected);
            if next == n || saturated {
                if self.completion_holds() {
                    self.record_solution(stats);
                }
                continue;
            }

            let picked = self.picked_reduced;
            match self.bound.evaluate(next, picked, self.selected, &self.activity) {
                None => {
                    stats.on_pruning_infeasible();
                    continue;
                }
                Some(bound) if !self.can_improve(bound) => {
                    stats.on_pruning_bound();
                    continue;
                }
                Some(_) => {}
            }

            frames.push(Frame {
                depth: next,
                branches_tried: 0,
                mark: self.trail.len(),
            });
        }

        SessionEnd::Exhausted
    }

    fn can_improve(&self, bound: f64) -> bool {
        self.best
            .as_ref()
            .map_or(true, |best| (bound + BOUND_TOLERANCE).floor() > best.objective() as f64)
    }

    /// Whether leaving every undecided variable at zero satisfies the model.
    fn completion_holds(&self) -> bool {
        let linear = self.model.linear_constraints();
        let linear_ok = linear
            .iter()
            .zip(&self.activity)
            .all(|(constraint, &activity)| constraint.accepts(activity));
        linear_ok && (0..self.chosen.len()).all(|ii| !self.premise_on[ii] || self.chosen[ii] > 0)
    }

    fn record_solution(&mut self, stats: &mut SolverStatistics) {
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| self.objective > best.objective());
        if !improves {
            return;
        }
        debug_assert!(self.model.is_satisfied_by(&self.values));
        self.best = Some(Solution::new(self.values.clone(), self.objective));
        stats.on_solution_found();
    }

    fn linear_reachable(&self, ci: usize) -> bool {
        let constraint = &self.model.linear_constraints()[ci];
        let min = self.activity[ci] + self.free_neg[ci];
        let max = self.activity[ci] + self.free_pos[ci];
        constraint.reachable(min, max)
    }

    fn implication_holds(&self, ii: usize) -> bool {
        !(self.premise_on[ii] && self.chosen[ii] == 0 && self.open[ii] == 0)
    }

    /// Apply `var = value` and report whether every constraint touching `var`
    /// can still be satisfied. The assignment is fully applied either way so
    /// that undo stays symmetric.
    fn assign(&mut self, var: VarId, value: bool) -> bool {
        let i = var.index();
        self.trail.push(var, value);
        self.values[i] = value;
        if value {
            self.objective += self.model.objective_coef(var);
            self.selected += 1;
            self.picked_reduced += self.bound.reduced_cost(var);
        }

        let mut feasible = true;

        for k in 0..self.linear_cols[i].len() {
            let (ci, coef) = self.linear_cols[i][k];
            if coef > 0 {
                self.free_pos[ci] -= coef;
            } else {
                self.free_neg[ci] -= coef;
            }
            if value {
                self.activity[ci] += coef;
            }
            feasible &= self.linear_reachable(ci);
        }

        if value {
            for k in 0..self.premise_of[i].len() {
                let ii = self.premise_of[i][k];
                self.premise_on[ii] = true;
                feasible &= self.implication_holds(ii);
            }
        }

        for k in 0..self.consequent_of[i].len() {
            let ii = self.consequent_of[i][k];
            self.open[ii] -= 1;
            if value {
                self.chosen[ii] += 1;
            }
            feasible &= self.implication_holds(ii);
        }

        feasible
    }

    fn undo_to(&mut self, mark: usize) {
        while let Some(entry) = self.trail.pop_above(mark) {
            let i = entry.var.index();
            self.values[i] = false;
            if entry.value {
                self.objective -= self.model.objective_coef(entry.var);
                self.selected -= 1;
                self.picked_reduced -= self.bound.reduced_cost(entry.var);
            }

            for &(ci, coef) in &self.linear_cols[i] {
                if coef > 0 {
                    self.free_pos[ci] += coef;
                } else {
                    self.free_neg[ci] += coef;
                }
                if entry.value {
                    self.activity[ci] -= coef;
                }
            }

            if entry.value {
                for &ii in &self.premise_of[i] {
                    self.premise_on[ii] = false;
                }
            }

            for &ii in &self.consequent_of[i] {
                self.open[ii] += 1;
                if entry.value {
                    self.chosen[ii] -= 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

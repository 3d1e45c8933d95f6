// Lineup optimizer: builds the constraint model from a player pool and
// roster rules, then solves it repeatedly to emit a batch of lineups.
//
// Between solves the model only grows: each accepted lineup adds a
// no-repeat/diversity constraint, and players who hit their exposure cap are
// fixed to zero for the rest of the batch.

use std::collections::HashSet;
use std::time::Instant;

use slateforge_core::{
    DiversityPolicy, ExposureLimits, Lineup, Player, PlayerId, RosterRules, RulesError,
    StackingRule,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Comparison, ConstraintModel, VarId};
use crate::solver::{BnbSolver, SolverLimits, TerminationReason};

/// Projections are scaled to integer hundredths (truncated) for the objective.
pub const POINTS_SCALE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("player pool is empty")]
    EmptyPool,

    #[error("player id {0} appears more than once in the pool")]
    DuplicatePlayer(PlayerId),

    #[error("player {id}: {message}")]
    InvalidPlayer { id: PlayerId, message: String },

    #[error(transparent)]
    InvalidRules(#[from] RulesError),
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// One optimization session over a fixed player pool and rule set.
///
/// Stacking, exposure and diversity are optional; without them the
/// optimizer only forbids exact repeats within a batch.
#[derive(Debug, Clone)]
pub struct LineupOptimizer<'a> {
    players: &'a [Player],
    rules: &'a RosterRules,
    stacking: Option<&'a StackingRule>,
    exposure: Option<&'a ExposureLimits>,
    diversity: DiversityPolicy,
    limits: SolverLimits,
    deadline: Option<Instant>,
}

impl<'a> LineupOptimizer<'a> {
    pub fn new(players: &'a [Player], rules: &'a RosterRules) -> Self {
        LineupOptimizer {
            players,
            rules,
            stacking: None,
            exposure: None,
            diversity: DiversityPolicy::default(),
            limits: SolverLimits::unlimited(),
            deadline: None,
        }
    }

    pub fn with_stacking(mut self, stacking: &'a StackingRule) -> Self {
        self.stacking = Some(stacking);
        self
    }

    pub fn with_exposure(mut self, exposure: &'a ExposureLimits) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn with_diversity(mut self, diversity: DiversityPolicy) -> Self {
        self.diversity = diversity;
        self
    }

    /// Budget applied to every individual solve in the batch.
    pub fn with_limits(mut self, limits: SolverLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Wall-clock end of the whole batch. Each solve's time limit is clamped
    /// to what is left, and once nothing is left the batch stops with the
    /// lineups found so far.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Structural checks run before any model is built.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.players.is_empty() {
            return Err(OptimizeError::EmptyPool);
        }

        let mut seen = HashSet::with_capacity(self.players.len());
        for p in self.players {
            if !seen.insert(p.id) {
                return Err(OptimizeError::DuplicatePlayer(p.id));
            }
            if !p.projected_points.is_finite() {
                return Err(OptimizeError::InvalidPlayer {
                    id: p.id,
                    message: format!("projected_points must be finite, got {}", p.projected_points),
                });
            }
        }

        self.rules.validate()?;
        if let Some(stacking) = self.stacking {
            stacking.validate(self.rules)?;
        }
        if let Some(exposure) = self.exposure {
            exposure.validate()?;
        }
        self.diversity.validate(self.rules)?;
        Ok(())
    }

    /// Build the base model: one variable per player (pool order), salary
    /// cap, roster size, position minimums, FLEX pool size, stacking
    /// implications and the projection objective.
    pub fn build_model(&self) -> (ConstraintModel, Vec<VarId>) {
        let players = self.players;
        let rules = self.rules;

        let mut model = ConstraintModel::with_capacity(players.len());
        let vars: Vec<VarId> = players
            .iter()
            .map(|p| model.new_bool_var(format!("player_{}", p.id)))
            .collect();

        let mut unplaceable = 0usize;
        for (p, &var) in players.iter().zip(&vars) {
            if !rules.is_known_position(&p.position) {
                debug!("player {} ({}) has position `{}` outside the roster rules", p.id, p.name, p.position);
                model.fix_to_zero(var);
                unplaceable += 1;
            }
        }
        if unplaceable > 0 {
            warn!("{} players have positions no roster slot accepts; they will not be selected", unplaceable);
        }

        model.add_linear(
            players.iter().zip(&vars).map(|(p, &v)| (v, i64::from(p.salary))),
            Comparison::LessEq,
            i64::from(rules.salary_cap),
        );

        model.add_sum(vars.iter().copied(), Comparison::Equal, rules.roster_size as i64);

        // `>=` rather than `==` so FLEX can be filled by surplus players at
        // eligible positions.
        for (position, &count) in &rules.positions {
            let at_position = players
                .iter()
                .zip(&vars)
                .filter(|(p, _)| &p.position == position)
                .map(|(_, &v)| v);
            model.add_sum(at_position, Comparison::GreaterEq, count as i64);
        }

        // Pin the FLEX-eligible pool to its exact size; the per-position
        // minimums above decide how it is distributed.
        if let Some(pool_size) = rules.flex_pool_size() {
            let eligible = players
                .iter()
                .zip(&vars)
                .filter(|(p, _)| rules.is_flex_eligible(&p.position))
                .map(|(_, &v)| v);
            model.add_sum(eligible, Comparison::Equal, pool_size as i64);
        }

        if let Some(stacking) = self.stacking {
            for (p, &var) in players.iter().zip(&vars) {
                let Some(partner_positions) = stacking.partners_for(&p.position) else {
                    continue;
                };
                let partners: Vec<VarId> = players
                    .iter()
                    .zip(&vars)
                    .filter(|(q, _)| {
                        q.is_teammate_of(p) && partner_positions.iter().any(|pos| pos == &q.position)
                    })
                    .map(|(_, &v)| v)
                    .collect();
                if partners.is_empty() {
                    debug!("player {} ({}) has no stacking partner on {}", p.id, p.name, p.team);
                }
                model.add_implication(var, partners);
            }
        }

        model.maximize(
            players
                .iter()
                .zip(&vars)
                .map(|(p, &v)| (v, scaled_points(p.projected_points))),
        );

        (model, vars)
    }

    /// Produce up to `count` lineups.
    ///
    /// The batch stops early, without error, as soon as a solve ends without
    /// a solution (infeasible, or a limit hit before any incumbent) or the
    /// batch deadline passes. Compare the returned length with `count` to
    /// detect that.
    pub fn optimize(&self, count: u32) -> Result<Vec<Lineup>, OptimizeError> {
        self.validate()?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let players = self.players;
        let (mut model, vars) = self.build_model();

        let exposure_caps = self.exposure_caps(count);
        let max_overlap = self
            .rules
            .roster_size
            .saturating_sub(self.diversity.required_difference()) as i64;
        let mut usage = vec![0u32; players.len()];
        let mut lineups = Vec::new();

        info!(
            "optimizing {} lineups from {} players ({} exposure caps, min diversity {})",
            count,
            players.len(),
            exposure_caps.len(),
            self.diversity.min_diversity
        );

        for iteration in 0..count {
            for &(idx, cap) in &exposure_caps {
                if usage[idx] >= cap && model.fix_to_zero(vars[idx]) {
                    debug!(
                        "excluding player {} after {} of {} allowed appearances",
                        players[idx].id, usage[idx], cap
                    );
                }
            }

            let Some(limits) = self.solve_limits() else {
                info!("batch deadline reached after {} lineups", lineups.len());
                break;
            };

            let outcome = BnbSolver::with_limits(limits).solve(&model);
            let status = outcome.status();
            let reason = outcome.termination_reason().clone();
            debug!(iteration, %status, %reason, stats = %outcome.statistics(), "lineup solve finished");

            let solution = match outcome.into_solution() {
                Some(solution) if status.has_solution() => solution,
                _ => {
                    info!("solve loop stopped at iteration {}: {}", iteration, reason);
                    break;
                }
            };
            if let TerminationReason::Aborted(why) = &reason {
                warn!(iteration, "keeping an unproven lineup: {}", why);
            }

            let selected: Vec<usize> = (0..players.len())
                .filter(|&i| solution.value(vars[i]))
                .collect();
            for &i in &selected {
                usage[i] += 1;
            }

            model.add_sum(selected.iter().map(|&i| vars[i]), Comparison::LessEq, max_overlap);

            let lineup = Lineup::new(selected.iter().map(|&i| players[i].clone()).collect());
            debug!(
                iteration,
                salary = lineup.total_salary,
                points = lineup.total_points,
                "accepted lineup"
            );
            lineups.push(lineup);
        }

        info!("produced {} of {} requested lineups", lineups.len(), count);
        Ok(lineups)
    }

    /// Limits for the next solve, or `None` once the batch deadline has passed.
    fn solve_limits(&self) -> Option<SolverLimits> {
        let Some(deadline) = self.deadline else {
            return Some(self.limits);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return None;
        }
        let time_limit = self.limits.time_limit.map_or(remaining, |limit| limit.min(remaining));
        Some(self.limits.with_time_limit(time_limit))
    }

    /// `(pool index, max appearances)` for every limited player in the pool.
    fn exposure_caps(&self, count: u32) -> Vec<(usize, u32)> {
        let Some(exposure) = self.exposure else {
            return Vec::new();
        };

        let mut caps = Vec::new();
        for (id, _) in exposure.iter() {
            match self.players.iter().position(|p| p.id == id) {
                Some(idx) => {
                    if let Some(cap) = exposure.max_appearances(id, count) {
                        caps.push((idx, cap));
                    }
                }
                None => warn!("exposure limit for player {} ignored: not in the pool", id),
            }
        }
        caps
    }
}

fn scaled_points(points: f64) -> i64 {
    (points * POINTS_SCALE).trunc() as i64
}

/// Functional entry point: validate the inputs, then generate up to `count`
/// lineups with the given optional policies and no solver limits.
pub fn optimize(
    players: &[Player],
    rules: &RosterRules,
    stacking: Option<&StackingRule>,
    exposure: Option<&ExposureLimits>,
    diversity: Option<DiversityPolicy>,
    count: u32,
) -> Result<Vec<Lineup>, OptimizeError> {
    let mut optimizer = LineupOptimizer::new(players, rules);
    if let Some(stacking) = stacking {
        optimizer = optimizer.with_stacking(stacking);
    }
    if let Some(exposure) = exposure {
        optimizer = optimizer.with_exposure(exposure);
    }
    if let Some(diversity) = diversity {
        optimizer = optimizer.with_diversity(diversity);
    }
    optimizer.optimize(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Outcome simulator: scores lineups against independently drawn slate
// outcomes and reduces each lineup's score column to summary statistics.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slateforge_core::{player::DEFAULT_STD_DEV, Player, PlayerId};
use tracing::{debug, info};

use crate::error::SimulationError;
use crate::stats;

/// Percentile reported as a lineup's ceiling.
pub const CEILING_PERCENTILE: f64 = 95.0;
/// Percentile reported as a lineup's floor.
pub const FLOOR_PERCENTILE: f64 = 5.0;

// ---------------------------------------------------------------------------
// Config / result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub iterations: u32,
    /// Absolute score a lineup must beat for a trial to count as a win.
    pub win_threshold: f64,
    /// Spread used for players without their own `std_dev`.
    pub default_std_dev: f64,
    /// Base seed; each trial derives its own stream from it.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            iterations: 10_000,
            win_threshold: 150.0,
            default_std_dev: DEFAULT_STD_DEV,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.iterations == 0 {
            return Err(SimulationError::InvalidIterationCount(self.iterations));
        }
        if !self.win_threshold.is_finite() {
            return Err(SimulationError::InvalidDistribution {
                subject: "win_threshold".into(),
                message: format!("must be finite, got {}", self.win_threshold),
            });
        }
        if !self.default_std_dev.is_finite() || self.default_std_dev < 0.0 {
            return Err(SimulationError::InvalidDistribution {
                subject: "default_std_dev".into(),
                message: format!("must be finite and non-negative, got {}", self.default_std_dev),
            });
        }
        Ok(())
    }
}

/// Summary of one lineup's simulated scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Position of the lineup in the input batch.
    pub lineup_index: usize,
    pub avg_score: f64,
    pub ceiling: f64,
    pub floor: f64,
    pub win_prob: f64,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OutcomeSimulator {
    config: SimulationConfig,
}

impl OutcomeSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        OutcomeSimulator { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate every lineup against `config.iterations` trials.
    ///
    /// Results are index-aligned with `lineups`. All inputs are checked
    /// before any sampling happens.
    pub fn simulate<L>(
        &self,
        players: &[Player],
        lineups: &[L],
    ) -> Result<Vec<SimulationResult>, SimulationError>
    where
        L: AsRef<[Player]>,
    {
        self.config.validate()?;
        let (index, distributions) = self.player_distributions(players)?;
        let incidence = incidence_rows(&index, lineups)?;

        if incidence.is_empty() {
            return Ok(Vec::new());
        }

        let iterations = self.config.iterations as usize;
        let n_lineups = incidence.len();
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            "simulating {} lineups over {} trials ({} players)",
            n_lineups,
            iterations,
            distributions.len()
        );
        debug!(seed, "simulation seed");

        // Trial-major score surface: row t holds every lineup's score in trial t.
        let mut surface = vec![0.0f64; iterations * n_lineups];
        surface
            .par_chunks_mut(n_lineups)
            .enumerate()
            .for_each_init(
                || vec![0.0f64; distributions.len()],
                |outcomes, (trial, row)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    rng.set_stream(trial as u64);
                    for (outcome, dist) in outcomes.iter_mut().zip(&distributions) {
                        *outcome = dist.sample(&mut rng);
                    }
                    for (score, members) in row.iter_mut().zip(&incidence) {
                        *score = members.iter().map(|&col| outcomes[col]).sum();
                    }
                },
            );

        let threshold = self.config.win_threshold;
        let results = (0..n_lineups)
            .into_par_iter()
            .map(|lineup_index| {
                let mut column: Vec<f64> = surface
                    .iter()
                    .skip(lineup_index)
                    .step_by(n_lineups)
                    .copied()
                    .collect();
                let avg_score = stats::mean(&column);
                let win_prob = stats::fraction_above(&column, threshold);
                column.sort_unstable_by(f64::total_cmp);
                SimulationResult {
                    lineup_index,
                    avg_score,
                    ceiling: stats::percentile(&column, CEILING_PERCENTILE),
                    floor: stats::percentile(&column, FLOOR_PERCENTILE),
                    win_prob,
                }
            })
            .collect();

        Ok(results)
    }

    /// Dense column index per player id, plus one outcome distribution per
    /// column in pool order.
    fn player_distributions(
        &self,
        players: &[Player],
    ) -> Result<(HashMap<PlayerId, usize>, Vec<Normal<f64>>), SimulationError> {
        let mut index = HashMap::with_capacity(players.len());
        let mut distributions = Vec::with_capacity(players.len());

        for (col, p) in players.iter().enumerate() {
            if index.insert(p.id, col).is_some() {
                return Err(SimulationError::DuplicatePlayer(p.id));
            }

            let mean = p.projected_points;
            let std_dev = p.std_dev_or(self.config.default_std_dev);
            if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                return Err(SimulationError::InvalidDistribution {
                    subject: format!("player {}", p.id),
                    message: format!("mean {mean}, std_dev {std_dev}"),
                });
            }
            let normal = Normal::new(mean, std_dev).map_err(|e| {
                SimulationError::InvalidDistribution {
                    subject: format!("player {}", p.id),
                    message: e.to_string(),
                }
            })?;
            distributions.push(normal);
        }

        Ok((index, distributions))
    }
}

/// Column indices for each lineup, deduplicated so a player listed twice
/// still counts once.
fn incidence_rows<L: AsRef<[Player]>>(
    index: &HashMap<PlayerId, usize>,
    lineups: &[L],
) -> Result<Vec<Vec<usize>>, SimulationError> {
    lineups
        .iter()
        .enumerate()
        .map(|(lineup_index, lineup)| {
            let mut cols = lineup
                .as_ref()
                .iter()
                .map(|p| {
                    index.get(&p.id).copied().ok_or(SimulationError::UnknownPlayer {
                        lineup_index,
                        player_id: p.id,
                    })
                })
                .collect::<Result<Vec<usize>, _>>()?;
            cols.sort_unstable();
            cols.dedup();
            Ok(cols)
        })
        .collect()
}

/// Simulate `lineups` with `iterations` trials and otherwise default settings.
pub fn simulate<L>(
    players: &[Player],
    lineups: &[L],
    iterations: u32,
) -> Result<Vec<SimulationResult>, SimulationError>
where
    L: AsRef<[Player]>,
{
    OutcomeSimulator::new(SimulationConfig::default().with_iterations(iterations))
        .simulate(players, lineups)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<Player> {
        vec![
            Player::new(1, "A", "QB", "BUF", 8000, 20.0),
            Player::new(2, "B", "WR", "BUF", 7000, 30.0).with_std_dev(0.0),
            Player::new(3, "C", "RB", "SF", 6000, 10.0).with_std_dev(2.0),
        ]
    }

    fn seeded(iterations: u32) -> OutcomeSimulator {
        OutcomeSimulator::new(SimulationConfig::default().with_iterations(iterations).with_seed(7))
    }

    #[test]
    fn zero_spread_player_scores_exactly() {
        let players = pool();
        let lineups = vec![vec![players[1].clone()]];
        let results = seeded(500).simulate(&players, &lineups).unwrap();

        let r = &results[0];
        assert_eq!(r.avg_score, 30.0);
        assert_eq!(r.ceiling, 30.0);
        assert_eq!(r.floor, 30.0);
        assert_eq!(r.win_prob, 0.0);
    }

    #[test]
    fn duplicate_lineup_entries_count_once() {
        let players = pool();
        let twice = vec![players[1].clone(), players[1].clone()];
        let results = seeded(10).simulate(&players, &[twice]).unwrap();
        assert_eq!(results[0].avg_score, 30.0);
    }

    #[test]
    fn empty_lineup_scores_zero() {
        let players = pool();
        let lineups: Vec<Vec<Player>> = vec![Vec::new()];
        let results = seeded(10).simulate(&players, &lineups).unwrap();
        assert_eq!(results[0].avg_score, 0.0);
        assert_eq!(results[0].ceiling, 0.0);
    }

    #[test]
    fn no_lineups_is_an_empty_result() {
        let players = pool();
        let lineups: Vec<Vec<Player>> = Vec::new();
        assert!(seeded(10).simulate(&players, &lineups).unwrap().is_empty());
    }

    #[test]
    fn win_threshold_applies_to_all_lineups() {
        let players = pool();
        let lineups = vec![vec![players[1].clone()]];
        let mut config = SimulationConfig::default().with_iterations(50).with_seed(1);
        config.win_threshold = 29.0;
        let results = OutcomeSimulator::new(config).simulate(&players, &lineups).unwrap();
        assert_eq!(results[0].win_prob, 1.0);
    }

    #[test]
    fn duplicate_pool_ids_rejected() {
        let mut players = pool();
        players.push(Player::new(1, "A again", "QB", "BUF", 8000, 20.0));
        let lineups: Vec<Vec<Player>> = Vec::new();
        let err = seeded(10).simulate(&players, &lineups).unwrap_err();
        assert_eq!(err, SimulationError::DuplicatePlayer(PlayerId(1)));
    }

    #[test]
    fn negative_std_dev_rejected() {
        let mut players = pool();
        players[2].std_dev = Some(-1.0);
        let lineups = vec![vec![players[0].clone()]];
        let err = seeded(10).simulate(&players, &lineups).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDistribution { .. }));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = SimulationConfig::default();
        config.default_std_dev = f64::NAN;
        assert!(config.validate().is_err());

        let config = SimulationConfig::default().with_iterations(0);
        assert_eq!(config.validate(), Err(SimulationError::InvalidIterationCount(0)));
    }
}

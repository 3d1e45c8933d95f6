// One optimize-then-simulate run. Both stages are CPU bound, so each runs on
// the blocking pool under one wall-clock deadline for the whole run. The
// optimizer clamps every solve to that deadline and keeps the lineups it
// already has; simulation results are dropped if the deadline passes first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use slateforge_core::{Lineup, Player};
use slateforge_optimizer::{LineupOptimizer, OptimizeError};
use slateforge_sim::{OutcomeSimulator, SimulationError, SimulationResult};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::report::RunReport;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("optimization failed: {0}")]
    Optimize(#[from] OptimizeError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("{stage} did not finish within {deadline:?}")]
    DeadlineExceeded {
        stage: &'static str,
        deadline: Duration,
    },

    #[error("{stage} task failed: {source}")]
    Task {
        stage: &'static str,
        source: tokio::task::JoinError,
    },
}

/// Run `work` on the blocking pool, giving up after `deadline`.
///
/// On timeout the blocking task is detached, not cancelled; solver limits
/// are what actually bound its runtime.
pub async fn with_deadline<T, F>(
    stage: &'static str,
    deadline: Duration,
    work: F,
) -> Result<T, RunError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RunError::Task { stage, source }),
        Err(_) => {
            warn!("{} exceeded its {:?} deadline", stage, deadline);
            Err(RunError::DeadlineExceeded { stage, deadline })
        }
    }
}

/// Generate the configured batch of lineups and, if enabled, simulate them,
/// all within `run.deadline_secs` of now.
pub async fn run(config: &Config, players: Vec<Player>) -> Result<RunReport, RunError> {
    run_until(config, players, Instant::now() + config.run.deadline()).await
}

/// `run` against an explicit wall-clock deadline.
pub async fn run_until(
    config: &Config,
    players: Vec<Player>,
    deadline: Instant,
) -> Result<RunReport, RunError> {
    let players = Arc::new(players);
    let requested = config.lineups;

    let lineups: Vec<Lineup> = {
        let players = Arc::clone(&players);
        let rules = config.rules.clone();
        let stacking = config.stacking.clone();
        let exposure = config.exposure.clone();
        let diversity = config.diversity;
        let limits = config.solver.limits();
        tokio::task::spawn_blocking(move || {
            LineupOptimizer::new(&players, &rules)
                .with_stacking(&stacking)
                .with_exposure(&exposure)
                .with_diversity(diversity)
                .with_limits(limits)
                .with_deadline(deadline)
                .optimize(requested)
        })
        .await
        .map_err(|source| RunError::Task {
            stage: "optimization",
            source,
        })??
    };

    if lineups.len() < requested as usize {
        warn!(
            "only {} of {} requested lineups could be produced",
            lineups.len(),
            requested
        );
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    let simulate = config.simulation.enabled && !lineups.is_empty();
    let simulation: Option<Vec<SimulationResult>> = if !simulate {
        None
    } else if remaining.is_zero() {
        warn!("deadline passed before simulation; reporting lineups only");
        None
    } else {
        let players = Arc::clone(&players);
        let batch = lineups.clone();
        let simulator = OutcomeSimulator::new(config.simulation.to_sim_config());
        let outcome = with_deadline("simulation", remaining, move || {
            simulator.simulate(&players, &batch)
        })
        .await;
        match outcome {
            Ok(results) => Some(results?),
            Err(RunError::DeadlineExceeded { .. }) => None,
            Err(other) => return Err(other),
        }
    };

    info!(
        "run finished: {} lineups, simulation {}",
        lineups.len(),
        if simulation.is_some() { "included" } else { "skipped" }
    );

    Ok(RunReport::new(requested, lineups, simulation))
}

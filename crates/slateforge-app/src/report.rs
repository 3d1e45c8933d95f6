// JSON run report written to stdout by the binary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use slateforge_core::Lineup;
use slateforge_sim::SimulationResult;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    /// Lineups asked for.
    pub requested: u32,
    /// Lineups actually produced; below `requested` when the batch stopped early.
    pub produced: usize,
    pub lineups: Vec<Lineup>,
    /// Index-aligned with `lineups`; absent when simulation is disabled or the
    /// run deadline passed before it finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<Vec<SimulationResult>>,
}

impl RunReport {
    pub fn new(
        requested: u32,
        lineups: Vec<Lineup>,
        simulation: Option<Vec<SimulationResult>>,
    ) -> Self {
        RunReport {
            generated_at: Utc::now(),
            requested,
            produced: lineups.len(),
            lineups,
            simulation,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.produced == self.requested as usize
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// Error types for the outcome simulator.

use slateforge_core::PlayerId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("iteration count must be at least 1, got {0}")]
    InvalidIterationCount(u32),

    #[error("lineup {lineup_index} references player {player_id}, which is not in the pool")]
    UnknownPlayer { lineup_index: usize, player_id: PlayerId },

    #[error("player id {0} appears more than once in the pool")]
    DuplicatePlayer(PlayerId),

    /// A projection or spread that cannot parameterize a normal distribution.
    #[error("invalid distribution for {subject}: {message}")]
    InvalidDistribution { subject: String, message: String },
}

// Monte Carlo outcome simulation for finished lineups.

pub mod error;
pub mod simulator;
pub mod stats;

pub use error::SimulationError;
pub use simulator::{simulate, OutcomeSimulator, SimulationConfig, SimulationResult};

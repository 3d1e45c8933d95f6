// Library root: the shared data model consumed by the optimizer and the
// simulator (players, roster rules, batch policies, lineups).

pub mod lineup;
pub mod player;
pub mod rules;

pub use lineup::Lineup;
pub use player::{Player, PlayerId};
pub use rules::{DiversityPolicy, ExposureLimits, FlexSlot, RosterRules, RulesError, StackingRule};

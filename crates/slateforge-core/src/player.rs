// Scored, priced player records supplied by the projection pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome volatility assumed for a player whose record carries no `std_dev`.
pub const DEFAULT_STD_DEV: f64 = 5.0;

/// Opaque player identifier, stable across salary and projection sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        PlayerId(id)
    }
}

/// A single entry in the slate's player pool.
///
/// Immutable for the duration of one optimization or simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    /// Roster position label, e.g. "QB" or "DST". Matched case-sensitively
    /// against the active ruleset.
    pub position: String,
    pub team: String,
    pub salary: u32,
    /// Expected fantasy score.
    pub projected_points: f64,
    /// Outcome volatility. Only the simulator reads this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

impl Player {
    /// Build a player without a volatility estimate.
    pub fn new(
        id: impl Into<PlayerId>,
        name: &str,
        position: &str,
        team: &str,
        salary: u32,
        projected_points: f64,
    ) -> Self {
        Player {
            id: id.into(),
            name: name.to_string(),
            position: position.to_string(),
            team: team.to_string(),
            salary,
            projected_points,
            std_dev: None,
        }
    }

    /// Builder-style setter for the outcome volatility.
    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = Some(std_dev);
        self
    }

    /// Volatility to simulate with, falling back to `default` when unset.
    pub fn std_dev_or(&self, default: f64) -> f64 {
        self.std_dev.unwrap_or(default)
    }

    /// Whether `other` plays for the same team and is a different player.
    pub fn is_teammate_of(&self, other: &Player) -> bool {
        self.id != other.id && self.team == other.team
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_falls_back_to_default() {
        let p = Player::new(1, "Josh Allen", "QB", "BUF", 8000, 25.0);
        assert!((p.std_dev_or(DEFAULT_STD_DEV) - 5.0).abs() < f64::EPSILON);

        let p = p.with_std_dev(7.5);
        assert!((p.std_dev_or(DEFAULT_STD_DEV) - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn teammate_requires_same_team_and_distinct_id() {
        let allen = Player::new(1, "Josh Allen", "QB", "BUF", 8000, 25.0);
        let diggs = Player::new(2, "Stefon Diggs", "WR", "BUF", 7000, 20.0);
        let kelce = Player::new(12, "Travis Kelce", "TE", "KC", 6500, 16.0);

        assert!(allen.is_teammate_of(&diggs));
        assert!(!allen.is_teammate_of(&kelce));
        assert!(!allen.is_teammate_of(&allen.clone()));
    }

    #[test]
    fn player_id_deserializes_from_bare_integer() {
        let text = r#"
id = 7
position = "RB"
team = "SF"
salary = 9000
projected_points = 28.0
"#;
        let p: Player = toml::from_str(text).unwrap();
        assert_eq!(p.id, PlayerId(7));
        assert!(p.name.is_empty());
        assert!(p.std_dev.is_none());
    }
}

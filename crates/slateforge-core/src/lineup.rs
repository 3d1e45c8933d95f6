// A finished lineup and its derived totals.

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId};

/// A constraint-satisfying selection of players for one contest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub players: Vec<Player>,
    pub total_salary: u32,
    pub total_points: f64,
}

impl Lineup {
    /// Build a lineup, deriving the salary and projection totals.
    pub fn new(players: Vec<Player>) -> Self {
        let total_salary = players.iter().map(|p| p.salary).sum();
        let total_points = players.iter().map(|p| p.projected_points).sum();
        Lineup {
            players,
            total_salary,
            total_points,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    /// Number of players at exactly `position`.
    pub fn count_at(&self, position: &str) -> usize {
        self.players.iter().filter(|p| p.position == position).count()
    }

    /// Number of players shared with `other`.
    pub fn overlap(&self, other: &Lineup) -> usize {
        self.player_ids().filter(|&id| other.contains(id)).count()
    }
}

impl AsRef<[Player]> for Lineup {
    fn as_ref(&self) -> &[Player] {
        &self.players
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lineup {
        Lineup::new(vec![
            Player::new(1, "Josh Allen", "QB", "BUF", 8000, 25.0),
            Player::new(21, "CMC", "RB", "SF", 9000, 28.0),
            Player::new(20, "Tyreek Hill", "WR", "MIA", 7500, 22.0),
            Player::new(12, "Travis Kelce", "TE", "KC", 6500, 16.0),
        ])
    }

    #[test]
    fn totals_are_simple_sums() {
        let lineup = sample();
        assert_eq!(lineup.len(), 4);
        assert_eq!(lineup.total_salary, 31_000);
        assert!((lineup.total_points - 91.0).abs() < 1e-9);
    }

    #[test]
    fn overlap_counts_shared_players() {
        let a = sample();
        let mut players = a.players.clone();
        players[3] = Player::new(3, "Dalton Kincaid", "TE", "BUF", 5000, 12.0);
        let b = Lineup::new(players);

        assert_eq!(a.overlap(&b), 3);
        assert_eq!(a.overlap(&a), 4);
        assert_eq!(b.count_at("TE"), 1);
        assert!(b.contains(PlayerId(3)));
        assert!(!a.contains(PlayerId(3)));
    }
}

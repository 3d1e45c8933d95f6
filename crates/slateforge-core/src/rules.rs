// Contest rules and batch policies: roster layout, FLEX slot, stacking,
// exposure caps and inter-lineup diversity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::PlayerId;

/// Label reserved for the synthetic FLEX slot.
pub const FLEX: &str = "FLEX";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("invalid rules: `{field}` {message}")]
    InvalidRules { field: String, message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> RulesError {
    RulesError::InvalidRules {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Roster rules
// ---------------------------------------------------------------------------

/// A FLEX slot fillable by any player from `eligible` positions.
///
/// The count adds to, rather than replaces, the individual minimums of the
/// eligible positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlexSlot {
    pub count: usize,
    pub eligible: Vec<String>,
}

/// Roster layout for one contest format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterRules {
    /// Maximum total salary across a lineup.
    pub salary_cap: u32,
    /// Exact number of players per lineup.
    pub roster_size: usize,
    /// Minimum count per concrete position. Never contains `FLEX`.
    pub positions: BTreeMap<String, usize>,
    #[serde(default)]
    pub flex: Option<FlexSlot>,
}

impl RosterRules {
    /// DraftKings NFL classic layout: QB, 2 RB, 3 WR, TE, DST and one
    /// RB/WR/TE FLEX, nine players total.
    pub fn draftkings_nfl_classic(salary_cap: u32) -> Self {
        let positions = [("QB", 1), ("RB", 2), ("WR", 3), ("TE", 1), ("DST", 1)]
            .into_iter()
            .map(|(pos, count)| (pos.to_string(), count))
            .collect();
        RosterRules {
            salary_cap,
            roster_size: 9,
            positions,
            flex: Some(FlexSlot {
                count: 1,
                eligible: vec!["RB".into(), "WR".into(), "TE".into()],
            }),
        }
    }

    /// Required minimum at `position`, zero for positions the rules don't name.
    pub fn requirement(&self, position: &str) -> usize {
        self.positions.get(position).copied().unwrap_or(0)
    }

    /// Whether any roster slot can be filled by a player at `position`.
    pub fn is_known_position(&self, position: &str) -> bool {
        self.positions.contains_key(position) || self.is_flex_eligible(position)
    }

    /// Whether a player at `position` belongs to the FLEX pool.
    pub fn is_flex_eligible(&self, position: &str) -> bool {
        self.flex
            .as_ref()
            .is_some_and(|flex| flex.eligible.iter().any(|p| p == position))
    }

    /// Exact number of FLEX-eligible players a lineup must hold: the
    /// eligible positions' minimums plus the FLEX count.
    pub fn flex_pool_size(&self) -> Option<usize> {
        self.flex.as_ref().map(|flex| {
            let base: usize = flex.eligible.iter().map(|p| self.requirement(p)).sum();
            base + flex.count
        })
    }

    /// Reject malformed rules before any model is built.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.salary_cap == 0 {
            return Err(invalid("salary_cap", "must be greater than 0"));
        }
        if self.roster_size == 0 {
            return Err(invalid("roster_size", "must be greater than 0"));
        }
        if self.positions.is_empty() {
            return Err(invalid("positions", "must name at least one position"));
        }
        if self.positions.contains_key(FLEX) {
            return Err(invalid(
                "positions.FLEX",
                "FLEX is configured through the `flex` slot, not as a position",
            ));
        }

        let mut required: usize = self.positions.values().sum();

        if let Some(flex) = &self.flex {
            if flex.count == 0 {
                return Err(invalid("flex.count", "must be greater than 0"));
            }
            if flex.eligible.is_empty() {
                return Err(invalid("flex.eligible", "must list at least one position"));
            }
            for pos in &flex.eligible {
                if !self.positions.contains_key(pos) {
                    return Err(invalid(
                        "flex.eligible",
                        format!("references position `{pos}` absent from positions"),
                    ));
                }
            }
            required += flex.count;
        }

        if required > self.roster_size {
            return Err(invalid(
                "roster_size",
                format!(
                    "position minimums require {required} players but roster_size is {}",
                    self.roster_size
                ),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stacking
// ---------------------------------------------------------------------------

/// Primary position -> partner positions.
///
/// Whenever a player at a primary position is selected, at least one
/// teammate at a partner position must be selected too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackingRule {
    pairs: BTreeMap<String, Vec<String>>,
}

impl StackingRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the partner list for `primary`.
    pub fn with_stack(mut self, primary: &str, partners: &[&str]) -> Self {
        self.pairs.insert(
            primary.to_string(),
            partners.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate `(primary, partners)` in position-label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn partners_for(&self, primary: &str) -> Option<&[String]> {
        self.pairs.get(primary).map(Vec::as_slice)
    }

    /// Every primary and partner position must be fillable under `rules`.
    pub fn validate(&self, rules: &RosterRules) -> Result<(), RulesError> {
        for (primary, partners) in &self.pairs {
            if !rules.is_known_position(primary) {
                return Err(invalid(
                    format!("stacking.{primary}"),
                    "primary position is not part of the roster rules",
                ));
            }
            if partners.is_empty() {
                return Err(invalid(
                    format!("stacking.{primary}"),
                    "must list at least one partner position",
                ));
            }
            if let Some(unknown) = partners.iter().find(|p| !rules.is_known_position(p)) {
                return Err(invalid(
                    format!("stacking.{primary}"),
                    format!("partner position `{unknown}` is not part of the roster rules"),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Exposure
// ---------------------------------------------------------------------------

/// Per-player cap on the fraction of a batch a player may appear in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExposureLimits {
    limits: BTreeMap<PlayerId, f64>,
}

impl ExposureLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, id: impl Into<PlayerId>, max_fraction: f64) -> Self {
        self.limits.insert(id.into(), max_fraction);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> Option<f64> {
        self.limits.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, f64)> + '_ {
        self.limits.iter().map(|(&id, &frac)| (id, frac))
    }

    /// Most lineups `id` may appear in when `requested` lineups are asked for:
    /// `floor(max_fraction * requested)`. The denominator is always the
    /// requested batch size, even if the batch ends early.
    pub fn max_appearances(&self, id: PlayerId, requested: u32) -> Option<u32> {
        self.get(id).map(|frac| cap_for(frac, requested))
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        for (id, frac) in &self.limits {
            if !frac.is_finite() || !(0.0..=1.0).contains(frac) {
                return Err(invalid(
                    format!("exposure.{id}"),
                    format!("must be between 0.0 and 1.0 inclusive, got {frac}"),
                ));
            }
        }
        Ok(())
    }
}

/// Products like `0.7 * 10` land a hair above or below the integer; nudge
/// before flooring so exact multiples keep their full allowance.
fn cap_for(frac: f64, requested: u32) -> u32 {
    const ROUNDING_SLACK: f64 = 1e-9;
    (frac * requested as f64 + ROUNDING_SLACK).floor() as u32
}

// ---------------------------------------------------------------------------
// Diversity
// ---------------------------------------------------------------------------

/// Minimum number of roster slots any two lineups of a batch must differ in.
/// Zero forbids only exact duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiversityPolicy {
    #[serde(default)]
    pub min_diversity: usize,
}

impl DiversityPolicy {
    pub fn new(min_diversity: usize) -> Self {
        DiversityPolicy { min_diversity }
    }

    /// Slots that must change between lineups; at least one so that exact
    /// repeats are always forbidden.
    pub fn required_difference(&self) -> usize {
        self.min_diversity.max(1)
    }

    pub fn validate(&self, rules: &RosterRules) -> Result<(), RulesError> {
        if self.min_diversity > rules.roster_size {
            return Err(invalid(
                "diversity.min_diversity",
                format!(
                    "must not exceed roster_size ({}), got {}",
                    rules.roster_size, self.min_diversity
                ),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Undo log for branch decisions.

use crate::model::VarId;

/// One applied assignment, enough to reverse it on backtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrailEntry {
    pub(crate) var: VarId,
    pub(crate) value: bool,
}

/// Linear history of assignments. A search frame remembers the trail length
/// when it was opened and rolls back to it before trying its next branch.
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchTrail {
    entries: Vec<TrailEntry>,
}

impl SearchTrail {
    pub(crate) fn with_capacity(depth: usize) -> Self {
        SearchTrail {
            entries: Vec::with_capacity(depth),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn push(&mut self, var: VarId, value: bool) {
        self.entries.push(TrailEntry { var, value });
    }

    /// Pop the newest entry if the trail is longer than `mark`.
    #[inline]
    pub(crate) fn pop_above(&mut self, mark: usize) -> Option<TrailEntry> {
        if self.entries.len() > mark {
            self.entries.pop()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_above_stops_at_mark() {
        let mut trail = SearchTrail::with_capacity(4);
        trail.push(VarId::from_index(0), true);
        let mark = trail.len();
        trail.push(VarId::from_index(1), false);
        trail.push(VarId::from_index(2), true);

        let popped: Vec<usize> = std::iter::from_fn(|| trail.pop_above(mark))
            .map(|e| e.var.index())
            .collect();
        assert_eq!(popped, vec![2, 1]);
        assert_eq!(trail.len(), 1);
        assert!(trail.pop_above(mark).is_none());
    }
}

// Constraint store for one optimization session.
//
// Holds one boolean decision variable per candidate, the registered linear
// and implication constraints, and the objective. Constraints are keyed by
// insertion index and never removed; the store only ever grows.

use std::fmt;

/// Dense index of a boolean decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        VarId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Insertion index of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintId {
    Linear(usize),
    Implication(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessEq,
    GreaterEq,
    Equal,
}

/// One `coef * var` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    pub var: VarId,
    pub coef: i64,
}

/// `sum(terms) <cmp> rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub terms: Vec<Term>,
    pub cmp: Comparison,
    pub rhs: i64,
}

impl LinearConstraint {
    /// Whether an activity value satisfies the comparison.
    pub fn accepts(&self, activity: i64) -> bool {
        match self.cmp {
            Comparison::LessEq => activity <= self.rhs,
            Comparison::GreaterEq => activity >= self.rhs,
            Comparison::Equal => activity == self.rhs,
        }
    }

    /// Whether some activity in `[min, max]` can still satisfy the comparison.
    pub fn reachable(&self, min: i64, max: i64) -> bool {
        match self.cmp {
            Comparison::LessEq => min <= self.rhs,
            Comparison::GreaterEq => max >= self.rhs,
            Comparison::Equal => min <= self.rhs && max >= self.rhs,
        }
    }
}

/// `premise == 1 => at least one of any_of == 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implication {
    pub premise: VarId,
    pub any_of: Vec<VarId>,
}

/// Variables, constraints and objective for exactly one batch.
#[derive(Debug, Clone, Default)]
pub struct ConstraintModel {
    names: Vec<String>,
    fixed_zero: Vec<bool>,
    linear: Vec<LinearConstraint>,
    implications: Vec<Implication>,
    objective: Vec<i64>,
}

impl ConstraintModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model with capacity reserved for `num_vars` variables.
    pub fn with_capacity(num_vars: usize) -> Self {
        ConstraintModel {
            names: Vec::with_capacity(num_vars),
            fixed_zero: Vec::with_capacity(num_vars),
            linear: Vec::new(),
            implications: Vec::new(),
            objective: Vec::with_capacity(num_vars),
        }
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        let id = VarId(self.names.len());
        self.names.push(name.into());
        self.fixed_zero.push(false);
        self.objective.push(0);
        id
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.linear.len() + self.implications.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var.0]
    }

    /// Register `sum(coef * var) <cmp> rhs`.
    pub fn add_linear<I>(&mut self, terms: I, cmp: Comparison, rhs: i64) -> ConstraintId
    where
        I: IntoIterator<Item = (VarId, i64)>,
    {
        let terms = terms
            .into_iter()
            .map(|(var, coef)| Term { var, coef })
            .collect();
        let id = ConstraintId::Linear(self.linear.len());
        self.linear.push(LinearConstraint { terms, cmp, rhs });
        id
    }

    /// Register `sum(vars) <cmp> rhs` with unit coefficients.
    pub fn add_sum<I>(&mut self, vars: I, cmp: Comparison, rhs: i64) -> ConstraintId
    where
        I: IntoIterator<Item = VarId>,
    {
        self.add_linear(vars.into_iter().map(|v| (v, 1)), cmp, rhs)
    }

    /// Register `premise => any_of`. An empty `any_of` forbids the premise.
    pub fn add_implication(&mut self, premise: VarId, any_of: Vec<VarId>) -> ConstraintId {
        let id = ConstraintId::Implication(self.implications.len());
        self.implications.push(Implication { premise, any_of });
        id
    }

    /// Force `var` to 0 for every later solve. Returns `false` if it already was.
    pub fn fix_to_zero(&mut self, var: VarId) -> bool {
        !std::mem::replace(&mut self.fixed_zero[var.0], true)
    }

    pub fn is_fixed_zero(&self, var: VarId) -> bool {
        self.fixed_zero[var.0]
    }

    /// Replace the objective with `maximize sum(coef * var)`.
    pub fn maximize<I>(&mut self, terms: I)
    where
        I: IntoIterator<Item = (VarId, i64)>,
    {
        self.objective.iter_mut().for_each(|c| *c = 0);
        for (var, coef) in terms {
            self.objective[var.0] += coef;
        }
    }

    pub fn objective_coef(&self, var: VarId) -> i64 {
        self.objective[var.0]
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear
    }

    pub fn implications(&self) -> &[Implication] {
        &self.implications
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> {
        (0..self.names.len()).map(VarId)
    }

    /// Objective value of a full assignment.
    pub fn evaluate(&self, values: &[bool]) -> i64 {
        self.objective
            .iter()
            .zip(values)
            .filter(|(_, selected)| **selected)
            .map(|(coef, _)| *coef)
            .sum()
    }

    /// Check a full assignment against every registered constraint.
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        if values.len() != self.num_vars() {
            return false;
        }
        let fixed_ok = self
            .fixed_zero
            .iter()
            .zip(values)
            .all(|(&fixed, &v)| !(fixed && v));
        let linear_ok = self.linear.iter().all(|c| {
            let activity: i64 = c
                .terms
                .iter()
                .filter(|t| values[t.var.0])
                .map(|t| t.coef)
                .sum();
            c.accepts(activity)
        });
        let implications_ok = self
            .implications
            .iter()
            .all(|imp| !values[imp.premise.0] || imp.any_of.iter().any(|v| values[v.0]));
        fixed_ok && linear_ok && implications_ok
    }
}

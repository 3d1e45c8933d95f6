// Objective upper bound for the branch-and-bound search.
//
// Unit-coefficient constraints whose free members form a nested family
// (every pair disjoint or one inside the other) are kept exact: the bound
// solves them with a max-plus dynamic program over the family, children
// before parents. Every other linear constraint, and every implication
// written as `sum(any_of) - premise >= 0`, is moved into the objective with
// a Lagrange multiplier fitted once per solve by projected subgradient
// descent. The reduced costs this produces also fix the branching order.

use crate::model::{Comparison, ConstraintModel, Term, VarId};

const FIT_ITERATIONS: usize = 100;
const FIT_STALL_LIMIT: usize = 5;
const FIT_STEP_FRACTION: f64 = 0.02;

/// One member of the nested family.
#[derive(Debug, Clone)]
struct NestedSet {
    /// Free members, ascending by index.
    members: Vec<usize>,
    lo: Option<i64>,
    hi: Option<i64>,
    /// Linear constraint whose activity counts this set's selections;
    /// `None` for the synthetic root holding every free variable.
    counter: Option<usize>,
    children: Vec<usize>,
    /// Positions in branching order of the variables this set owns directly.
    own: Vec<usize>,
    /// `own_prefix[i]` = sum of reduced costs of `own[..i]`.
    own_prefix: Vec<f64>,
}

/// A relaxed row, scaled so its largest coefficient magnitude is one.
#[derive(Debug, Clone)]
struct RelaxedRow {
    terms: Vec<(usize, f64)>,
    cmp: Comparison,
    rhs: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct LagrangianBound {
    /// Nested family sorted by size, the synthetic root last.
    sets: Vec<NestedSet>,
    /// Upper bound on selected variables, when a unit-coefficient `<=`/`==`
    /// constraint spans every free variable.
    max_selected: Option<i64>,
    reduced: Vec<f64>,
    constant: f64,
    order: Vec<VarId>,
    /// `positive_prefix[i]` = sum of positive reduced costs of `order[..i]`.
    positive_prefix: Vec<f64>,
    tables: Vec<Vec<f64>>,
    scratch: Vec<f64>,
}

impl LagrangianBound {
    pub(crate) fn new(model: &ConstraintModel) -> Self {
        let free: Vec<usize> = model
            .vars()
            .filter(|&v| !model.is_fixed_zero(v))
            .map(VarId::index)
            .collect();
        let mut is_free = vec![false; model.num_vars()];
        for &i in &free {
            is_free[i] = true;
        }

        let max_selected = cardinality_bound(model, &is_free, free.len());
        let (sets, owner, relaxed) = nest(model, &is_free, &free, max_selected.is_some());
        let rows = relaxed_rows(model, &relaxed);

        let mut bound = LagrangianBound {
            sets,
            max_selected,
            reduced: Vec::new(),
            constant: 0.0,
            order: Vec::new(),
            positive_prefix: Vec::new(),
            tables: Vec::new(),
            scratch: Vec::new(),
        };
        bound.tables = vec![Vec::new(); bound.sets.len()];

        let multipliers = bound.fit_multipliers(model, &rows, &free, &owner);
        bound.apply(model, &rows, &multipliers, &free, &owner);
        bound
    }

    /// Free variables in branching order: reduced cost descending, then index.
    pub(crate) fn order(&self) -> &[VarId] {
        &self.order
    }

    pub(crate) fn max_selected(&self) -> Option<i64> {
        self.max_selected
    }

    pub(crate) fn reduced_cost(&self, var: VarId) -> f64 {
        self.reduced[var.index()]
    }

    /// Best objective any completion of the current partial assignment could
    /// reach, with `order[next..]` still free. `picked_reduced` is the sum of
    /// reduced costs of the variables already set to one and `activity` the
    /// current activity of every linear constraint. `None` means no
    /// completion satisfies the nested family.
    pub(crate) fn evaluate(
        &mut self,
        next: usize,
        picked_reduced: f64,
        selected: i64,
        activity: &[i64],
    ) -> Option<f64> {
        let base = self.constant + picked_reduced;
        let Some(max_selected) = self.max_selected else {
            let tail = self.positive_prefix[self.order.len()] - self.positive_prefix[next];
            return Some(base + tail);
        };
        let cap = usize::try_from(max_selected - selected).ok()?;

        for i in 0..self.sets.len() {
            let set = &self.sets[i];
            let start = set.own.partition_point(|&pos| pos < next);
            let available = (set.own.len() - start).min(cap);

            let mut table = std::mem::take(&mut self.tables[i]);
            table.clear();
            let offset = set.own_prefix[start];
            table.extend(set.own_prefix[start..=start + available].iter().map(|x| x - offset));
            table.resize(cap + 1, f64::NEG_INFINITY);

            for &child in &set.children {
                max_plus(&table, &self.tables[child], cap, &mut self.scratch);
                std::mem::swap(&mut table, &mut self.scratch);
            }

            let chosen = set.counter.map_or(selected, |ci| activity[ci]);
            clamp(&mut table, set.lo.map(|lo| lo - chosen), set.hi.map(|hi| hi - chosen));
            self.tables[i] = table;
        }

        let best = self
            .tables
            .last()
            .and_then(|root| root.iter().copied().reduce(f64::max))
            .unwrap_or(f64::NEG_INFINITY);
        (best > f64::NEG_INFINITY).then_some(base + best)
    }

    /// Projected subgradient descent on the Lagrangian dual. Keeps the
    /// multipliers of the lowest bound seen.
    fn fit_multipliers(
        &self,
        model: &ConstraintModel,
        rows: &[RelaxedRow],
        free: &[usize],
        owner: &[usize],
    ) -> Vec<f64> {
        let mut multipliers = vec![0.0; rows.len()];
        if rows.is_empty() {
            return multipliers;
        }

        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut theta = 1.0;
        let mut stall = 0;
        let mut selected = vec![false; model.num_vars()];

        for _ in 0..FIT_ITERATIONS {
            let reduced = reduced_costs(model, rows, &multipliers);
            let Some((value, picks)) = self.relaxation(&reduced, free, owner) else {
                return vec![0.0; rows.len()];
            };
            let dual = value + dual_constant(rows, &multipliers);

            match &best {
                Some((lowest, _)) if dual >= *lowest - 1e-9 => {
                    stall += 1;
                    if stall >= FIT_STALL_LIMIT {
                        theta /= 2.0;
                        stall = 0;
                    }
                }
                _ => {
                    best = Some((dual, multipliers.clone()));
                    stall = 0;
                }
            }

            selected.iter_mut().for_each(|s| *s = false);
            for &i in &picks {
                selected[i] = true;
            }

            let mut gradient: Vec<f64> = rows
                .iter()
                .map(|row| {
                    let activity: f64 = row
                        .terms
                        .iter()
                        .filter(|(i, _)| selected[*i])
                        .map(|(_, coef)| coef)
                        .sum();
                    row.rhs - activity
                })
                .collect();
            for ((g, row), mu) in gradient.iter_mut().zip(rows).zip(&multipliers) {
                let stuck = match row.cmp {
                    Comparison::LessEq => *mu <= 0.0 && *g > 0.0,
                    Comparison::GreaterEq => *mu >= 0.0 && *g < 0.0,
                    Comparison::Equal => false,
                };
                if stuck {
                    *g = 0.0;
                }
            }

            let norm: f64 = gradient.iter().map(|g| g * g).sum();
            if norm == 0.0 {
                break;
            }
            let lowest = best.as_ref().map_or(dual, |(lowest, _)| *lowest);
            let step = theta * lowest.abs().max(1.0) * FIT_STEP_FRACTION / norm;

            for ((mu, g), row) in multipliers.iter_mut().zip(&gradient).zip(rows) {
                let moved = *mu - step * g;
                *mu = match row.cmp {
                    Comparison::LessEq => moved.max(0.0),
                    Comparison::GreaterEq => moved.min(0.0),
                    Comparison::Equal => moved,
                };
            }
        }

        best.map_or(multipliers, |(_, mu)| mu)
    }

    /// Maximize the reduced objective over the nested family alone. Returns
    /// the optimum and the variables it selects.
    fn relaxation(
        &self,
        reduced: &[f64],
        free: &[usize],
        owner: &[usize],
    ) -> Option<(f64, Vec<usize>)> {
        let Some(max_selected) = self.max_selected else {
            let picks: Vec<usize> = free.iter().copied().filter(|&i| reduced[i] > 0.0).collect();
            let value: f64 = picks.iter().map(|&i| reduced[i]).sum();
            return Some((value, picks));
        };
        let cap = usize::try_from(max_selected).ok()?;

        let mut groups = vec![Vec::new(); self.sets.len()];
        for &i in free {
            groups[owner[i]].push(i);
        }
        for group in &mut groups {
            group.sort_by(|&a, &b| reduced[b].total_cmp(&reduced[a]).then(a.cmp(&b)));
        }

        // stages[s][k] is set s's table after merging its first k children
        let mut stages: Vec<Vec<Vec<f64>>> = Vec::with_capacity(self.sets.len());
        let mut finals: Vec<Vec<f64>> = Vec::with_capacity(self.sets.len());
        for (s, set) in self.sets.iter().enumerate() {
            let mut table = vec![0.0];
            for &i in groups[s].iter().take(cap) {
                let last = table[table.len() - 1];
                table.push(last + reduced[i]);
            }
            table.resize(cap + 1, f64::NEG_INFINITY);

            let mut history = vec![table.clone()];
            for &child in &set.children {
                let mut merged = Vec::new();
                max_plus(&table, &finals[child], cap, &mut merged);
                table = merged;
                history.push(table.clone());
            }
            clamp(&mut table, set.lo, set.hi);
            stages.push(history);
            finals.push(table);
        }

        let root = self.sets.len() - 1;
        let (count, value) = finals[root]
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (t, x)| if x > acc.1 { (t, x) } else { acc });
        if value == f64::NEG_INFINITY {
            return None;
        }

        let mut picks = Vec::new();
        self.recover(root, count, &stages, &finals, &groups, &mut picks);
        Some((value, picks))
    }

    fn recover(
        &self,
        set: usize,
        mut count: usize,
        stages: &[Vec<Vec<f64>>],
        finals: &[Vec<f64>],
        groups: &[Vec<usize>],
        picks: &mut Vec<usize>,
    ) {
        let history = &stages[set];
        let children = &self.sets[set].children;
        for k in (0..children.len()).rev() {
            let child = children[k];
            let target = history[k + 1][count];
            let before = &history[k];
            let split = (0..=count).find(|&c| {
                let (x, y) = (before[count - c], finals[child][c]);
                x > f64::NEG_INFINITY
                    && y > f64::NEG_INFINITY
                    && (x + y - target).abs() <= 1e-9 * target.abs().max(1.0)
            });
            if let Some(c) = split {
                self.recover(child, c, stages, finals, groups, picks);
                count -= c;
            }
        }
        picks.extend(groups[set].iter().take(count).copied());
    }

    /// Fix reduced costs, branching order and per-set prefix sums for the
    /// chosen multipliers.
    fn apply(
        &mut self,
        model: &ConstraintModel,
        rows: &[RelaxedRow],
        multipliers: &[f64],
        free: &[usize],
        owner: &[usize],
    ) {
        self.reduced = reduced_costs(model, rows, multipliers);
        self.constant = dual_constant(rows, multipliers);

        let reduced = &self.reduced;
        let mut order: Vec<usize> = free.to_vec();
        order.sort_by(|&a, &b| reduced[b].total_cmp(&reduced[a]).then(a.cmp(&b)));

        for set in &mut self.sets {
            set.own.clear();
        }
        self.positive_prefix = Vec::with_capacity(order.len() + 1);
        self.positive_prefix.push(0.0);
        for (pos, &i) in order.iter().enumerate() {
            self.sets[owner[i]].own.push(pos);
            let last = self.positive_prefix[pos];
            self.positive_prefix.push(last + reduced[i].max(0.0));
        }
        for set in &mut self.sets {
            let mut prefix = Vec::with_capacity(set.own.len() + 1);
            prefix.push(0.0);
            for &pos in &set.own {
                let last = prefix[prefix.len() - 1];
                prefix.push(last + reduced[order[pos]]);
            }
            set.own_prefix = prefix;
        }

        self.order = order.into_iter().map(VarId::from_index).collect();
    }
}

fn is_unit(terms: &[Term], num_vars: usize) -> bool {
    let mut seen = vec![false; num_vars];
    terms.iter().all(|t| {
        let fresh = !seen[t.var.index()];
        seen[t.var.index()] = true;
        t.coef == 1 && fresh
    })
}

/// Smallest right-hand side among `sum(x) <= k` / `sum(x) == k`
/// constraints whose unit terms cover every free variable exactly once.
fn cardinality_bound(model: &ConstraintModel, is_free: &[bool], num_free: usize) -> Option<i64> {
    model
        .linear_constraints()
        .iter()
        .filter(|c| matches!(c.cmp, Comparison::LessEq | Comparison::Equal))
        .filter(|c| is_unit(&c.terms, model.num_vars()))
        .filter(|c| c.terms.iter().filter(|t| is_free[t.var.index()]).count() == num_free)
        .map(|c| c.rhs)
        .min()
}

/// Split linear constraints into the nested family and the relaxed rest.
/// Returns the family (children first, synthetic root last), the owning set
/// of every free variable, and the indices of relaxed constraints.
fn nest(
    model: &ConstraintModel,
    is_free: &[bool],
    free: &[usize],
    bounded: bool,
) -> (Vec<NestedSet>, Vec<usize>, Vec<usize>) {
    let mut accepted: Vec<NestedSet> = Vec::new();
    let mut relaxed = Vec::new();

    for (ci, constraint) in model.linear_constraints().iter().enumerate() {
        if !bounded || !is_unit(&constraint.terms, model.num_vars()) {
            relaxed.push(ci);
            continue;
        }
        let mut members: Vec<usize> = constraint
            .terms
            .iter()
            .map(|t| t.var.index())
            .filter(|&i| is_free[i])
            .collect();
        members.sort_unstable();

        let rhs = constraint.rhs;
        let lo = matches!(constraint.cmp, Comparison::GreaterEq | Comparison::Equal).then_some(rhs);
        let hi = matches!(constraint.cmp, Comparison::LessEq | Comparison::Equal).then_some(rhs);

        if let Some(same) = accepted.iter_mut().find(|s| s.members == members) {
            same.lo = same.lo.max(lo);
            same.hi = match (same.hi, hi) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            continue;
        }

        let crosses = accepted.iter().any(|s| {
            let shared = overlap(&s.members, &members);
            shared != 0 && shared != s.members.len() && shared != members.len()
        });
        if crosses {
            relaxed.push(ci);
            continue;
        }

        accepted.push(NestedSet {
            members,
            lo,
            hi,
            counter: Some(ci),
            children: Vec::new(),
            own: Vec::new(),
            own_prefix: Vec::new(),
        });
    }

    accepted.sort_by_key(|s| s.members.len());
    accepted.push(NestedSet {
        members: free.to_vec(),
        lo: None,
        hi: None,
        counter: None,
        children: Vec::new(),
        own: Vec::new(),
        own_prefix: Vec::new(),
    });

    let root = accepted.len() - 1;
    for i in 0..root {
        let size = accepted[i].members.len();
        let parent = (i + 1..root)
            .find(|&j| {
                accepted[j].members.len() > size
                    && overlap(&accepted[i].members, &accepted[j].members) == size
            })
            .unwrap_or(root);
        accepted[parent].children.push(i);
    }

    let mut owner = vec![root; model.num_vars()];
    let mut assigned = vec![false; model.num_vars()];
    for (s, set) in accepted.iter().enumerate() {
        for &i in &set.members {
            if !assigned[i] {
                owner[i] = s;
                assigned[i] = true;
            }
        }
    }

    (accepted, owner, relaxed)
}

/// Number of shared elements of two ascending index lists.
fn overlap(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

fn relaxed_rows(model: &ConstraintModel, relaxed: &[usize]) -> Vec<RelaxedRow> {
    let linear = relaxed.iter().map(|&ci| {
        let c = &model.linear_constraints()[ci];
        let terms: Vec<(usize, i64)> = c.terms.iter().map(|t| (t.var.index(), t.coef)).collect();
        (terms, c.cmp, c.rhs)
    });
    let implications = model.implications().iter().map(|imp| {
        let mut terms = vec![(imp.premise.index(), -1)];
        terms.extend(imp.any_of.iter().map(|v| (v.index(), 1)));
        (terms, Comparison::GreaterEq, 0)
    });

    linear
        .chain(implications)
        .map(|(terms, cmp, rhs)| {
            let scale = terms.iter().map(|(_, coef)| coef.abs()).max().unwrap_or(1).max(1) as f64;
            RelaxedRow {
                terms: terms.into_iter().map(|(i, coef)| (i, coef as f64 / scale)).collect(),
                cmp,
                rhs: rhs as f64 / scale,
            }
        })
        .collect()
}

fn reduced_costs(model: &ConstraintModel, rows: &[RelaxedRow], multipliers: &[f64]) -> Vec<f64> {
    let mut reduced: Vec<f64> = model.vars().map(|v| model.objective_coef(v) as f64).collect();
    for (row, &mu) in rows.iter().zip(multipliers) {
        if mu == 0.0 {
            continue;
        }
        for &(i, coef) in &row.terms {
            reduced[i] -= mu * coef;
        }
    }
    reduced
}

fn dual_constant(rows: &[RelaxedRow], multipliers: &[f64]) -> f64 {
    rows.iter().zip(multipliers).map(|(row, mu)| mu * row.rhs).sum()
}

/// `out[t] = max(a[i] + b[t - i])` for `t <= cap`.
fn max_plus(a: &[f64], b: &[f64], cap: usize, out: &mut Vec<f64>) {
    out.clear();
    out.resize(cap + 1, f64::NEG_INFINITY);
    for (i, &x) in a.iter().enumerate().take(cap + 1) {
        if x == f64::NEG_INFINITY {
            continue;
        }
        for (j, &y) in b.iter().enumerate().take(cap + 1 - i) {
            if y > f64::NEG_INFINITY && x + y > out[i + j] {
                out[i + j] = x + y;
            }
        }
    }
}

/// Rule out counts below `lo` or above `hi`.
fn clamp(table: &mut [f64], lo: Option<i64>, hi: Option<i64>) {
    for (t, x) in table.iter_mut().enumerate() {
        let t = t as i64;
        if lo.is_some_and(|lo| t < lo) || hi.is_some_and(|hi| t > hi) {
            *x = f64::NEG_INFINITY;
        }
    }
}

//! Rule selection optimizer.
//!
//! The selection problem is a weighted set cover with an escape hatch: every transition is
//! either explained by a selected rule or explicitly marked as uncovered at a high price.
//!
//! Variables are `x_r` (rule `r` is selected), `y_{t,r}` (transition `t` is explained by `r`,
//! one per coverage entry), `u_t` (transition `t` is uncovered) and `e_p` (spurious product
//! `p` is generated by a selected rule). The model minimizes
//!
//! ```text
//! Σ x_r  +  modifier · (Σ d(t,r) · y_{t,r}  +  Σ e_p)  +  P · Σ u_t
//! ```
//!
//! subject to `Σ_r y_{t,r} + u_t ≥ 1`, `y_{t,r} ≤ x_r` and `e_p ≥ x_r` for every rule `r`
//! producing `p`, where `P = 1 + |R| + modifier · (Σ_t max_r d(t,r) + |products|)` is larger
//! than the cost of any rule set that explains a transition, so `u_t` is only used when
//! nothing applies to `t`. Spurious products make general rules pay for everything else they
//! do, which is what lets a rule with more context win over a minimal one.

use crate::coverage::CoverageMatrix;
use crate::error::{InferenceError, InfeasibleModelError, SolverError};
use crate::simple_type_name;
use crate::solver::{MipModel, MipSolver, Relation, SolveStatus, VarId};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::time::Duration;


/// The binary program of one selection problem together with its variable layout.
#[derive(Clone, Debug)]
pub struct SelectionModel {
    model: MipModel,
    modifier: f64,
    penalty: f64,
    rules: Vec<VarId>,
    /// One `y` variable per coverage entry, in coverage order.
    uses: Vec<VarId>,
    uncovered: Vec<VarId>,
    /// One `e` variable per spurious product.
    spurious: Vec<VarId>,
}

impl SelectionModel {
    pub fn build(coverage: &CoverageMatrix, modifier: f64) -> SelectionModel {
        let worst: f64 = (0..coverage.transition_count())
            .filter_map(|t| coverage.max_distortion(t))
            .sum();
        let products = coverage.spurious_product_count();
        let penalty = 1.0 + coverage.rule_count() as f64 + modifier * (worst + products as f64);

        let mut model = MipModel::new();
        let rules: Vec<VarId> = (0..coverage.rule_count())
            .map(|r| model.add_binary_var(format!("x_{r}")))
            .collect();
        let uses: Vec<VarId> = coverage
            .entries()
            .iter()
            .map(|e| model.add_binary_var(format!("y_{}_{}", e.transition, e.rule)))
            .collect();
        let uncovered: Vec<VarId> = (0..coverage.transition_count())
            .map(|t| model.add_binary_var(format!("u_{t}")))
            .collect();
        let spurious: Vec<VarId> = (0..products)
            .map(|p| model.add_binary_var(format!("e_{p}")))
            .collect();

        let mut explains: Vec<Vec<(VarId, f64)>> = vec![Vec::new(); coverage.transition_count()];
        for (entry, y) in coverage.entries().iter().zip(&uses) {
            explains[entry.transition].push((*y, 1.0));
            model.add_constraint([(*y, 1.0), (rules[entry.rule], -1.0)], Relation::Le, 0.0);
        }
        for (t, mut terms) in explains.into_iter().enumerate() {
            terms.push((uncovered[t], 1.0));
            model.add_constraint(terms, Relation::Ge, 1.0);
        }
        for (r, x) in rules.iter().enumerate() {
            for &p in coverage.spurious_products(r) {
                model.add_constraint([(spurious[p], 1.0), (*x, -1.0)], Relation::Ge, 0.0);
            }
        }

        let objective = rules
            .iter()
            .map(|x| (*x, 1.0))
            .chain(
                coverage
                    .entries()
                    .iter()
                    .zip(&uses)
                    .map(|(e, y)| (*y, modifier * e.distortion)),
            )
            .chain(uncovered.iter().map(|u| (*u, penalty)))
            .chain(spurious.iter().map(|e| (*e, modifier)));
        model.set_objective(objective);

        SelectionModel {
            model,
            modifier,
            penalty,
            rules,
            uses,
            uncovered,
            spurious,
        }
    }

    pub fn model(&self) -> &MipModel {
        &self.model
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Full variable assignment of the given rule subset: every transition is explained by its
    /// best selected rule, or marked as uncovered.
    pub fn encode(&self, coverage: &CoverageMatrix, selected: &[bool]) -> Vec<bool> {
        let mut values = vec![false; self.model.var_count()];
        for (r, x) in self.rules.iter().enumerate() {
            values[x.index()] = selected[r];
        }
        let best: Vec<Option<usize>> = (0..coverage.transition_count())
            .map(|t| best_rule(coverage, t, selected))
            .collect();
        for (entry, y) in coverage.entries().iter().zip(&self.uses) {
            values[y.index()] = best[entry.transition] == Some(entry.rule);
        }
        for (t, u) in self.uncovered.iter().enumerate() {
            values[u.index()] = best[t].is_none();
        }
        for p in produced(coverage, selected) {
            values[self.spurious[p].index()] = true;
        }
        values
    }

    /// Greedy weighted set cover: repeatedly select the rule with the best ratio of newly
    /// explained transitions to their cost, until no rule explains anything new.
    pub fn greedy_cover(&self, coverage: &CoverageMatrix) -> Vec<bool> {
        let mut selected = vec![false; coverage.rule_count()];
        let mut explained = vec![false; coverage.transition_count()];
        loop {
            let mut best: Option<(usize, f64)> = None;
            for (r, chosen) in selected.iter().enumerate() {
                if *chosen {
                    continue;
                }
                let (count, distortion) = coverage
                    .covered_by(r)
                    .filter(|e| !explained[e.transition])
                    .fold((0usize, 0.0), |(c, d), e| (c + 1, d + e.distortion));
                if count == 0 {
                    continue;
                }
                let penalties = distortion + coverage.spurious_applications(r) as f64;
                let ratio = count as f64 / (1.0 + self.modifier * penalties);
                if best.is_none_or(|(_, b)| ratio > b) {
                    best = Some((r, ratio));
                }
            }
            let Some((r, _)) = best else {
                break;
            };
            selected[r] = true;
            for e in coverage.covered_by(r) {
                explained[e.transition] = true;
            }
        }
        selected
    }

    /// Objective value of selecting `rules` and assigning transitions to them (`None` =
    /// uncovered).
    fn objective(
        &self,
        coverage: &CoverageMatrix,
        rules: &[usize],
        assignment: &[Option<(usize, f64)>],
    ) -> f64 {
        let mut selected = vec![false; coverage.rule_count()];
        for &r in rules {
            selected[r] = true;
        }
        let products = produced(coverage, &selected).len();
        let mut objective = rules.len() as f64 + self.modifier * products as f64;
        for explanation in assignment {
            objective += match explanation {
                Some((_, distortion)) => self.modifier * distortion,
                None => self.penalty,
            };
        }
        objective
    }
}

/// Spurious products of the selected rules.
fn produced(coverage: &CoverageMatrix, selected: &[bool]) -> BTreeSet<usize> {
    selected
        .iter()
        .enumerate()
        .filter(|(_, chosen)| **chosen)
        .flat_map(|(r, _)| coverage.spurious_products(r).iter().copied())
        .collect()
}

/// The selected rule with the smallest distortion on `transition` (lowest index on ties).
fn best_rule(coverage: &CoverageMatrix, transition: usize, selected: &[bool]) -> Option<usize> {
    coverage
        .covering(transition)
        .iter()
        .filter(|e| selected[e.rule])
        .fold(None, |best: Option<(usize, f64)>, e| match best {
            Some((_, d)) if d <= e.distortion => best,
            _ => Some((e.rule, e.distortion)),
        })
        .map(|(rule, _)| rule)
}

/// Outcome of rule selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub status: SolveStatus,
    pub objective: f64,
    /// Selected rules, ascending. Every one of them explains at least one transition.
    pub rules: Vec<usize>,
    /// For every transition, the explaining rule and its distortion, or `None` if uncovered.
    pub assignment: Vec<Option<(usize, f64)>>,
}

impl Selection {
    pub fn is_best_effort(&self) -> bool {
        self.status != SolveStatus::Optimal
    }

    pub fn uncovered(&self) -> impl Iterator<Item = usize> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(t, _)| t)
    }

    pub fn total_distortion(&self) -> f64 {
        self.assignment.iter().flatten().map(|(_, d)| d).sum()
    }

    /// Transitions explained by `rule`, with their distortion.
    pub fn explained_by(&self, rule: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(move |(t, a)| match a {
                Some((r, d)) if *r == rule => Some((t, *d)),
                _ => None,
            })
    }
}

/// Select a minimum cost subset of rules explaining all transitions of `coverage`.
///
/// The solver starts from the greedy cover, so a best-effort answer exists even when it is
/// stopped by `time_limit`. The returned selection assigns every transition to its best
/// selected rule and drops rules that end up explaining nothing.
pub fn select<S: MipSolver>(
    solver: &S,
    coverage: &CoverageMatrix,
    modifier: f64,
    time_limit: Option<Duration>,
) -> Result<Selection, InferenceError> {
    let selection_model = SelectionModel::build(coverage, modifier);
    let model = selection_model.model();
    info!(
        "Model: {} candidate rules, {} transitions to cover, {} variables, {} constraints.",
        coverage.rule_count(),
        coverage.transition_count(),
        model.var_count(),
        model.constraint_count()
    );

    let greedy = selection_model.greedy_cover(coverage);
    let hint = selection_model.encode(coverage, &greedy);
    debug!(
        "Greedy cover selects {} rules with objective {}.",
        greedy.iter().filter(|x| **x).count(),
        model.evaluate(&hint)
    );

    info!("Solving with {}.", simple_type_name::<S>());
    let solution = solver.solve(model, time_limit, Some(&hint))?;
    if solution.status == SolveStatus::Infeasible {
        return Err(InfeasibleModelError(format!(
            "no assignment satisfies the {} constraints over {} variables",
            model.constraint_count(),
            model.var_count()
        ))
        .into());
    }
    let Some(incumbent) = solution.assignment else {
        return Err(SolverError::NoSolution.into());
    };
    if solution.status == SolveStatus::TimeLimit {
        warn!("Time limit reached, the selected rule set is a best-effort result.");
    }

    let selected: Vec<bool> = selection_model
        .rules
        .iter()
        .map(|x| incumbent.value(*x))
        .collect();
    let assignment: Vec<Option<(usize, f64)>> = (0..coverage.transition_count())
        .map(|t| {
            best_rule(coverage, t, &selected)
                .and_then(|r| coverage.distortion(t, r).map(|d| (r, d)))
        })
        .collect();
    let mut rules: Vec<usize> = assignment.iter().flatten().map(|(r, _)| *r).collect();
    rules.sort_unstable();
    rules.dedup();

    let dropped = selected.iter().filter(|x| **x).count() - rules.len();
    if dropped > 0 {
        debug!("Dropped {dropped} selected rules that explain no transition.");
    }

    let selection = Selection {
        status: solution.status,
        objective: selection_model.objective(coverage, &rules, &assignment),
        rules,
        assignment,
    };
    info!(
        "Solution: objective {}, {} rules, total distortion {}, {} uncovered transitions.",
        selection.objective,
        selection.rules.len(),
        selection.total_distortion(),
        selection.uncovered().count()
    );
    Ok(selection)
}

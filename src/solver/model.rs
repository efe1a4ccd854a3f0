use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle of a binary variable of a [`MipModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

/// `Σ coefficient · variable  (relation)  bound`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub bound: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[bool], tolerance: f64) -> bool {
        let lhs: f64 = self
            .terms
            .iter()
            .filter(|(var, _)| values[var.index()])
            .map(|(_, coefficient)| coefficient)
            .sum();
        match self.relation {
            Relation::Le => lhs <= self.bound + tolerance,
            Relation::Ge => lhs >= self.bound - tolerance,
            Relation::Eq => (lhs - self.bound).abs() <= tolerance,
        }
    }
}

/// A minimization problem over binary variables with linear constraints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MipModel {
    names: Vec<String>,
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

/// Sum up coefficients of repeated variables.
fn merge_terms(terms: impl IntoIterator<Item = (VarId, f64)>) -> Vec<(VarId, f64)> {
    let mut merged: BTreeMap<VarId, f64> = BTreeMap::new();
    for (var, coefficient) in terms {
        *merged.entry(var).or_insert(0.0) += coefficient;
    }
    merged.into_iter().collect()
}

impl MipModel {
    pub fn new() -> MipModel {
        MipModel::default()
    }

    pub fn add_binary_var(&mut self, name: impl Into<String>) -> VarId {
        self.names.push(name.into());
        self.objective.push(0.0);
        VarId(self.names.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        relation: Relation,
        bound: f64,
    ) {
        self.constraints.push(Constraint {
            terms: merge_terms(terms),
            relation,
            bound,
        });
    }

    /// Replace the (minimized) objective.
    pub fn set_objective(&mut self, terms: impl IntoIterator<Item = (VarId, f64)>) {
        self.objective.iter_mut().for_each(|c| *c = 0.0);
        for (var, coefficient) in merge_terms(terms) {
            self.objective[var.index()] = coefficient;
        }
    }

    pub fn var_count(&self) -> usize {
        self.names.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + use<> {
        (0..self.names.len()).map(VarId)
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var.index()]
    }

    pub fn objective_coefficient(&self, var: VarId) -> f64 {
        self.objective[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn evaluate(&self, values: &[bool]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .filter(|(_, value)| **value)
            .map(|(coefficient, _)| coefficient)
            .sum()
    }

    pub fn is_feasible(&self, values: &[bool], tolerance: f64) -> bool {
        values.len() == self.var_count()
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(values, tolerance))
    }
}

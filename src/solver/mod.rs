//! Binary integer programming.
//!
//! The selection optimizer formulates its problem as a [`MipModel`] and hands it to any
//! [`MipSolver`]. The bundled backend is [`BranchAndBoundSolver`], a depth-first branch and
//! bound over LP relaxations solved by `microlp`.

use crate::error::SolverError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod branch_and_bound;
mod model;

#[cfg(test)]
mod tests;

pub use branch_and_bound::{BranchAndBound, BranchAndBoundSolver, BranchStep, SearchContext, SearchState};
pub use model::{Constraint, MipModel, Relation, VarId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveStatus {
    /// The assignment is proven optimal.
    Optimal,
    /// The search was stopped early; the assignment (if any) is the best one found so far.
    TimeLimit,
    /// The model has no feasible assignment.
    Infeasible,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub values: Vec<bool>,
    pub objective: f64,
}

impl Assignment {
    pub fn value(&self, var: VarId) -> bool {
        self.values[var.index()]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MipSolution {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
}

/// A backend that minimizes a [`MipModel`].
///
/// Implementations must honor `time_limit` in a best-effort way: once it elapses, they report
/// the best feasible assignment seen so far with [`SolveStatus::TimeLimit`]. A `hint` is a
/// feasible assignment the search may start from; infeasible hints are ignored.
pub trait MipSolver {
    fn solve(
        &self,
        model: &MipModel,
        time_limit: Option<Duration>,
        hint: Option<&[bool]>,
    ) -> Result<MipSolution, SolverError>;
}

//! The JSON report of an inference run.
//!
//! ```json
//! {
//!   "summary": {"status": "optimal", "objective": 1.0, "modifier": 1.0, "rules": 1, ...},
//!   "rules": [{"name": "min_t1", "level": "minimal", "cost": 1, "left": {..}, ...}]
//! }
//! ```

use crate::graph::GraphDescription;
use crate::pipeline::InferenceModel;
use crate::selection::Selection;
use crate::solver::SolveStatus;
use serde::{Deserialize, Serialize};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    Optimal,
    /// The solver was stopped before proving optimality.
    BestEffort,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ungeneralizable {
    pub transition: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub status: ResultStatus,
    pub objective: f64,
    pub modifier: f64,
    pub rules: usize,
    pub candidate_rules: usize,
    pub transitions: usize,
    pub total_distortion: f64,
    pub uncovered: Vec<String>,
    pub ungeneralizable: Vec<Ungeneralizable>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    pub transition: String,
    pub distortion: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedRule {
    pub name: String,
    pub level: String,
    pub cost: usize,
    /// Sum of distortions over the transitions this rule explains.
    pub distortion: f64,
    pub left: GraphDescription,
    pub context: GraphDescription,
    pub right: GraphDescription,
    pub covers: Vec<Cover>,
    pub provenance: Vec<String>,
    pub spurious_applications: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub summary: Summary,
    pub rules: Vec<SelectedRule>,
}

impl RuleSet {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Map a selection over `model` to its report.
///
/// # Panics
///
/// Panics if `selection` references rules or transitions that `model` does not have.
pub fn assemble(selection: &Selection, model: &InferenceModel, modifier: f64) -> RuleSet {
    let transition_name = |t: usize| model.transitions[t].name.clone();

    let rules: Vec<SelectedRule> = selection
        .rules
        .iter()
        .map(|&r| {
            let candidate = &model.candidates[r];
            let sides = candidate.rule.sides();
            let covers: Vec<Cover> = selection
                .explained_by(r)
                .map(|(t, distortion)| Cover {
                    transition: transition_name(t),
                    distortion,
                })
                .collect();
            SelectedRule {
                name: candidate.name.clone(),
                level: candidate.level.to_string(),
                cost: 1,
                distortion: covers.iter().map(|c| c.distortion).sum(),
                left: sides.left,
                context: sides.context,
                right: sides.right,
                covers,
                provenance: candidate.provenance.iter().map(|t| transition_name(*t)).collect(),
                spurious_applications: model.coverage.spurious_applications(r),
            }
        })
        .collect();

    let summary = Summary {
        status: match selection.status {
            SolveStatus::Optimal => ResultStatus::Optimal,
            SolveStatus::TimeLimit | SolveStatus::Infeasible => ResultStatus::BestEffort,
        },
        objective: selection.objective,
        modifier,
        rules: rules.len(),
        candidate_rules: model.candidates.len(),
        transitions: model.transitions.len(),
        total_distortion: selection.total_distortion(),
        uncovered: selection.uncovered().map(transition_name).collect(),
        ungeneralizable: model
            .ungeneralizable
            .iter()
            .map(|u| Ungeneralizable {
                transition: transition_name(u.transition),
                reason: u.reason.clone(),
            })
            .collect(),
    };

    RuleSet { summary, rules }
}

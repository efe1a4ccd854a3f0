//! End-to-end driver: load, generate, cover, select, assemble.
//!
//! Everything before selection is captured in an [`InferenceModel`], which can be saved and
//! solved again later with a different modifier.

use crate::config::InferenceConfig;
use crate::coverage::{CoverageMatrix, build_coverage};
use crate::error::{InferenceError, UngeneralizableTransitionError};
use crate::generator::{CandidateRule, generate_all};
use crate::result::{RuleSet, assemble};
use crate::selection::select;
use crate::solver::{BranchAndBoundSolver, MipSolver};
use crate::store::{IteratedMap, Transition};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;


#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub name: String,
    pub label: String,
    pub source: usize,
    pub target: usize,
}

impl From<&Transition> for TransitionInfo {
    fn from(value: &Transition) -> Self {
        TransitionInfo {
            name: value.name.clone(),
            label: value.label.clone(),
            source: value.source,
            target: value.target,
        }
    }
}

/// A transition no candidate rule could be derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UngeneralizableTransition {
    pub transition: usize,
    pub reason: String,
}

impl UngeneralizableTransition {
    pub fn new(transition: usize, error: &UngeneralizableTransitionError) -> Self {
        UngeneralizableTransition {
            transition,
            reason: error.to_string(),
        }
    }
}

/// Transitions, candidate rules and their coverage matrix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceModel {
    pub transitions: Vec<TransitionInfo>,
    pub candidates: Vec<CandidateRule>,
    pub coverage: CoverageMatrix,
    pub ungeneralizable: Vec<UngeneralizableTransition>,
}

impl InferenceModel {
    pub fn build(map: &IteratedMap, config: &InferenceConfig) -> InferenceModel {
        let generation = generate_all(map, &config.generator);
        let coverage = build_coverage(map, &generation.candidates, &config.coverage);
        InferenceModel {
            transitions: map.transitions().iter().map(TransitionInfo::from).collect(),
            ungeneralizable: generation
                .failures
                .iter()
                .map(|(t, error)| UngeneralizableTransition::new(*t, error))
                .collect(),
            candidates: generation.candidates,
            coverage,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), InferenceError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json).map_err(|source| InferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Model saved to {}.", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<InferenceModel, InferenceError> {
        let json = fs::read_to_string(path).map_err(|source| InferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: InferenceModel = serde_json::from_str(&json)?;
        model.check()?;
        info!(
            "Model loaded from {}: {} transitions; {} candidate rules.",
            path.display(),
            model.transitions.len(),
            model.candidates.len()
        );
        Ok(model)
    }

    /// Reject models whose parts do not refer to each other consistently.
    fn check(&self) -> Result<(), InferenceError> {
        let (transitions, rules) = (self.transitions.len(), self.candidates.len());
        if self.coverage.transition_count() != transitions || self.coverage.rule_count() != rules {
            return Err(InferenceError::InvalidModel(format!(
                "coverage matrix is {}x{}, expected {transitions}x{rules}",
                self.coverage.transition_count(),
                self.coverage.rule_count()
            )));
        }
        let entries = self.coverage.entries();
        if let Some(entry) = entries
            .iter()
            .find(|e| e.transition >= transitions || e.rule >= rules || e.distortion < 0.0)
        {
            return Err(InferenceError::InvalidModel(format!(
                "invalid coverage entry {entry:?}"
            )));
        }
        if !entries.is_sorted_by_key(|e| (e.transition, e.rule)) {
            return Err(InferenceError::InvalidModel(
                "coverage entries are not sorted".to_string(),
            ));
        }
        let provenance_ok = self
            .candidates
            .iter()
            .flat_map(|c| c.provenance.iter())
            .chain(self.ungeneralizable.iter().map(|u| &u.transition))
            .all(|t| *t < transitions);
        if !provenance_ok {
            return Err(InferenceError::InvalidModel(
                "a transition index is out of range".to_string(),
            ));
        }
        Ok(())
    }

    /// Select rules with `solver` and assemble the report.
    pub fn solve<S: MipSolver>(
        &self,
        solver: &S,
        modifier: f64,
        time_limit: Option<Duration>,
    ) -> Result<RuleSet, InferenceError> {
        let selection = select(solver, &self.coverage, modifier, time_limit)?;
        Ok(assemble(&selection, self, modifier))
    }
}

/// Infer a rule set for the iterated map stored in `input`.
pub fn run(input: &Path, config: &InferenceConfig) -> Result<RuleSet, InferenceError> {
    let map = IteratedMap::load(input)?;
    let model = InferenceModel::build(&map, config);
    solve(&model, config)
}

/// Solve `model` with the bundled branch and bound solver.
pub fn solve(model: &InferenceModel, config: &InferenceConfig) -> Result<RuleSet, InferenceError> {
    let solver = BranchAndBoundSolver::from(&config.solver);
    model.solve(&solver, config.modifier, config.solver.time_limit)
}

//! Candidate rule generator.
//!
//! Every transition is turned into its structural delta (see [`Delta`]), and every delta into
//! one rule per generalization [`Level`]. Rules of all transitions are then deduplicated up to
//! isomorphism, so a rule explaining several transitions appears once with all of them in its
//! provenance.

use crate::config::{GeneratorConfig, Template};
use crate::error::UngeneralizableTransitionError;
use crate::graph::LabeledGraph;
use crate::store::IteratedMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

mod candidate;
mod correspondence;
mod transition_graph;


pub use candidate::{CandidateRule, CandidateSet};
pub use correspondence::{Delta, infer_deltas};
pub use transition_graph::TransitionGraph;

/// How far a rule is generalized from the delta it was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    /// Changed vertices only, with wildcard left labels.
    Abstract,
    /// Changed vertices only, with concrete labels.
    Minimal,
    /// Changed vertices plus their unchanged neighbourhood of the given radius.
    Context(usize),
}

impl Level {
    /// Short prefix of rule names.
    pub fn prefix(&self) -> String {
        match self {
            Level::Abstract => "abs".to_string(),
            Level::Minimal => "min".to_string(),
            Level::Context(radius) => format!("ctx{radius}"),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Abstract => write!(f, "abstract"),
            Level::Minimal => write!(f, "minimal"),
            Level::Context(radius) => write!(f, "context-{radius}"),
        }
    }
}

/// Levels emitted for every delta, from the most general one.
pub fn levels(config: &GeneratorConfig) -> Vec<Level> {
    let mut levels = Vec::new();
    if config.abstract_rules {
        levels.push(Level::Abstract);
    }
    levels.push(Level::Minimal);
    levels.extend((1..=config.context_radius).map(Level::Context));
    levels
}

/// Candidate rules together with the transitions no rule could be derived from.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub candidates: Vec<CandidateRule>,
    pub failures: Vec<(usize, UngeneralizableTransitionError)>,
}

/// Derive the candidate rules of one transition (not deduplicated).
pub fn generate(
    map: &IteratedMap,
    transition: usize,
    config: &GeneratorConfig,
) -> Result<Vec<CandidateRule>, UngeneralizableTransitionError> {
    let step = &map.transitions()[transition];
    let (source, target) = (map.source_of(step), map.target_of(step));

    let template = config
        .templates
        .get(&step.label)
        .or_else(|| map.templates().get(&step.label));
    if let Some(template) = template {
        check_template(&step.label, template, source, target)?;
    }

    let deltas = match &step.vertex_map {
        Some(pairs) => {
            let delta = Delta::from_pairs(source, pairs);
            if delta.cost(source, target) == 0 {
                return Err(UngeneralizableTransitionError::EmptyDelta);
            }
            vec![delta]
        }
        None => infer_deltas(source, target, config)?,
    };
    debug!(
        "Transition `{}` has {} candidate delta(s).",
        step.name,
        deltas.len()
    );

    let levels = levels(config);
    let mut rules = Vec::with_capacity(deltas.len() * levels.len());
    for (index, delta) in deltas.iter().enumerate() {
        let graph = TransitionGraph::new(source, target, delta);
        let touched = graph.touched();
        let suffix = if deltas.len() > 1 {
            format!("_d{}", index + 1)
        } else {
            String::new()
        };
        let mut context = touched.clone();
        for &level in &levels {
            let vertices = match level {
                Level::Context(radius) => {
                    let extended = graph.neighbourhood(&touched, radius);
                    if extended == context {
                        // The neighbourhood stopped growing.
                        break;
                    }
                    context = extended.clone();
                    extended
                }
                Level::Abstract | Level::Minimal => touched.clone(),
            };
            let (rule, anchor) = graph.rule(&vertices, level);
            let name = format!("{}_{}{}", level.prefix(), step.name, suffix);
            rules.push(CandidateRule::new(name, level, rule, transition, anchor));
        }
    }
    Ok(rules)
}

/// Derive and deduplicate the candidate rules of all transitions.
///
/// Transitions are processed in parallel; the result does not depend on scheduling.
pub fn generate_all(map: &IteratedMap, config: &GeneratorConfig) -> Generation {
    let results: Vec<_> = (0..map.transitions().len())
        .into_par_iter()
        .map(|transition| generate(map, transition, config))
        .collect();

    let mut set = CandidateSet::new();
    let mut failures = Vec::new();
    for (transition, result) in results.into_iter().enumerate() {
        match result {
            Ok(rules) => set.extend(rules),
            Err(error) => {
                warn!(
                    "Transition `{}` cannot be generalized: {}",
                    map.transitions()[transition].name,
                    error
                );
                failures.push((transition, error));
            }
        }
    }

    let mut candidates = set.into_vec();
    candidates.sort_by_key(|c| (c.provenance.first().copied(), c.level));
    let trivial = candidates.iter().filter(|c| c.is_trivial()).count();
    info!(
        "Generated {} candidate rules from {} transitions ({} trivial); {} transitions cannot be generalized.",
        candidates.len(),
        map.transitions().len(),
        trivial,
        failures.len()
    );
    Generation {
        candidates,
        failures,
    }
}

fn check_template(
    label: &str,
    template: &Template,
    source: &LabeledGraph,
    target: &LabeledGraph,
) -> Result<(), UngeneralizableTransitionError> {
    let found = (
        target.vertex_count() as isize - source.vertex_count() as isize,
        target.edge_count() as isize - source.edge_count() as isize,
    );
    let expected = (template.vertex_delta, template.edge_delta);
    if found == expected {
        Ok(())
    } else {
        Err(UngeneralizableTransitionError::TemplateMismatch {
            label: label.to_string(),
            expected,
            found,
        })
    }
}

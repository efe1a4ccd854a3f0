use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level configuration of an inference run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Weight of total distortion relative to rule-set cardinality (default: `1.0`).
    ///
    /// Must be finite and non-negative, see [`InferenceConfig::with_modifier`].
    pub modifier: f64,
    pub generator: GeneratorConfig,
    pub coverage: CoverageConfig,
    pub solver: SolverConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            modifier: 1.0,
            generator: GeneratorConfig::default(),
            coverage: CoverageConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl InferenceConfig {
    /// Update the distortion modifier, rejecting negative and non-finite values.
    pub fn with_modifier(mut self, modifier: f64) -> Result<Self, String> {
        if !modifier.is_finite() || modifier < 0.0 {
            return Err(format!(
                "distortion modifier must be a finite non-negative number, got `{modifier}`"
            ));
        }
        self.modifier = modifier;
        Ok(self)
    }

    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.solver.time_limit = time_limit;
        self
    }
}

/// Expected vertex and edge count differences for all transitions of one label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub vertex_delta: isize,
    pub edge_delta: isize,
}

/// Configuration of the candidate rule generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Maximum number of equally optimal correspondences enumerated per transition.
    pub max_deltas: usize,
    /// Node budget of the correspondence search of a single transition.
    pub max_search_nodes: usize,
    /// Also emit a wildcard variant of every minimal rule (default: `false`).
    pub abstract_rules: bool,
    /// Emit context-extended variants with neighbourhoods of radius `1..=context_radius`
    /// (default: `0`, i.e. minimal rules only).
    pub context_radius: usize,
    /// Transition templates by label.
    pub templates: BTreeMap<String, Template>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_deltas: 8,
            max_search_nodes: 200_000,
            abstract_rules: false,
            context_radius: 0,
            templates: BTreeMap::new(),
        }
    }
}

/// Configuration of the coverage matrix builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Maximum number of embeddings of one rule into one graph that are examined.
    pub max_embeddings: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        CoverageConfig {
            max_embeddings: 256,
        }
    }
}

/// Configuration of the branch and bound solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock limit; once reached, the best incumbent is reported (default: 60s).
    pub time_limit: Option<Duration>,
    /// Limit on explored branch and bound nodes (default: unlimited).
    pub max_nodes: usize,
    /// Values within this distance of `0` or `1` count as integral.
    pub integrality_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: Some(Duration::from_secs(60)),
            max_nodes: usize::MAX,
            integrality_tolerance: 1e-6,
        }
    }
}

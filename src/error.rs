//! Error taxonomy of the inference pipeline.
//!
//! Only [`LoadError`] and [`InfeasibleModelError`] abort a run. An
//! [`UngeneralizableTransitionError`] is recorded per transition and the transition goes through
//! the uncovered fallback of the optimizer. Solver time-outs are not errors at all; they surface
//! as [`crate::solver::SolveStatus::TimeLimit`].

use std::path::PathBuf;
use thiserror::Error;

/// The input iterated map could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input directory `{0}` does not exist")]
    MissingDirectory(PathBuf),
    #[error("input directory is missing the `{0}` subfolder")]
    MissingSubfolder(&'static str),
    #[error("cannot read `{path}`: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed graph file `{path}`: {reason}")]
    MalformedGraph { path: PathBuf, reason: String },
    #[error("malformed transition file `{path}`: {reason}")]
    MalformedTransition { path: PathBuf, reason: String },
    #[error("malformed template file `{path}`: {reason}")]
    MalformedTemplates { path: PathBuf, reason: String },
    #[error("transition `{transition}` references graph {index}, but only {available} graphs exist")]
    GraphOutOfRange {
        transition: String,
        index: usize,
        available: usize,
    },
    #[error("transition `{transition}` has an invalid vertex map: {reason}")]
    InvalidVertexMap { transition: String, reason: String },
    #[error("transition name `{0}` is used more than once")]
    DuplicateTransitionName(String),
    #[error("the input contains no graphs")]
    NoGraphs,
}

/// No rule can be derived from a transition. Recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UngeneralizableTransitionError {
    #[error("source and target graphs are identical, there is nothing to explain")]
    EmptyDelta,
    #[error(
        "label `{label}` expects a vertex/edge delta of {expected:?}, but the graphs differ by {found:?}"
    )]
    TemplateMismatch {
        label: String,
        expected: (isize, isize),
        found: (isize, isize),
    },
    #[error("no provably cheapest vertex correspondence found within {0} search nodes")]
    SearchExhausted(usize),
}

/// The selection model has no feasible solution. With the uncovered fallback in place this
/// indicates a modelling bug.
#[derive(Debug, Clone, Error)]
#[error("the rule selection model is infeasible: {0}")]
pub struct InfeasibleModelError(pub String);

/// Failure of the optimization backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("LP backend failed: {0}")]
    Backend(String),
    #[error("LP relaxation is unbounded")]
    Unbounded,
    #[error("solver stopped without any feasible assignment")]
    NoSolution,
}

/// A saved rule could not be decoded.
#[derive(Debug, Clone, Error)]
#[error("invalid rule description: {0}")]
pub struct RuleFormatError(pub String);

/// Any failure that aborts an inference run.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    InfeasibleModel(#[from] InfeasibleModelError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("cannot access `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("inconsistent model: {0}")]
    InvalidModel(String),
}

impl InferenceError {
    /// Process exit code reported by the command line tool (`2` is taken by usage errors).
    pub fn exit_code(&self) -> i32 {
        match self {
            InferenceError::Load(_) => 3,
            InferenceError::InfeasibleModel(_) => 4,
            InferenceError::Solver(_)
            | InferenceError::Io { .. }
            | InferenceError::Json(_)
            | InferenceError::InvalidModel(_) => 5,
        }
    }
}

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::simple_type_name;
use crate::solver::{Assignment, MipModel, MipSolution, MipSolver, Relation, SolveStatus};
use cancel_this::{Cancelled, is_cancelled};
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, Computable, Computation, ComputationStep, Stateful};
use log::{debug, info, trace, warn};
use microlp::{ComparisonOp, OptimizationDirection, Problem, Solution, Variable};
use std::time::Duration;

/// Nodes whose relaxation bound is not better than the incumbent by this margin are pruned.
const OBJECTIVE_EPSILON: f64 = 1e-9;

/// Immutable inputs of a [`BranchAndBound`] search.
#[derive(Clone, Debug)]
pub struct SearchContext {
    pub model: MipModel,
    pub max_nodes: usize,
    pub tolerance: f64,
}

impl SearchContext {
    pub fn new(model: MipModel, config: &SolverConfig) -> SearchContext {
        SearchContext {
            model,
            max_nodes: config.max_nodes,
            tolerance: config.integrality_tolerance,
        }
    }
}

/// Progress of a [`BranchAndBound`] search. Remains readable after the search is cancelled.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    started: bool,
    variables: Vec<Variable>,
    open: Vec<Solution>,
    incumbent: Option<Assignment>,
    explored: usize,
    pruned: usize,
}

impl SearchState {
    /// Start a search, optionally seeded with a feasible assignment.
    pub fn new(model: &MipModel, hint: Option<&[bool]>, tolerance: f64) -> SearchState {
        let incumbent = match hint {
            Some(values) if model.is_feasible(values, tolerance) => Some(Assignment {
                values: values.to_vec(),
                objective: model.evaluate(values),
            }),
            Some(_) => {
                warn!("Ignoring an infeasible initial assignment.");
                None
            }
            None => None,
        };
        SearchState {
            incumbent,
            ..Default::default()
        }
    }

    pub fn incumbent(&self) -> Option<&Assignment> {
        self.incumbent.as_ref()
    }

    pub fn explored(&self) -> usize {
        self.explored
    }

    pub fn open_nodes(&self) -> usize {
        self.open.len()
    }

    fn finish(&self) -> MipSolution {
        match &self.incumbent {
            Some(assignment) => MipSolution {
                status: SolveStatus::Optimal,
                assignment: Some(assignment.clone()),
            },
            None => MipSolution {
                status: SolveStatus::Infeasible,
                assignment: None,
            },
        }
    }
}

/// One step of the search: the first step solves the root relaxation, every following step
/// processes one open node (depth-first, `1`-branch first).
pub struct BranchStep;

pub type BranchAndBound =
    Computation<SearchContext, SearchState, Result<MipSolution, SolverError>, BranchStep>;

fn backend_error(error: microlp::Error) -> SolverError {
    match error {
        microlp::Error::Unbounded => SolverError::Unbounded,
        error => SolverError::Backend(error.to_string()),
    }
}

/// Build the LP relaxation of `model`. Returns `Ok(None)` when a constraint without terms can
/// never be satisfied.
fn relaxation(model: &MipModel) -> Result<Option<(Vec<Variable>, Problem)>, SolverError> {
    let mut problem = Problem::new(OptimizationDirection::Minimize);
    let variables: Vec<Variable> = model
        .vars()
        .map(|var| problem.add_var(model.objective_coefficient(var), (0.0, 1.0)))
        .collect();
    for constraint in model.constraints() {
        if constraint.terms.is_empty() {
            if constraint.is_satisfied(&[], 0.0) {
                continue;
            }
            return Ok(None);
        }
        let op = match constraint.relation {
            Relation::Le => ComparisonOp::Le,
            Relation::Ge => ComparisonOp::Ge,
            Relation::Eq => ComparisonOp::Eq,
        };
        let terms = constraint
            .terms
            .iter()
            .map(|(var, coefficient)| (variables[var.index()], *coefficient));
        problem.add_constraint(terms, op, constraint.bound);
    }
    Ok(Some((variables, problem)))
}

/// The variable furthest from an integral value (lowest index on ties).
fn most_fractional(node: &Solution, variables: &[Variable], tolerance: f64) -> Option<Variable> {
    let mut best: Option<(Variable, f64)> = None;
    for var in variables {
        let value = node[*var];
        let distance = (value - value.round()).abs();
        if distance > tolerance && best.is_none_or(|(_, d)| distance > d) {
            best = Some((*var, distance));
        }
    }
    best.map(|(var, _)| var)
}

impl ComputationStep<SearchContext, SearchState, Result<MipSolution, SolverError>>
    for BranchStep
{
    fn step(
        context: &SearchContext,
        state: &mut SearchState,
    ) -> Completable<Result<MipSolution, SolverError>> {
        is_cancelled!()?;

        if !state.started {
            state.started = true;
            if context.model.var_count() == 0 {
                let feasible = context.model.is_feasible(&[], context.tolerance);
                state.incumbent = feasible.then(|| Assignment {
                    values: Vec::new(),
                    objective: 0.0,
                });
                return Ok(Ok(state.finish()));
            }
            let (variables, problem) = match relaxation(&context.model) {
                Ok(Some(relaxation)) => relaxation,
                Ok(None) => return Ok(Ok(state.finish())),
                Err(error) => return Ok(Err(error)),
            };
            match problem.solve() {
                Ok(root) => {
                    debug!(
                        "[node:0] Root relaxation of {} variables and {} constraints has bound {}.",
                        context.model.var_count(),
                        context.model.constraint_count(),
                        root.objective()
                    );
                    state.variables = variables;
                    state.open.push(root);
                }
                Err(microlp::Error::Infeasible) => return Ok(Ok(state.finish())),
                Err(error) => return Ok(Err(backend_error(error))),
            }
            return Err(Suspended);
        }

        if state.open.is_empty() {
            debug!(
                "[node:{}] {} finished ({} pruned).",
                state.explored,
                simple_type_name::<BranchStep>(),
                state.pruned
            );
            return Ok(Ok(state.finish()));
        }

        if state.explored >= context.max_nodes {
            debug!(
                "[node:{}] {} canceled (exceeded node count).",
                state.explored,
                simple_type_name::<BranchStep>()
            );
            return Err(Cancelled::new("SolverConfig::max_nodes").into());
        }

        let Some(node) = state.open.pop() else {
            return Err(Suspended);
        };
        state.explored += 1;

        let bound = node.objective();
        if let Some(incumbent) = &state.incumbent
            && bound >= incumbent.objective - OBJECTIVE_EPSILON
        {
            state.pruned += 1;
            trace!("[node:{}] Pruned with bound {}.", state.explored, bound);
            return Err(Suspended);
        }

        match most_fractional(&node, &state.variables, context.tolerance) {
            None => {
                let values: Vec<bool> = state.variables.iter().map(|v| node[*v] > 0.5).collect();
                if !context.model.is_feasible(&values, context.tolerance) {
                    warn!(
                        "[node:{}] Rounded relaxation is not feasible, skipping node.",
                        state.explored
                    );
                    return Err(Suspended);
                }
                let objective = context.model.evaluate(&values);
                let improves = state
                    .incumbent
                    .as_ref()
                    .is_none_or(|incumbent| objective < incumbent.objective - OBJECTIVE_EPSILON);
                if improves {
                    debug!(
                        "[node:{}] New incumbent with objective {}.",
                        state.explored, objective
                    );
                    state.incumbent = Some(Assignment { values, objective });
                }
            }
            Some(var) => {
                // Pushed last, popped first: the `1`-branch is explored before the `0`-branch.
                for value in [0.0, 1.0] {
                    match node.clone().fix_var(var, value) {
                        Ok(child) => state.open.push(child),
                        Err(microlp::Error::Infeasible) => {}
                        Err(error) => return Ok(Err(backend_error(error))),
                    }
                }
            }
        }

        Err(Suspended)
    }
}

/// Depth-first branch and bound over `microlp` relaxations.
#[derive(Clone, Debug, Default)]
pub struct BranchAndBoundSolver {
    config: SolverConfig,
}

impl BranchAndBoundSolver {
    pub fn new(config: SolverConfig) -> BranchAndBoundSolver {
        BranchAndBoundSolver { config }
    }
}

impl From<SolverConfig> for BranchAndBoundSolver {
    fn from(value: SolverConfig) -> Self {
        BranchAndBoundSolver::new(value)
    }
}

impl From<&SolverConfig> for BranchAndBoundSolver {
    fn from(value: &SolverConfig) -> Self {
        BranchAndBoundSolver::new(value.clone())
    }
}

impl MipSolver for BranchAndBoundSolver {
    fn solve(
        &self,
        model: &MipModel,
        time_limit: Option<Duration>,
        hint: Option<&[bool]>,
    ) -> Result<MipSolution, SolverError> {
        let tolerance = self.config.integrality_tolerance;
        let context = SearchContext::new(model.clone(), &self.config);
        let state = SearchState::new(model, hint, tolerance);
        let mut search = BranchAndBound::configure(context, state);

        let result = match time_limit {
            Some(limit) => cancel_this::on_timeout(limit, || search.compute()),
            None => search.compute(),
        };

        match result {
            Ok(solution) => {
                let solution = solution?;
                info!(
                    "Branch and bound finished as {:?} after {} nodes.",
                    solution.status,
                    search.state().explored()
                );
                Ok(solution)
            }
            Err(cancelled) => {
                let state = search.state();
                warn!(
                    "Branch and bound stopped early ({:?}) after {} nodes with {} nodes open.",
                    cancelled,
                    state.explored(),
                    state.open_nodes()
                );
                Ok(MipSolution {
                    status: SolveStatus::TimeLimit,
                    assignment: state.incumbent().cloned(),
                })
            }
        }
    }
}

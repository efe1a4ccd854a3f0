use crate::config::SolverConfig;
use crate::solver::{BranchAndBoundSolver, MipModel, MipSolver, Relation, SolveStatus};
use crate::test_utils::init_logger;
use std::time::Duration;

/// Vertex cover of a triangle: the root relaxation is fractional (`0.5` everywhere).
fn triangle_cover() -> MipModel {
    let mut model = MipModel::new();
    let x: Vec<_> = (0..3).map(|i| model.add_binary_var(format!("x{i}"))).collect();
    for (a, b) in [(0, 1), (1, 2), (0, 2)] {
        model.add_constraint([(x[a], 1.0), (x[b], 1.0)], Relation::Ge, 1.0);
    }
    model.set_objective(x.iter().map(|v| (*v, 1.0)));
    model
}

/// Cover `{0, 1, 2}` with `{0, 1}`, `{1, 2}` (cost 1 each) or `{0, 1, 2}` (cost `big`).
fn set_cover(big: f64) -> MipModel {
    let mut model = MipModel::new();
    let a = model.add_binary_var("a");
    let b = model.add_binary_var("b");
    let c = model.add_binary_var("c");
    model.add_constraint([(a, 1.0), (c, 1.0)], Relation::Ge, 1.0);
    model.add_constraint([(a, 1.0), (b, 1.0), (c, 1.0)], Relation::Ge, 1.0);
    model.add_constraint([(b, 1.0), (c, 1.0)], Relation::Ge, 1.0);
    model.set_objective([(a, 1.0), (b, 1.0), (c, big)]);
    model
}

#[test]
fn set_cover_optimum() {
    init_logger();
    let solver = BranchAndBoundSolver::default();

    let solution = solver.solve(&set_cover(1.5), None, None).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    let assignment = solution.assignment.unwrap();
    assert_eq!(assignment.values, vec![false, false, true]);
    assert!((assignment.objective - 1.5).abs() < 1e-9);

    let solution = solver.solve(&set_cover(2.5), None, None).unwrap();
    let assignment = solution.assignment.unwrap();
    assert_eq!(assignment.values, vec![true, true, false]);
    assert!((assignment.objective - 2.0).abs() < 1e-9);
}

#[test]
fn fractional_root_is_branched() {
    init_logger();
    let model = triangle_cover();
    let solution = BranchAndBoundSolver::default()
        .solve(&model, Some(Duration::from_secs(30)), None)
        .unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    let assignment = solution.assignment.unwrap();
    assert!(model.is_feasible(&assignment.values, 1e-9));
    assert_eq!(assignment.values.iter().filter(|v| **v).count(), 2);
    assert!((assignment.objective - 2.0).abs() < 1e-9);
}

#[test]
fn infeasible_model() {
    init_logger();
    let mut model = MipModel::new();
    let a = model.add_binary_var("a");
    let b = model.add_binary_var("b");
    model.add_constraint([(a, 1.0), (b, 1.0)], Relation::Ge, 3.0);
    let solution = BranchAndBoundSolver::default()
        .solve(&model, None, None)
        .unwrap();
    assert_eq!(solution.status, SolveStatus::Infeasible);
    assert!(solution.assignment.is_none());
}

#[test]
fn empty_constraint_is_checked() {
    let mut model = MipModel::new();
    let a = model.add_binary_var("a");
    model.set_objective([(a, 1.0)]);
    model.add_constraint([], Relation::Ge, 1.0);
    let solution = BranchAndBoundSolver::default()
        .solve(&model, None, None)
        .unwrap();
    assert_eq!(solution.status, SolveStatus::Infeasible);
}

#[test]
fn repeated_terms_are_merged() {
    let mut model = MipModel::new();
    let a = model.add_binary_var("a");
    model.add_constraint([(a, 1.0), (a, 1.0)], Relation::Ge, 2.0);
    model.set_objective([(a, 0.5), (a, 0.5)]);
    assert_eq!(model.constraints()[0].terms, vec![(a, 2.0)]);
    assert_eq!(model.objective_coefficient(a), 1.0);

    let solution = BranchAndBoundSolver::default()
        .solve(&model, None, None)
        .unwrap();
    assert_eq!(solution.assignment.unwrap().values, vec![true]);
}

#[test]
fn node_limit_reports_incumbent() {
    init_logger();
    let config = SolverConfig {
        max_nodes: 0,
        ..Default::default()
    };
    let solver = BranchAndBoundSolver::new(config);
    let model = set_cover(1.5);

    // Without a hint, nothing is known when the search stops.
    let solution = solver.solve(&model, None, None).unwrap();
    assert_eq!(solution.status, SolveStatus::TimeLimit);
    assert!(solution.assignment.is_none());

    let hint = [true, true, false];
    let solution = solver.solve(&model, None, Some(&hint)).unwrap();
    assert_eq!(solution.status, SolveStatus::TimeLimit);
    let assignment = solution.assignment.unwrap();
    assert_eq!(assignment.values, hint.to_vec());
    assert!((assignment.objective - 2.0).abs() < 1e-9);
}

#[test]
fn infeasible_hint_is_ignored() {
    let model = set_cover(1.5);
    let solution = BranchAndBoundSolver::default()
        .solve(&model, None, Some(&[true, false, false]))
        .unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    assert_eq!(solution.assignment.unwrap().values, vec![false, false, true]);
}

#[test]
fn model_evaluation() {
    let model = set_cover(1.5);
    assert_eq!(model.var_count(), 3);
    assert_eq!(model.constraint_count(), 3);
    assert_eq!(model.name(model.vars().nth(2).unwrap()), "c");
    assert!(model.is_feasible(&[true, true, false], 0.0));
    assert!(!model.is_feasible(&[true, false, false], 0.0));
    assert!(!model.is_feasible(&[true, true], 0.0));
    assert_eq!(model.evaluate(&[true, true, true]), 3.5);
}

#[test]
fn time_limit_keeps_a_feasible_assignment() {
    init_logger();
    let n = 30;
    let mut model = MipModel::new();
    let x: Vec<_> = (0..n).map(|i| model.add_binary_var(format!("x{i}"))).collect();
    for i in 0..n {
        for j in [i + 1, i + 7] {
            if j < n {
                model.add_constraint([(x[i], 1.0), (x[j], 1.0)], Relation::Ge, 1.0);
            }
        }
    }
    model.set_objective(x.iter().enumerate().map(|(i, v)| (*v, 1.0 + (i % 3) as f64)));

    let hint = vec![true; n];
    let solution = BranchAndBoundSolver::default()
        .solve(&model, Some(Duration::from_millis(500)), Some(&hint))
        .unwrap();
    assert!(matches!(
        solution.status,
        SolveStatus::Optimal | SolveStatus::TimeLimit
    ));
    let assignment = solution.assignment.unwrap();
    assert!(model.is_feasible(&assignment.values, 1e-9));
    assert!(assignment.objective <= model.evaluate(&hint));
}

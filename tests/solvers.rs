extern crate float_eq;
extern crate rl_mpc;
mod common;

use assertor::*;
use common::*;
use float_eq::*;
use ndarray::{array, Array1, Array2, ArrayView2};
use rl_mpc::algos::model_based::mpc::{cem::CemShooting, mppi::MppiShooting, ShootingSolver};
use rl_mpc::envs::linear_system::*;
use rl_mpc::parameter_decay::ParameterDecay;
use rl_mpc::*;
use rstest::rstest;
use std::rc::Rc;

#[rstest]
#[case(SolverKind::Cem)]
#[case(SolverKind::Random)]
#[case(SolverKind::Mppi)]
fn plan_has_horizon_steps_of_action_dim(#[case] kind: SolverKind) {
    let config = MpcConfig {
        filter_coefficients: vec![0.5, 0.3, 0.2],
        ..seeded(kind, 6, 11)
    };
    let mut solver = build_solver(config, double_integrator_models()).unwrap();

    let plan = solver.solve(array![1., -0.5].view()).unwrap();

    assert_eq!(plan.dim(), (6, 1));
    assert_that!(solver.name().to_string()).is_equal_to(kind.to_string());
    let expected_iterations: usize = if kind == SolverKind::Cem { 5 } else { 1 };
    assert_that!(solver.last_solve_stats().len()).is_equal_to(expected_iterations);

    let plans = solver.solve_batch(array![[1., 0.], [0., 1.], [-1., 2.]].view()).unwrap();
    assert_eq!(plans.dim(), (3, 6, 1));
}

#[test]
fn random_shooting_is_one_cem_iteration() {
    let cem_config = MpcConfig {
        num_iter: Some(1),
        num_samples: Some(64),
        num_elites: Some(8),
        ..seeded(SolverKind::Cem, 4, 31415)
    };
    let random_config = MpcConfig {
        solver: SolverKind::Random,
        num_iter: None,
        ..cem_config.clone()
    };
    let mut cem = build_solver(cem_config, integrator_models()).unwrap();
    let mut random = build_solver(random_config, integrator_models()).unwrap();

    for x0 in [1., -0.3] {
        assert_eq!(
            cem.solve(array![x0].view()).unwrap(),
            random.solve(array![x0].view()).unwrap()
        );
    }
}

#[test]
fn same_seed_same_plan() {
    let config = seeded(SolverKind::Mppi, 5, 99);
    let mut a = build_solver(config.clone(), double_integrator_models()).unwrap();
    let mut b = build_solver(config, double_integrator_models()).unwrap();

    assert_eq!(
        a.solve(array![0.3, 0.1].view()).unwrap(),
        b.solve(array![0.3, 0.1].view()).unwrap()
    );
}

#[test]
fn wrong_state_dimension_fails_fast() {
    let mut solver = build_solver(seeded(SolverKind::Cem, 3, 1), double_integrator_models()).unwrap();

    let e = solver.solve(array![1.].view()).unwrap_err();

    assert!(matches!(e, MpcError::ShapeMismatch { .. }));
}

#[test]
fn unknown_selector_is_rejected() {
    let e = MpcConfig::from_json(r#"{"solver": "ilqr", "horizon": 3}"#).unwrap_err();

    assert_eq!(e, MpcError::UnknownSolver("ilqr".to_string()));
    assert!(e.to_string().contains("ilqr not recognized"));
}

#[test]
fn candidates_respect_action_bound() {
    let config = MpcConfig {
        action_bound: Some(0.2),
        scale: 3.,
        num_samples: Some(100),
        num_iter: Some(2),
        ..seeded(SolverKind::Cem, 3, 8)
    };
    let mut solver = build_solver(config, integrator_models()).unwrap();

    let plan = solver.solve(array![5.].view()).unwrap();

    assert!(plan.iter().all(|a| a.abs() <= 0.2 + 1e-12));
    // The best it can do is push down as hard as allowed.
    assert_float_eq!(plan[[0, 0]], -0.2, abs <= 0.05);
}

#[test]
fn mppi_advances_kappa_once_per_solve() {
    let config = MpcConfig {
        num_iter: Some(3),
        ..seeded(SolverKind::Mppi, 4, 3)
    };
    let strategy = MppiShooting::from_config(&config).unwrap();
    let mut solver = ShootingSolver::new(config, integrator_models(), strategy).unwrap();

    solver.solve(array![1.].view()).unwrap();
    solver.solve(array![0.5].view()).unwrap();

    assert_eq!(solver.strategy().kappa().step(), 2);
}

#[test]
fn mppi_covariance_stays_at_scale() {
    let config = MpcConfig {
        num_iter: Some(4),
        scale: 0.4,
        ..seeded(SolverKind::Mppi, 3, 3)
    };
    let mut solver = build_solver(config, integrator_models()).unwrap();

    solver.solve(array![1.].view()).unwrap();

    assert!(solver.covariance().iter().all(|&c| (c - 0.16).abs() <= 1e-12));
}

#[test]
fn cem_elite_count_is_clamped() {
    let config = MpcConfig {
        num_samples: Some(6),
        num_elites: Some(60),
        ..seeded(SolverKind::Cem, 2, 3)
    };
    let strategy = CemShooting::from_config(&config, "cem");

    assert_eq!(strategy.num_elites(), 6);
    assert!(ShootingSolver::new(config, integrator_models(), strategy).is_ok());
}

/// Reward 1 per step; rollouts terminate once the state passes 1.
struct Alive;

impl RewardModel for Alive {
    fn reward(&self, states: ArrayView2<f64>, _: ArrayView2<f64>, _: ArrayView2<f64>) -> Array1<f64> {
        Array1::ones(states.nrows())
    }
}

struct Ahead;

impl TerminalReward for Ahead {
    fn value(&self, states: ArrayView2<f64>) -> Array1<f64> {
        states.column(0).to_owned()
    }
}

#[test]
fn termination_and_terminal_reward_shape_the_plan() {
    let mut models = MpcModels::new(Rc::new(LinearSystem::integrator()), Rc::new(Alive));
    models.termination = Some(Rc::new(StateBound { limit: 1. }));
    let config = MpcConfig {
        num_samples: Some(300),
        num_iter: Some(4),
        ..seeded(SolverKind::Cem, 4, 21)
    };
    let mut solver = build_solver(config, models).unwrap();

    // Staying inside the bound is worth 4; leaving it early loses the remaining steps.
    let plan = solver.solve(array![0.].view()).unwrap();
    let mut x = 0.;
    for a in plan.column(0) {
        x += a;
        assert!(x.abs() <= 1. + 1e-9);
    }

    let mut models = MpcModels::new(Rc::new(LinearSystem::integrator()), Rc::new(Alive));
    models.terminal_reward = Some(Rc::new(Ahead));
    let config = MpcConfig {
        action_bound: Some(0.5),
        num_samples: Some(300),
        ..seeded(SolverKind::Cem, 2, 21)
    };
    let mut solver = build_solver(config, models).unwrap();

    // Without termination the terminal value pushes every action to the bound.
    let plan: Array2<f64> = solver.solve(array![0.].view()).unwrap();
    assert!(plan.iter().all(|&a| a > 0.4));
}

extern crate float_eq;
extern crate rl_mpc;
mod common;

use common::*;
use float_eq::*;
use ndarray::array;
use rl_mpc::envs::linear_system::*;
use rl_mpc::*;
use std::rc::Rc;

/// `x' = x + a`, reward `-(x')²`, starting at 1: the optimal first action is -1.
#[test]
fn cem_drives_integrator_to_origin() {
    let config = MpcConfig {
        gamma: 1.,
        scale: 1.,
        num_samples: Some(200),
        num_iter: Some(5),
        ..seeded(SolverKind::Cem, 3, 2718)
    };
    let mut solver = build_solver(config, integrator_models()).unwrap();

    let plan = solver.solve(array![1.].view()).unwrap();

    assert_float_eq!(plan[[0, 0]], -1., abs <= 0.1);

    let stats = solver.last_solve_stats();
    assert_eq!(stats.len(), 5);
    for pair in stats.windows(2) {
        assert!(
            pair[1].selected_return >= pair[0].selected_return,
            "{:?}",
            stats
        );
    }
    assert!(stats[4].selected_return > stats[0].selected_return);
}

#[test]
fn mppi_drives_integrator_to_origin() {
    let config = MpcConfig {
        scale: 1.,
        num_samples: Some(1000),
        num_iter: Some(10),
        ..seeded(SolverKind::Mppi, 3, 2718)
    };
    let mut solver = build_solver(config, integrator_models()).unwrap();

    let plan = solver.solve(array![1.].view()).unwrap();

    assert_float_eq!(plan[[0, 0]], -1., abs <= 0.3);
}

#[test]
fn batch_elements_are_optimised_independently() {
    let config = MpcConfig {
        scale: 1.,
        num_samples: Some(300),
        ..seeded(SolverKind::Cem, 3, 7)
    };
    let mut solver = build_solver(config, integrator_models()).unwrap();

    let plans = solver.solve_batch(array![[1.], [-2.]].view()).unwrap();

    assert_float_eq!(plans[[0, 0, 0]], -1., abs <= 0.25);
    assert_float_eq!(plans[[1, 0, 0]], 2., abs <= 0.25);
}

/// Receding horizon: executing only first actions still regulates a double integrator.
#[test]
fn closed_loop_double_integrator() {
    let system = Rc::new(LinearSystem::double_integrator(0.1));
    let reward = QuadraticReward::new(array![[1., 0.], [0., 0.1]], array![[0.01]]);
    let models = MpcModels::new(system.clone(), Rc::new(reward));
    let config = MpcConfig {
        warm_start: true,
        default_action: DefaultAction::Constant,
        scale: 1.,
        action_bound: Some(2.),
        num_samples: Some(150),
        ..seeded(SolverKind::Cem, 10, 42)
    };
    let mut policy = MpcPolicy::new(build_solver(config, models).unwrap());

    let mut state = array![1., 0.];
    for _ in 0..60 {
        let action = policy.act(state.view()).unwrap();
        assert_eq!(action.len(), 1);
        state = system.step(&state, &action);
    }

    assert!(state[0].abs() < 0.3, "final state {state:?}");
}

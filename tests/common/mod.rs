use rl_mpc::envs::linear_system::*;
use rl_mpc::*;
use std::rc::Rc;

/// `x' = x + u` with reward `-(x')²`.
#[allow(dead_code)]
pub fn integrator_models() -> MpcModels {
    MpcModels::new(
        Rc::new(LinearSystem::integrator()),
        Rc::new(QuadraticReward::state_only(1, 1)),
    )
}

#[allow(dead_code)]
pub fn double_integrator_models() -> MpcModels {
    MpcModels::new(
        Rc::new(LinearSystem::double_integrator(0.1)),
        Rc::new(QuadraticReward::state_only(2, 1)),
    )
}

#[allow(dead_code)]
pub fn seeded(solver: SolverKind, horizon: usize, seed: u64) -> MpcConfig {
    MpcConfig {
        seed: Some(seed),
        ..MpcConfig::new(solver, horizon)
    }
}

#[allow(dead_code)]
pub fn column(values: &[f64]) -> ndarray::Array2<f64> {
    ndarray::Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap()
}

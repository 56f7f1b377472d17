use super::{cem::CemShooting, MpcModels, ShootingSolver};
use crate::config::{MpcConfig, SolverKind};
use crate::error::Result;

/// Random shooting is the first iteration of the Cross Entropy Method: one
/// round of sampling, and the plan is the average of the best `num_elites`.
///
/// Ref: Nagabandi, Kahn, Fearing & Levine (2018). Neural network dynamics for
/// model-based deep reinforcement learning with model-free fine-tuning.
pub type RandomShooting = ShootingSolver<CemShooting>;

/// Any `num_iter` in `config` is ignored.
pub fn random_shooting(config: MpcConfig, models: MpcModels) -> Result<RandomShooting> {
    let config = MpcConfig {
        solver: SolverKind::Random,
        num_iter: Some(1),
        ..config
    };
    let strategy = CemShooting::from_config(&config, "random");
    ShootingSolver::new(config, models, strategy)
}

extern crate ndarray;
extern crate rand;
extern crate serde;
extern crate serde_json;

pub mod algos;
pub mod common;
pub mod config;
pub mod envs;
pub mod error;
pub mod parameter_decay;
pub mod policy;
pub mod rollout;

pub use algos::model_based::mpc::{
    build_solver, cem::CemShooting, distribution::ActionSequenceDistribution,
    mppi::MppiShooting, random::random_shooting, IterationStats, MpcModels, MpcSolver,
    ShootingSolver, ShootingStrategy,
};
pub use common::defs::*;
pub use config::{DefaultAction, MpcConfig, SolverKind};
pub use error::{MpcError, Result};
pub use policy::MpcPolicy;
pub use rollout::RolloutEvaluator;

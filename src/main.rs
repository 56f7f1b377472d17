use anyhow::Context;
use ndarray::array;
use rl_mpc::envs::linear_system::*;
use rl_mpc::*;
use std::rc::Rc;
use tracing::info;

const NUM_STEPS: usize = 50;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config '{path}'"))?;
            MpcConfig::from_json(&json)?
        }
        None => MpcConfig {
            warm_start: true,
            action_bound: Some(1.),
            seed: Some(2718),
            ..MpcConfig::new(SolverKind::Cem, 15)
        },
    };

    let system = Rc::new(LinearSystem::double_integrator(0.1));
    let reward = Rc::new(QuadraticReward::new(
        array![[1., 0.], [0., 0.1]],
        array![[0.01]],
    ));
    let models = MpcModels::new(system.clone(), reward.clone());
    let mut policy = MpcPolicy::new(build_solver(config.clone(), models)?);

    info!(solver = %config.solver, horizon = config.horizon, "Starting episode");
    let mut state = array![1., 0.];
    let mut total_reward = 0.;
    for t in 0..NUM_STEPS {
        let action = policy.act(state.view())?;
        let next_state = system.step(&state, &action);
        let r = reward.reward(
            state.view().insert_axis(ndarray::Axis(0)),
            action.view().insert_axis(ndarray::Axis(0)),
            next_state.view().insert_axis(ndarray::Axis(0)),
        )[0];
        total_reward += r;
        info!(t, state = ?state.to_vec(), action = ?action.to_vec(), reward = r, "Step");
        state = next_state;
    }
    policy.reset();

    println!(
        "Finished episode with total reward {} and final state {:?}",
        total_reward,
        state.to_vec()
    );

    Ok(())
}

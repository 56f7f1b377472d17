pub mod cem;
pub mod distribution;
pub mod mppi;
pub mod random;

use crate::common::defs::*;
use crate::config::{MpcConfig, SolverKind};
use crate::error::{MpcError, Result};
use crate::rollout::{repeat_rows, RolloutEvaluator};
use cem::CemShooting;
use distribution::*;
use mppi::MppiShooting;
use ndarray::{Array2, Array3, Array4, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use std::rc::Rc;
use tracing::{debug, info};

/// Shooting-method hooks run by [`ShootingSolver`] once per iteration.
pub trait ShootingStrategy {
    /// What `select` hands to `refit`: elite candidates for CEM, a weighted mean for MPPI.
    type Selection;

    fn name(&self) -> &'static str;

    /// Candidate action sequences, shape `(B, N, H, A)`.
    fn candidates(
        &mut self,
        dist: &ActionSequenceDistribution,
        num_samples: usize,
        rng: &mut StdRng,
    ) -> Array4<Continous>;

    /// `returns` has shape `(B, N)`.
    fn select(&self, candidates: &Array4<Continous>, returns: &Array2<Continous>) -> Self::Selection;

    /// Scalar summary of the selected candidates' returns, for logging.
    fn selected_return(&self, selection: &Self::Selection, returns: &Array2<Continous>) -> Continous;

    fn refit(&mut self, dist: &mut ActionSequenceDistribution, selection: Self::Selection);

    /// Called once after the last refit of every solve.
    fn end_solve(&mut self) {}
}

/// Return statistics of one iteration, averaged over the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    pub iteration: usize,
    pub max_return: Continous,
    pub mean_return: Continous,
    pub selected_return: Continous,
}

/// Mutable state a solver carries between calls.
#[derive(Debug, Clone)]
pub struct SolverState {
    pub distribution: ActionSequenceDistribution,
    pub last_solve: Vec<IterationStats>,
}

/// The model collaborators a solver rolls candidates through.
#[derive(Clone)]
pub struct MpcModels {
    pub dynamics: Rc<dyn DynamicsModel>,
    pub reward: Rc<dyn RewardModel>,
    pub termination: Option<Rc<dyn Termination>>,
    pub terminal_reward: Option<Rc<dyn TerminalReward>>,
}

impl MpcModels {
    pub fn new(dynamics: Rc<dyn DynamicsModel>, reward: Rc<dyn RewardModel>) -> Self {
        Self {
            dynamics,
            reward,
            termination: None,
            terminal_reward: None,
        }
    }
}

/// Sampling-based trajectory optimiser.
pub trait MpcSolver {
    fn name(&self) -> &'static str;

    fn horizon(&self) -> usize;

    fn dim_action(&self) -> usize;

    /// Plans from a single state. Returns the mean action sequence, shape `(H, A)`.
    fn solve(&mut self, state: ArrayView1<Continous>) -> Result<Array2<Continous>> {
        let states = state.insert_axis(Axis(0));
        let plan = self.solve_batch(states)?;
        Ok(plan.index_axis_move(Axis(0), 0))
    }

    /// Plans from every row of `states`, shape `(B, S)`. Returns `(B, H, A)`.
    fn solve_batch(&mut self, states: ArrayView2<Continous>) -> Result<Array3<Continous>>;

    /// Prepares the sampling distribution for a batch of `batch` states.
    fn initialize_actions(&mut self, batch: usize) -> Result<()>;

    /// Overwrites the persisted mean, shape `(H, A)`. `None` restores the zero plan.
    fn reset(&mut self, warm_action: Option<Array2<Continous>>) -> Result<()>;

    /// Restores the unbatched zero-mean, `scale² I` distribution.
    fn clear_plan(&mut self);

    fn mean(&self) -> &Array3<Continous>;

    fn covariance(&self) -> &Array4<Continous>;

    fn last_solve_stats(&self) -> &[IterationStats];
}

pub struct ShootingSolver<S: ShootingStrategy> {
    config: MpcConfig,
    evaluator: RolloutEvaluator,
    strategy: S,
    state: SolverState,
    rng: StdRng,
}

impl<S: ShootingStrategy> ShootingSolver<S> {
    pub fn new(config: MpcConfig, models: MpcModels, strategy: S) -> Result<Self> {
        config.validate()?;

        let dim_action = models.dynamics.dim_action();
        let evaluator = RolloutEvaluator::new(models.dynamics, models.reward, config.gamma)
            .with_termination(models.termination)
            .with_terminal_reward(models.terminal_reward);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let distribution =
            ActionSequenceDistribution::isotropic(1, config.horizon, dim_action, config.scale);

        info!(
            solver = strategy.name(),
            horizon = config.horizon,
            num_iter = config.num_iter(),
            num_samples = config.num_samples(),
            warm_start = config.warm_start,
            "Created MPC solver"
        );

        Ok(Self {
            config,
            evaluator,
            strategy,
            state: SolverState {
                distribution,
                last_solve: vec![],
            },
            rng,
        })
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    fn check_states(&self, states: &ArrayView2<Continous>) -> Result<()> {
        let dim_state = self.evaluator.dynamics.dim_state();
        if states.ncols() != dim_state || states.nrows() == 0 {
            return Err(MpcError::shape(
                format!("(B >= 1, {dim_state}) states"),
                format!("{:?}", states.dim()),
            ));
        }
        Ok(())
    }

    fn clamp_candidates(&self, candidates: &mut Array4<Continous>) {
        if let Some(bound) = self.config.action_bound {
            candidates.mapv_inplace(|x| x.clamp(-bound, bound));
        }
    }
}

impl<S: ShootingStrategy> MpcSolver for ShootingSolver<S> {
    fn name(&self) -> &'static str {
        self.strategy.name()
    }

    fn horizon(&self) -> usize {
        self.config.horizon
    }

    fn dim_action(&self) -> usize {
        self.state.distribution.dim_action()
    }

    fn solve_batch(&mut self, states: ArrayView2<Continous>) -> Result<Array3<Continous>> {
        self.check_states(&states)?;
        let batch = states.nrows();
        self.initialize_actions(batch)?;

        let num_samples = self.config.num_samples();
        let (h, a) = (self.horizon(), self.dim_action());
        let rollout_states = repeat_rows(states, num_samples);

        self.state.last_solve.clear();
        for iteration in 0..self.config.num_iter() {
            let mut candidates =
                self.strategy
                    .candidates(&self.state.distribution, num_samples, &mut self.rng);
            self.clamp_candidates(&mut candidates);

            let flat = candidates
                .view()
                .into_shape((batch * num_samples, h, a))?;
            let returns = self
                .evaluator
                .evaluate(flat, rollout_states.view())
                .into_shape((batch, num_samples))?;

            let selection = self.strategy.select(&candidates, &returns);
            let stats = IterationStats {
                iteration,
                max_return: returns
                    .map_axis(Axis(1), |r| r.fold(Continous::NEG_INFINITY, |m, &x| m.max(x)))
                    .mean()
                    .unwrap_or(Continous::NAN),
                mean_return: returns.mean().unwrap_or(Continous::NAN),
                selected_return: self.strategy.selected_return(&selection, &returns),
            };
            debug!(
                solver = self.strategy.name(),
                iteration,
                max_return = stats.max_return,
                mean_return = stats.mean_return,
                selected_return = stats.selected_return,
                "MPC iteration"
            );
            self.state.last_solve.push(stats);

            self.strategy.refit(&mut self.state.distribution, selection);
        }
        self.strategy.end_solve();

        Ok(self.state.distribution.mean.clone())
    }

    /// Warm start shifts the persisted mean by one step; the covariance is
    /// always reset to `scale² I`.
    fn initialize_actions(&mut self, batch: usize) -> Result<()> {
        let dist = &mut self.state.distribution;
        let (h, a) = (dist.horizon(), dist.dim_action());
        let mean = if self.config.warm_start {
            shifted_mean(dist.mean.view(), self.config.default_action)
        } else {
            Array3::zeros((1, h, a))
        };

        let mean_batch = mean.dim().0;
        dist.mean = mean;
        dist.covariance = isotropic_covariance(mean_batch, h, a, self.config.scale);
        dist.broadcast_to(batch)
    }

    fn reset(&mut self, warm_action: Option<Array2<Continous>>) -> Result<()> {
        let Some(mean) = warm_action else {
            self.clear_plan();
            return Ok(());
        };

        let (h, a) = (self.horizon(), self.dim_action());
        if mean.dim() != (h, a) {
            return Err(MpcError::shape(
                format!("({h}, {a}) warm action"),
                format!("{:?}", mean.dim()),
            ));
        }

        self.state.distribution = ActionSequenceDistribution {
            mean: mean.insert_axis(Axis(0)),
            covariance: isotropic_covariance(1, h, a, self.config.scale),
        };
        Ok(())
    }

    fn clear_plan(&mut self) {
        self.state.distribution = ActionSequenceDistribution::isotropic(
            1,
            self.horizon(),
            self.dim_action(),
            self.config.scale,
        );
    }

    fn mean(&self) -> &Array3<Continous> {
        &self.state.distribution.mean
    }

    fn covariance(&self) -> &Array4<Continous> {
        &self.state.distribution.covariance
    }

    fn last_solve_stats(&self) -> &[IterationStats] {
        &self.state.last_solve
    }
}

/// Builds the solver named by `config.solver`.
pub fn build_solver(config: MpcConfig, models: MpcModels) -> Result<Box<dyn MpcSolver>> {
    Ok(match config.solver {
        SolverKind::Cem => {
            let strategy = CemShooting::from_config(&config, "cem");
            Box::new(ShootingSolver::new(config, models, strategy)?)
        }
        SolverKind::Random => Box::new(random::random_shooting(config, models)?),
        SolverKind::Mppi => {
            let strategy = MppiShooting::from_config(&config)?;
            Box::new(ShootingSolver::new(config, models, strategy)?)
        }
    })
}

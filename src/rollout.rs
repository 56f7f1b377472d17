use crate::common::{defs::*, utils::discount_sum};
use ndarray::{s, Array1, Array2, ArrayView2, ArrayView3, Axis};
use std::rc::Rc;

/// Simulates every action sequence in `actions` (shape `(M, H, A)`) from the
/// matching row of `states` (shape `(M, S)`).
/// Once `termination` fires for a rollout its `done` flag stays set.
pub fn rollout_actions(
    dynamics: &dyn DynamicsModel,
    reward: &dyn RewardModel,
    termination: Option<&dyn Termination>,
    actions: ArrayView3<Continous>,
    states: ArrayView2<Continous>,
) -> Vec<Observation> {
    let (m, h, _) = actions.dim();
    let mut trajectory = Vec::with_capacity(h);
    let mut state = states.to_owned();
    let mut done = Array1::from_elem(m, false);

    for t in 0..h {
        let action = actions.slice(s![.., t, ..]).to_owned();
        let next_state = dynamics.next_state(state.view(), action.view());
        let r = reward.reward(state.view(), action.view(), next_state.view());
        if let Some(termination) = termination {
            let fired = termination.terminated(state.view(), action.view(), next_state.view());
            done.zip_mut_with(&fired, |d, &f| *d = *d || f);
        }

        trajectory.push(Observation {
            state,
            action,
            reward: r,
            next_state: next_state.clone(),
            done: done.clone(),
        });
        state = next_state;
    }

    trajectory
}

/// Scores candidate action sequences by discounted return under the model.
pub struct RolloutEvaluator {
    pub dynamics: Rc<dyn DynamicsModel>,
    pub reward: Rc<dyn RewardModel>,
    pub termination: Option<Rc<dyn Termination>>,
    pub terminal_reward: Option<Rc<dyn TerminalReward>>,
    pub gamma: Continous,
}

impl RolloutEvaluator {
    pub fn new(dynamics: Rc<dyn DynamicsModel>, reward: Rc<dyn RewardModel>, gamma: Continous) -> Self {
        Self {
            dynamics,
            reward,
            termination: None,
            terminal_reward: None,
            gamma,
        }
    }

    pub fn with_termination(mut self, termination: Option<Rc<dyn Termination>>) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_terminal_reward(mut self, terminal_reward: Option<Rc<dyn TerminalReward>>) -> Self {
        self.terminal_reward = terminal_reward;
        self
    }

    /// `Σ_t gamma^t r_t` over the steps up to and including the one that
    /// terminated, plus `gamma^H V(x_H)` when a terminal reward is configured.
    pub fn evaluate(
        &self,
        actions: ArrayView3<Continous>,
        states: ArrayView2<Continous>,
    ) -> Array1<Continous> {
        let horizon = actions.dim().1;
        let trajectory = rollout_actions(
            self.dynamics.as_ref(),
            self.reward.as_ref(),
            self.termination.as_deref(),
            actions,
            states,
        );

        let m = states.nrows();
        let mut rewards = Array2::<Continous>::zeros((horizon, m));
        let mut alive = Array2::from_elem((horizon, m), true);
        let mut was_done = Array1::from_elem(m, false);
        for (t, obs) in trajectory.iter().enumerate() {
            rewards.row_mut(t).assign(&obs.reward);
            alive.row_mut(t).assign(&was_done.mapv(|d| !d));
            was_done.assign(&obs.done);
        }

        let mut returns = discount_sum(rewards.view(), alive.view(), self.gamma);

        if let (Some(terminal_reward), Some(last)) = (&self.terminal_reward, trajectory.last()) {
            let v = terminal_reward.value(last.next_state.view());
            returns.scaled_add(self.gamma.powi(horizon as i32), &v);
        }

        returns
    }
}

pub(crate) fn repeat_rows(states: ArrayView2<Continous>, n: usize) -> Array2<Continous> {
    let (b, dim) = states.dim();
    let mut out = Array2::zeros((b * n, dim));
    for (i, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        row.assign(&states.row(i / n));
    }
    out
}

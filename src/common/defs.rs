use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub type Continous = f64;

/// State transition model. All calls are batched: row `i` of every argument
/// belongs to the same rollout.
pub trait DynamicsModel {
    fn dim_state(&self) -> usize;

    fn dim_action(&self) -> usize;

    fn next_state(&self, states: ArrayView2<Continous>, actions: ArrayView2<Continous>)
        -> Array2<Continous>;
}

pub trait RewardModel {
    fn reward(
        &self,
        states: ArrayView2<Continous>,
        actions: ArrayView2<Continous>,
        next_states: ArrayView2<Continous>,
    ) -> Array1<Continous>;
}

pub trait Termination {
    fn terminated(
        &self,
        states: ArrayView2<Continous>,
        actions: ArrayView2<Continous>,
        next_states: ArrayView2<Continous>,
    ) -> Array1<bool>;
}

/// Value estimate of the state reached at the end of the horizon.
pub trait TerminalReward {
    fn value(&self, states: ArrayView2<Continous>) -> Array1<Continous>;
}

/// One simulated step for a whole batch of rollouts.
#[derive(Clone, Debug)]
pub struct Observation {
    pub state: Array2<Continous>,
    pub action: Array2<Continous>,
    pub reward: Array1<Continous>,
    pub next_state: Array2<Continous>,
    pub done: Array1<bool>,
}

pub trait Policy {
    fn act(&mut self, s: ArrayView1<Continous>) -> crate::Result<Array1<Continous>>;

    fn reset(&mut self);
}

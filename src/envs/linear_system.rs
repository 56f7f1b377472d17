use crate::common::defs::*;
use crate::error::{MpcError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Discrete time linear system `x' = A x + B u`.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    a: Array2<Continous>,
    b: Array2<Continous>,
}

impl LinearSystem {
    pub fn new(a: Array2<Continous>, b: Array2<Continous>) -> Result<Self> {
        if !a.is_square() || a.nrows() != b.nrows() {
            return Err(MpcError::shape(
                "A (S, S) and B (S, A)",
                format!("A {:?}, B {:?}", a.dim(), b.dim()),
            ));
        }

        Ok(Self { a, b })
    }

    /// `x' = x + u` in one dimension.
    pub fn integrator() -> Self {
        Self {
            a: Array2::eye(1),
            b: Array2::eye(1),
        }
    }

    /// Position/velocity pair driven by an acceleration, time step `dt`.
    pub fn double_integrator(dt: Continous) -> Self {
        Self {
            a: ndarray::array![[1., dt], [0., 1.]],
            b: ndarray::array![[0.5 * dt * dt], [dt]],
        }
    }

    pub fn step(&self, state: &Array1<Continous>, action: &Array1<Continous>) -> Array1<Continous> {
        self.a.dot(state) + self.b.dot(action)
    }
}

impl DynamicsModel for LinearSystem {
    fn dim_state(&self) -> usize {
        self.a.nrows()
    }

    fn dim_action(&self) -> usize {
        self.b.ncols()
    }

    fn next_state(&self, states: ArrayView2<Continous>, actions: ArrayView2<Continous>) -> Array2<Continous> {
        states.dot(&self.a.t()) + actions.dot(&self.b.t())
    }
}

/// `-(x'ᵀ Q x' + uᵀ R u)`.
#[derive(Debug, Clone)]
pub struct QuadraticReward {
    q: Array2<Continous>,
    r: Array2<Continous>,
}

impl QuadraticReward {
    pub fn new(q: Array2<Continous>, r: Array2<Continous>) -> Self {
        Self { q, r }
    }

    /// Penalises only the next state: `-|x'|²`.
    pub fn state_only(dim_state: usize, dim_action: usize) -> Self {
        Self {
            q: Array2::eye(dim_state),
            r: Array2::zeros((dim_action, dim_action)),
        }
    }
}

impl RewardModel for QuadraticReward {
    fn reward(
        &self,
        _states: ArrayView2<Continous>,
        actions: ArrayView2<Continous>,
        next_states: ArrayView2<Continous>,
    ) -> Array1<Continous> {
        let state_cost = (&next_states.dot(&self.q) * &next_states).sum_axis(Axis(1));
        let action_cost = (&actions.dot(&self.r) * &actions).sum_axis(Axis(1));
        -(state_cost + action_cost)
    }
}

/// Terminates a rollout once any state coordinate leaves `[-limit, limit]`.
#[derive(Debug, Clone, Copy)]
pub struct StateBound {
    pub limit: Continous,
}

impl Termination for StateBound {
    fn terminated(
        &self,
        _states: ArrayView2<Continous>,
        _actions: ArrayView2<Continous>,
        next_states: ArrayView2<Continous>,
    ) -> Array1<bool> {
        next_states.map_axis(Axis(1), |x| x.iter().any(|v| v.abs() > self.limit))
    }
}

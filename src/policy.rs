use crate::algos::model_based::mpc::MpcSolver;
use crate::common::defs::*;
use crate::error::Result;
use ndarray::{Array1, Array2, ArrayView1};

/// Receding horizon controller: plans a full sequence every call and executes
/// only its first action.
pub struct MpcPolicy {
    pub solver: Box<dyn MpcSolver>,
    last_plan: Option<Array2<Continous>>,
}

impl MpcPolicy {
    pub fn new(solver: Box<dyn MpcSolver>) -> Self {
        Self {
            solver,
            last_plan: None,
        }
    }

    /// The sequence planned by the latest `act`, shape `(H, A)`.
    pub fn last_plan(&self) -> Option<&Array2<Continous>> {
        self.last_plan.as_ref()
    }
}

impl Policy for MpcPolicy {
    fn act(&mut self, s: ArrayView1<Continous>) -> Result<Array1<Continous>> {
        let plan = self.solver.solve(s)?;
        let action = plan.row(0).to_owned();
        self.last_plan = Some(plan);
        Ok(action)
    }

    /// Drops the persisted plan so the next episode starts cold.
    fn reset(&mut self) {
        self.last_plan = None;
        self.solver.clear_plan();
    }
}

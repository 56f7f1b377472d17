use crate::common::defs::Continous;
use crate::error::{MpcError, Result};
use crate::parameter_decay::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the vacated last step is filled when a warm-started plan is shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DefaultAction {
    #[default]
    Zero,
    Constant,
    Mean,
}

impl FromStr for DefaultAction {
    type Err = MpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(DefaultAction::Zero),
            "constant" => Ok(DefaultAction::Constant),
            "mean" => Ok(DefaultAction::Mean),
            e => Err(MpcError::UnknownDefaultAction(e.to_string())),
        }
    }
}

impl TryFrom<String> for DefaultAction {
    type Error = MpcError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DefaultAction> for String {
    fn from(a: DefaultAction) -> Self {
        a.to_string()
    }
}

impl fmt::Display for DefaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultAction::Zero => write!(f, "zero"),
            DefaultAction::Constant => write!(f, "constant"),
            DefaultAction::Mean => write!(f, "mean"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SolverKind {
    #[default]
    Cem,
    Random,
    Mppi,
}

impl FromStr for SolverKind {
    type Err = MpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cem" => Ok(SolverKind::Cem),
            "random" => Ok(SolverKind::Random),
            "mppi" => Ok(SolverKind::Mppi),
            e => Err(MpcError::UnknownSolver(e.to_string())),
        }
    }
}

impl TryFrom<String> for SolverKind {
    type Error = MpcError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SolverKind> for String {
    fn from(k: SolverKind) -> Self {
        k.to_string()
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Cem => write!(f, "cem"),
            SolverKind::Random => write!(f, "random"),
            SolverKind::Mppi => write!(f, "mppi"),
        }
    }
}

/// Solver options. Everything but `horizon` has a usable default; options
/// that do not apply to the selected solver are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MpcConfig {
    pub solver: SolverKind,
    pub horizon: usize,
    pub gamma: Continous,
    pub scale: Continous,
    /// Defaults to 5 for CEM and 1 for MPPI. Random shooting always runs once.
    pub num_iter: Option<usize>,
    /// Defaults to `10 * horizon`.
    pub num_samples: Option<usize>,
    /// CEM only. Defaults to `max(1, num_samples / 10)`, clamped to `num_samples`.
    pub num_elites: Option<usize>,
    pub warm_start: bool,
    pub default_action: DefaultAction,
    /// MPPI only.
    pub kappa: ScheduleConfig,
    /// MPPI only. Normalised to sum to one.
    pub filter_coefficients: Vec<Continous>,
    /// Candidates are clamped to `[-action_bound, action_bound]` before evaluation.
    pub action_bound: Option<Continous>,
    /// CEM only. Refit per-dimension variances instead of full covariances.
    pub diagonal_covariance: bool,
    pub seed: Option<u64>,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::Cem,
            horizon: 0,
            gamma: 1.,
            scale: 0.3,
            num_iter: None,
            num_samples: None,
            num_elites: None,
            warm_start: false,
            default_action: DefaultAction::Zero,
            kappa: ScheduleConfig::default(),
            filter_coefficients: vec![1.],
            action_bound: None,
            diagonal_covariance: false,
            seed: None,
        }
    }
}

impl MpcConfig {
    pub fn new(solver: SolverKind, horizon: usize) -> Self {
        Self {
            solver,
            horizon,
            ..Default::default()
        }
    }

    /// Parses and validates a JSON config. Unknown `solver` or
    /// `default_action` names surface as their own error variants.
    pub fn from_json(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        if let Some(name) = value.get("solver").and_then(|v| v.as_str()) {
            name.parse::<SolverKind>()?;
        }
        if let Some(name) = value.get("default_action").and_then(|v| v.as_str()) {
            name.parse::<DefaultAction>()?;
        }

        let config = serde_json::from_value::<MpcConfig>(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples.unwrap_or(10 * self.horizon)
    }

    pub fn num_iter(&self) -> usize {
        match self.solver {
            SolverKind::Random => 1,
            SolverKind::Cem => self.num_iter.unwrap_or(5),
            SolverKind::Mppi => self.num_iter.unwrap_or(1),
        }
    }

    /// Requested elite count, clamped to the sample count.
    pub fn num_elites(&self) -> usize {
        let num_samples = self.num_samples();
        self.num_elites
            .unwrap_or_else(|| (num_samples / 10).max(1))
            .min(num_samples)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(MpcError::invalid("horizon", "must be positive"));
        }
        if self.num_iter == Some(0) {
            return Err(MpcError::invalid("num_iter", "must be positive"));
        }
        if self.num_samples() == 0 {
            return Err(MpcError::invalid("num_samples", "must be positive"));
        }
        if self.num_elites == Some(0) {
            return Err(MpcError::invalid("num_elites", "must be positive"));
        }
        if !self.scale.is_finite() || self.scale < 0. {
            return Err(MpcError::invalid("scale", "must be finite and non-negative"));
        }
        if !self.gamma.is_finite() {
            return Err(MpcError::invalid("gamma", "must be finite"));
        }
        if self.filter_coefficients.is_empty() {
            return Err(MpcError::invalid("filter_coefficients", "must not be empty"));
        }
        let total: Continous = self.filter_coefficients.iter().sum();
        if !total.is_finite() || total == 0. {
            return Err(MpcError::invalid(
                "filter_coefficients",
                "must have a finite non-zero sum",
            ));
        }
        if let Some(bound) = self.action_bound {
            if !(bound > 0.) {
                return Err(MpcError::invalid("action_bound", "must be positive"));
            }
        }

        Ok(())
    }
}

use crate::common::defs::Continous;
use crate::error::{MpcError, Result};
use serde::{Deserialize, Serialize};

/// A scalar hyper-parameter whose value may change with an explicit step counter.
pub trait ParameterDecay {
    fn current_value(&self) -> Continous;

    fn advance(&mut self);

    fn step(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    value: Continous,
    step: usize,
}

impl Constant {
    pub fn new(value: Continous) -> Self {
        Self { value, step: 0 }
    }
}

impl ParameterDecay for Constant {
    fn current_value(&self) -> Continous {
        self.value
    }

    fn advance(&mut self) {
        self.step += 1;
    }

    fn step(&self) -> usize {
        self.step
    }
}

/// `end + (start - end) * exp(-step / decay)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    start: Continous,
    end: Continous,
    decay: Continous,
    step: usize,
}

impl ExponentialDecay {
    pub fn new(start: Continous, end: Continous, decay: Continous) -> Result<Self> {
        if !(decay > 0.) {
            return Err(MpcError::invalid("kappa.decay", "must be positive"));
        }

        Ok(Self {
            start,
            end,
            decay,
            step: 0,
        })
    }
}

impl ParameterDecay for ExponentialDecay {
    fn current_value(&self) -> Continous {
        self.end + (self.start - self.end) * (-(self.step as Continous) / self.decay).exp()
    }

    fn advance(&mut self) {
        self.step += 1;
    }

    fn step(&self) -> usize {
        self.step
    }
}

/// Moves linearly from `start` to `end` over `steps` advances, then holds `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDecay {
    start: Continous,
    end: Continous,
    steps: usize,
    step: usize,
}

impl LinearDecay {
    pub fn new(start: Continous, end: Continous, steps: usize) -> Result<Self> {
        if steps == 0 {
            return Err(MpcError::invalid("kappa.steps", "must be positive"));
        }

        Ok(Self {
            start,
            end,
            steps,
            step: 0,
        })
    }
}

impl ParameterDecay for LinearDecay {
    fn current_value(&self) -> Continous {
        let frac = (self.step.min(self.steps) as Continous) / (self.steps as Continous);
        self.start + (self.end - self.start) * frac
    }

    fn advance(&mut self) {
        self.step += 1;
    }

    fn step(&self) -> usize {
        self.step
    }
}

/// Serialised form of a schedule: a bare number is a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleConfig {
    Constant(Continous),
    Decay(DecayConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecayConfig {
    Exponential {
        start: Continous,
        end: Continous,
        decay: Continous,
    },
    Linear {
        start: Continous,
        end: Continous,
        steps: usize,
    },
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::Constant(1.)
    }
}

impl ScheduleConfig {
    pub fn build(&self) -> Result<Box<dyn ParameterDecay>> {
        Ok(match *self {
            ScheduleConfig::Constant(v) => Box::new(Constant::new(v)),
            ScheduleConfig::Decay(DecayConfig::Exponential { start, end, decay }) => {
                Box::new(ExponentialDecay::new(start, end, decay)?)
            }
            ScheduleConfig::Decay(DecayConfig::Linear { start, end, steps }) => {
                Box::new(LinearDecay::new(start, end, steps)?)
            }
        })
    }
}

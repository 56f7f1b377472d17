use super::{distribution::ActionSequenceDistribution, ShootingStrategy};
use crate::common::defs::Continous;
use crate::config::MpcConfig;
use crate::error::{MpcError, Result};
use crate::parameter_decay::{Constant, ParameterDecay};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView1, Axis};
use rand::rngs::StdRng;

/// Model Predictive Path Integral control: candidates are the mean plus
/// temporally filtered noise, and the new mean is the exponentially weighted
/// average of all candidates.
///
/// Ref: Williams, Drews, Goldfain, Rehg & Theodorou (2016). Aggressive driving
/// with model predictive path integral control.
/// Ref: Nagabandi, Konoglie, Levine & Kumar (2019). Deep dynamics models for
/// learning dexterous manipulation.
pub struct MppiShooting {
    kappa: Box<dyn ParameterDecay>,
    filter_coefficients: Array1<Continous>,
}

/// Soft-max weighted mean `(B, H, A)` and the weights behind it `(B, N)`.
#[derive(Debug, Clone)]
pub struct WeightedPlan {
    pub mean: Array3<Continous>,
    pub weights: Array2<Continous>,
}

impl MppiShooting {
    pub fn new(kappa: Box<dyn ParameterDecay>, filter_coefficients: &[Continous]) -> Result<Self> {
        let total: Continous = filter_coefficients.iter().sum();
        if filter_coefficients.is_empty() || !total.is_finite() || total == 0. {
            return Err(MpcError::invalid(
                "filter_coefficients",
                "must have a finite non-zero sum",
            ));
        }

        let filter_coefficients = Array1::from_iter(filter_coefficients.iter().map(|c| c / total));
        let mut partial = 0.;
        for c in filter_coefficients.iter() {
            partial += c;
            if partial == 0. {
                return Err(MpcError::invalid(
                    "filter_coefficients",
                    "every leading window must have a non-zero sum",
                ));
            }
        }

        Ok(Self {
            kappa,
            filter_coefficients,
        })
    }

    pub fn from_config(config: &MpcConfig) -> Result<Self> {
        Self::new(config.kappa.build()?, &config.filter_coefficients)
    }

    pub fn with_constant_kappa(kappa: Continous) -> Self {
        Self {
            kappa: Box::new(Constant::new(kappa)),
            filter_coefficients: Array1::ones(1),
        }
    }

    pub fn kappa(&self) -> &dyn ParameterDecay {
        self.kappa.as_ref()
    }

    pub fn filter_coefficients(&self) -> ArrayView1<'_, Continous> {
        self.filter_coefficients.view()
    }
}

/// Causal filter along the time axis of `raw` (shape `(B, N, H, A)`).
/// Step `i` mixes raw steps `i, i-1, ...` with `coefficients[0], coefficients[1], ...`,
/// renormalised by the coefficients that fit inside the window.
pub fn colored_noise(raw: &Array4<Continous>, coefficients: ArrayView1<Continous>) -> Array4<Continous> {
    let h = raw.len_of(Axis(2));
    let lag = coefficients.len();
    let mut out = Array4::zeros(raw.raw_dim());

    for i in 0..h {
        let width = (i + 1).min(lag);
        let mut step = out.slice_mut(s![.., .., i, ..]);
        for k in 0..width {
            step.scaled_add(coefficients[k], &raw.slice(s![.., .., i - k, ..]));
        }
        let norm = coefficients.slice(s![..width]).sum();
        step.mapv_inplace(|x| x / norm);
    }

    out
}

/// `exp(kappa r_j - max_k kappa r_k)`.
pub fn softmax_weights(returns: ArrayView1<Continous>, kappa: Continous) -> Array1<Continous> {
    let scaled = returns.mapv(|r| kappa * r);
    let max = scaled.fold(Continous::NEG_INFINITY, |m, &x| m.max(x));
    scaled.mapv(|x| (x - max).exp())
}

impl ShootingStrategy for MppiShooting {
    type Selection = WeightedPlan;

    fn name(&self) -> &'static str {
        "mppi"
    }

    fn candidates(
        &mut self,
        dist: &ActionSequenceDistribution,
        num_samples: usize,
        rng: &mut StdRng,
    ) -> Array4<Continous> {
        let raw = dist.sample_noise(num_samples, rng);
        let mut candidates = colored_noise(&raw, self.filter_coefficients.view());
        for (mut per_batch, mean) in candidates.outer_iter_mut().zip(dist.mean.outer_iter()) {
            for mut candidate in per_batch.outer_iter_mut() {
                candidate += &mean;
            }
        }

        candidates
    }

    fn select(&self, candidates: &Array4<Continous>, returns: &Array2<Continous>) -> WeightedPlan {
        let (b, _, h, a) = candidates.dim();
        let kappa = self.kappa.current_value();

        let mut mean = Array3::zeros((b, h, a));
        let mut weights = Array2::zeros(returns.raw_dim());
        for i in 0..b {
            let w = softmax_weights(returns.row(i), kappa);
            let total = w.sum();
            let per_batch = candidates.index_axis(Axis(0), i);
            let mut m = mean.index_axis_mut(Axis(0), i);
            for (candidate, &wj) in per_batch.outer_iter().zip(w.iter()) {
                m.scaled_add(wj / total, &candidate);
            }
            weights.row_mut(i).assign(&w);
        }

        WeightedPlan { mean, weights }
    }

    fn selected_return(&self, selection: &WeightedPlan, returns: &Array2<Continous>) -> Continous {
        let per_batch = (&selection.weights * returns).sum_axis(Axis(1)) / selection.weights.sum_axis(Axis(1));
        per_batch.mean().unwrap_or(Continous::NAN)
    }

    /// Only the mean moves; the covariance stays at its reset value.
    fn refit(&mut self, dist: &mut ActionSequenceDistribution, selection: WeightedPlan) {
        dist.mean = selection.mean;
    }

    fn end_solve(&mut self) {
        self.kappa.advance();
    }
}

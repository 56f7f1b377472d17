use crate::common::{defs::Continous, utils::covariance_factor};
use crate::config::DefaultAction;
use crate::error::{MpcError, Result};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView3, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

/// The solver's belief over the optimal action sequence: one Gaussian per
/// time step, independent across time, replicated for every batch element.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSequenceDistribution {
    /// `(B, H, A)`
    pub mean: Array3<Continous>,
    /// `(B, H, A, A)`
    pub covariance: Array4<Continous>,
}

impl ActionSequenceDistribution {
    pub fn isotropic(batch: usize, horizon: usize, dim_action: usize, scale: Continous) -> Self {
        Self {
            mean: Array3::zeros((batch, horizon, dim_action)),
            covariance: isotropic_covariance(batch, horizon, dim_action, scale),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.mean.dim().0
    }

    pub fn horizon(&self) -> usize {
        self.mean.dim().1
    }

    pub fn dim_action(&self) -> usize {
        self.mean.dim().2
    }

    /// Replicates a single-element distribution across `batch` elements.
    pub fn broadcast_to(&mut self, batch: usize) -> Result<()> {
        let current = self.batch_size();
        if current == batch {
            return Ok(());
        }
        if current != 1 {
            return Err(MpcError::shape(
                format!("batch of 1 or {batch}"),
                format!("persisted batch of {current}"),
            ));
        }

        let (_, h, a) = self.mean.dim();
        let mean = self.mean.index_axis(Axis(0), 0);
        self.mean = Array3::from_shape_fn((batch, h, a), |(_, t, i)| mean[[t, i]]);
        let cov = self.covariance.index_axis(Axis(0), 0);
        self.covariance = Array4::from_shape_fn((batch, h, a, a), |(_, t, i, j)| cov[[t, i, j]]);

        Ok(())
    }

    /// Zero-mean draws with this distribution's covariance, shape `(B, N, H, A)`.
    pub fn sample_noise<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> Array4<Continous> {
        let (b, h, a) = self.mean.dim();
        let factors = (0..b)
            .flat_map(|i| (0..h).map(move |t| (i, t)))
            .map(|(i, t)| covariance_factor(self.covariance.slice(s![i, t, .., ..])))
            .collect::<Vec<Array2<Continous>>>();

        let mut noise = Array4::zeros((b, num_samples, h, a));
        for i in 0..b {
            for n in 0..num_samples {
                for t in 0..h {
                    let z = Array1::from_shape_fn(a, |_| rng.sample::<Continous, _>(StandardNormal));
                    noise
                        .slice_mut(s![i, n, t, ..])
                        .assign(&factors[i * h + t].dot(&z));
                }
            }
        }

        noise
    }

    /// Candidate action sequences, shape `(B, N, H, A)`.
    pub fn sample<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> Array4<Continous> {
        let mut samples = self.sample_noise(num_samples, rng);
        for (mut per_batch, mean) in samples.outer_iter_mut().zip(self.mean.outer_iter()) {
            for mut candidate in per_batch.outer_iter_mut() {
                candidate += &mean;
            }
        }

        samples
    }
}

pub fn isotropic_covariance(
    batch: usize,
    horizon: usize,
    dim_action: usize,
    scale: Continous,
) -> Array4<Continous> {
    let var = scale * scale;
    Array4::from_shape_fn((batch, horizon, dim_action, dim_action), |(_, _, i, j)| {
        if i == j {
            var
        } else {
            0.
        }
    })
}

/// Drops the first step of `mean` (shape `(B, H, A)`) and appends a new last
/// step chosen by `default_action`. With a one-step horizon `Mean` has
/// nothing to average and falls back to zero.
pub fn shifted_mean(mean: ArrayView3<Continous>, default_action: DefaultAction) -> Array3<Continous> {
    let (b, h, a) = mean.dim();
    let mut next = Array3::zeros((b, h, a));
    if h == 0 {
        return next;
    }

    let remaining = mean.slice(s![.., 1.., ..]);
    next.slice_mut(s![.., ..h - 1, ..]).assign(&remaining);

    let last = match default_action {
        DefaultAction::Zero => Array2::zeros((b, a)),
        DefaultAction::Constant => mean.slice(s![.., h - 1, ..]).to_owned(),
        DefaultAction::Mean => remaining
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array2::zeros((b, a))),
    };
    next.slice_mut(s![.., h - 1, ..]).assign(&last);

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use ndarray::array;
    use rand::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(DefaultAction::Zero, vec![2., 3., 0.])]
    #[case(DefaultAction::Constant, vec![2., 3., 3.])]
    #[case(DefaultAction::Mean, vec![2., 3., 2.5])]
    fn shift_policies(#[case] default_action: DefaultAction, #[case] expected: Vec<Continous>) {
        let mean = array![[[1.], [2.], [3.]]];

        let next = shifted_mean(mean.view(), default_action);

        assert_float_eq!(next.iter().cloned().collect::<Vec<_>>(), expected, abs_all <= 1e-12);
    }

    #[test]
    fn shift_single_step_horizon() {
        let mean = array![[[4., -1.]]];

        assert_eq!(shifted_mean(mean.view(), DefaultAction::Mean), array![[[0., 0.]]]);
        assert_eq!(shifted_mean(mean.view(), DefaultAction::Constant), mean);
    }

    #[test]
    fn broadcast_single_to_batch() {
        let mut d = ActionSequenceDistribution::isotropic(1, 2, 1, 0.5);
        d.mean[[0, 1, 0]] = 7.;

        d.broadcast_to(3).unwrap();

        assert_eq!(d.mean.dim(), (3, 2, 1));
        assert_eq!(d.covariance.dim(), (3, 2, 1, 1));
        assert_float_eq!(d.mean[[2, 1, 0]], 7., abs <= 1e-12);
        assert_float_eq!(d.covariance[[1, 0, 0, 0]], 0.25, abs <= 1e-12);

        assert!(matches!(
            d.broadcast_to(2),
            Err(MpcError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn samples_match_moments() {
        let mut d = ActionSequenceDistribution::isotropic(1, 2, 2, 1.);
        d.mean.slice_mut(s![0, 1, ..]).assign(&array![3., -1.]);
        d.covariance
            .slice_mut(s![0, 1, .., ..])
            .assign(&array![[4., 1.], [1., 1.]]);
        let rng = &mut StdRng::seed_from_u64(2718);

        let samples = d.sample(20000, rng);
        let step = samples.slice(s![0, .., 1, ..]);
        let mean = step.mean_axis(Axis(0)).unwrap();
        let centered: Array2<Continous> = &step - &mean;
        let cov = centered.t().dot(&centered) / 20000.;

        assert_float_eq!(mean.to_vec(), vec![3., -1.], abs_all <= 0.05);
        assert_float_eq!(cov[[0, 0]], 4., abs <= 0.15);
        assert_float_eq!(cov[[0, 1]], 1., abs <= 0.1);
        assert_float_eq!(cov[[1, 1]], 1., abs <= 0.05);
    }

    #[test]
    fn zero_scale_gives_the_mean() {
        let mut d = ActionSequenceDistribution::isotropic(1, 3, 1, 0.);
        d.mean[[0, 2, 0]] = 1.5;
        let rng = &mut StdRng::seed_from_u64(1);

        let samples = d.sample(4, rng);

        for n in 0..4 {
            assert_float_eq!(samples[[0, n, 2, 0]], 1.5, abs <= 1e-12);
            assert_float_eq!(samples[[0, n, 0, 0]], 0., abs <= 1e-12);
        }
    }
}

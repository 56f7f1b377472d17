use super::{distribution::ActionSequenceDistribution, ShootingStrategy};
use crate::common::{defs::Continous, utils::sample_mean_and_cov};
use crate::config::MpcConfig;
use itertools::Itertools;
use ndarray::{s, Array2, Array4, ArrayView1, Axis};
use rand::rngs::StdRng;
use std::cmp::Ordering;
use tracing::warn;

/// Cross Entropy Method: refits a Gaussian per time step to the best
/// `num_elites` candidates of every iteration.
///
/// Ref: Chua, Calandra, McAllister & Levine (2018). Deep reinforcement learning
/// in a handful of trials using probabilistic dynamics models.
#[derive(Debug, Clone)]
pub struct CemShooting {
    name: &'static str,
    num_elites: usize,
    diagonal_covariance: bool,
}

/// Elite candidates per batch element, shape `(B, k, H, A)`, and their indices
/// into the candidate batch.
#[derive(Debug, Clone)]
pub struct Elites {
    pub actions: Array4<Continous>,
    pub indices: Vec<Vec<usize>>,
}

impl CemShooting {
    pub fn new(num_elites: usize, diagonal_covariance: bool) -> Self {
        Self {
            name: "cem",
            num_elites: num_elites.max(1),
            diagonal_covariance,
        }
    }

    pub fn from_config(config: &MpcConfig, name: &'static str) -> Self {
        let num_samples = config.num_samples();
        if let Some(requested) = config.num_elites {
            if requested > num_samples {
                warn!(requested, num_samples, "num_elites exceeds num_samples, clamping");
            }
        }

        Self {
            name,
            ..Self::new(config.num_elites(), config.diagonal_covariance)
        }
    }

    pub fn num_elites(&self) -> usize {
        self.num_elites
    }
}

/// Descending order with every NaN, whatever its sign, ranked above all numbers.
fn best_first(a: Continous, b: Continous) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => b.total_cmp(&a),
    }
}

/// Indices of the `k` largest returns, best first. Equal returns (and NaNs
/// among themselves) keep generation order.
pub fn elite_indices(returns: ArrayView1<Continous>, k: usize) -> Vec<usize> {
    (0..returns.len())
        .sorted_by(|&i, &j| best_first(returns[i], returns[j]))
        .take(k)
        .collect()
}

impl ShootingStrategy for CemShooting {
    type Selection = Elites;

    fn name(&self) -> &'static str {
        self.name
    }

    fn candidates(
        &mut self,
        dist: &ActionSequenceDistribution,
        num_samples: usize,
        rng: &mut StdRng,
    ) -> Array4<Continous> {
        dist.sample(num_samples, rng)
    }

    fn select(&self, candidates: &Array4<Continous>, returns: &Array2<Continous>) -> Elites {
        let (b, n, h, a) = candidates.dim();
        let k = self.num_elites.min(n);

        let mut actions = Array4::zeros((b, k, h, a));
        let mut indices = Vec::with_capacity(b);
        for i in 0..b {
            let idx = elite_indices(returns.row(i), k);
            for (e, &j) in idx.iter().enumerate() {
                actions
                    .slice_mut(s![i, e, .., ..])
                    .assign(&candidates.slice(s![i, j, .., ..]));
            }
            indices.push(idx);
        }

        Elites { actions, indices }
    }

    fn selected_return(&self, selection: &Elites, returns: &Array2<Continous>) -> Continous {
        let per_batch = selection
            .indices
            .iter()
            .enumerate()
            .map(|(i, idx)| {
                idx.iter().map(|&j| returns[[i, j]]).sum::<Continous>() / idx.len() as Continous
            })
            .collect_vec();

        per_batch.iter().sum::<Continous>() / per_batch.len() as Continous
    }

    /// Replaces mean and covariance outright with the elites' sample moments.
    fn refit(&mut self, dist: &mut ActionSequenceDistribution, selection: Elites) {
        let (b, _, h, _) = selection.actions.dim();
        for i in 0..b {
            for t in 0..h {
                let samples = selection.actions.slice(s![i, .., t, ..]);
                let (mean, cov) = sample_mean_and_cov(samples, self.diagonal_covariance);
                dist.mean.slice_mut(s![i, t, ..]).assign(&mean);
                dist.covariance.slice_mut(s![i, t, .., ..]).assign(&cov);
            }
        }
    }
}

impl Elites {
    pub fn num_elites(&self) -> usize {
        self.actions.len_of(Axis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;
    use ndarray::{array, Array3};

    #[test]
    fn ties_keep_generation_order() {
        let returns = array![1., 3., 3., -2., 3.];

        assert_debug_snapshot!(elite_indices(returns.view(), 4), @r###"
        [
            1,
            2,
            4,
            0,
        ]
        "###);
    }

    #[test]
    fn nan_returns_rank_first_regardless_of_sign() {
        let produced = Continous::INFINITY - Continous::INFINITY;
        for nan in [Continous::NAN, -Continous::NAN, produced] {
            assert!(nan.is_nan());
            assert_eq!(elite_indices(array![1., nan, 2.].view(), 1), vec![1]);
        }

        let returns = array![-Continous::NAN, 0., Continous::NAN, 5.];
        assert_eq!(elite_indices(returns.view(), 4), vec![0, 2, 3, 1]);
    }

    #[test]
    fn select_gathers_top_candidates() {
        let candidates = Array4::from_shape_fn((1, 4, 2, 1), |(_, n, t, _)| (10 * n + t) as Continous);
        let returns = array![[0., 5., -1., 2.]];

        let elites = CemShooting::new(2, false).select(&candidates, &returns);

        assert_eq!(elites.indices, vec![vec![1, 3]]);
        assert_eq!(elites.num_elites(), 2);
        assert_eq!(elites.actions.slice(s![0, .., .., 0]), array![[10., 11.], [30., 31.]]);
        assert_eq!(CemShooting::new(2, false).selected_return(&elites, &returns), 3.5);
    }

    #[test]
    fn refit_mean_lies_within_elite_hull() {
        let elites = Elites {
            actions: Array4::from_shape_vec((1, 3, 2, 1), vec![0.5, -2., 1.5, -1., 0.9, -4.])
                .unwrap(),
            indices: vec![vec![0, 1, 2]],
        };
        let mut dist = ActionSequenceDistribution::isotropic(1, 2, 1, 1.);
        let mut cem = CemShooting::new(3, false);

        cem.refit(&mut dist, elites.clone());

        for t in 0..2 {
            let step = elites.actions.slice(s![0, .., t, 0]);
            let lo = step.fold(Continous::INFINITY, |m, &x| m.min(x));
            let hi = step.fold(Continous::NEG_INFINITY, |m, &x| m.max(x));
            let m = dist.mean[[0, t, 0]];
            assert!(lo <= m && m <= hi, "step {t}: {m} not in [{lo}, {hi}]");
        }
        assert!((dist.covariance[[0, 0, 0, 0]] - 0.1688888).abs() < 1e-5);
    }

    #[test]
    fn single_elite_collapses_to_it() {
        let candidates = Array4::from_shape_fn((1, 3, 2, 1), |(_, n, t, _)| (n + t) as Continous);
        let returns = array![[1., 9., 4.]];
        let mut cem = CemShooting::new(1, false);
        let mut dist = ActionSequenceDistribution::isotropic(1, 2, 1, 1.);

        let elites = cem.select(&candidates, &returns);
        cem.refit(&mut dist, elites);

        assert_eq!(dist.mean, Array3::from_shape_vec((1, 2, 1), vec![1., 2.]).unwrap());
        assert!(dist.covariance.iter().all(|&c| c > 0. && c < 1e-5));
    }
}

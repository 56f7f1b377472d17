use super::defs::Continous;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Added to every refitted covariance so the next Cholesky factorisation stays well conditioned.
pub const COVARIANCE_JITTER: Continous = 1e-6;

/// Discounted sum over the time axis of `rewards` (shape `(H, M)`).
/// Entries whose `alive` flag is false are skipped, not multiplied by zero,
/// so non-finite rewards after termination never reach the sum.
pub fn discount_sum(
    rewards: ArrayView2<Continous>,
    alive: ArrayView2<bool>,
    gamma: Continous,
) -> Array1<Continous> {
    let mut returns = Array1::<Continous>::zeros(rewards.ncols());
    let mut discount = 1.;
    for (r_t, alive_t) in rewards.outer_iter().zip(alive.outer_iter()) {
        for ((g, &r), &a) in returns.iter_mut().zip(r_t.iter()).zip(alive_t.iter()) {
            if a {
                *g += discount * r;
            }
        }
        discount *= gamma;
    }

    returns
}

/// Empirical mean and (biased) covariance of the rows of `samples` (shape `(k, A)`).
pub fn sample_mean_and_cov(
    samples: ArrayView2<Continous>,
    diagonal: bool,
) -> (Array1<Continous>, Array2<Continous>) {
    let k = samples.nrows() as Continous;
    let dim = samples.ncols();
    let mean = samples
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(dim));

    let centered = &samples - &mean;
    let mut cov = centered.t().dot(&centered) / k;
    if diagonal {
        let var = cov.diag().to_owned();
        cov = Array2::from_diag(&var);
    }
    cov += &(Array2::<Continous>::eye(dim) * COVARIANCE_JITTER);

    (mean, cov)
}

/// Lower-triangular `L` with `L Lᵀ = cov`. Singular PSD matrices (e.g. the
/// covariance of a single elite) fall back to `V sqrt(Λ⁺)` from the symmetric
/// eigendecomposition.
pub fn covariance_factor(cov: ArrayView2<Continous>) -> Array2<Continous> {
    let n = cov.nrows();
    if cov.iter().any(|x| !x.is_finite()) {
        return Array2::from_elem((n, n), Continous::NAN);
    }

    let m = DMatrix::from_fn(n, n, |i, j| cov[[i, j]]);
    if let Some(chol) = m.clone().cholesky() {
        let l = chol.l();
        return Array2::from_shape_fn((n, n), |(i, j)| l[(i, j)]);
    }

    let eig = m.symmetric_eigen();
    Array2::from_shape_fn((n, n), |(i, j)| {
        eig.eigenvectors[(i, j)] * eig.eigenvalues[j].max(0.).sqrt()
    })
}

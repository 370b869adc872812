//! Numerical stability utilities.
//!
//! Provides safe implementations of the nonlinear transforms used to map
//! unconstrained optimizer coordinates into model space:
//!
//! - [`safe_softplus`] / [`safe_softplus_inv`]: ℝ ↔ (0, ∞) without overflow.
//! - [`to_positive`] / [`from_positive`]: softplus shifted by
//!   [`POSITIVE_FLOOR`], the positivity transform of every variance and
//!   lengthscale in the model.
//! - [`log_softmax_rows`] and [`softmax_rows_backward`]: row-wise softmax in
//!   log space and its Jacobian–vector product, used for assignment weights.
//!
//! The guarded strategies use explicit cutoffs (`x > 20.0`) to keep `f64`
//! arithmetic in a well-conditioned regime.
use ndarray::{Array2, Axis, Zip};

/// Lower bound added after softplus so positive parameters never reach zero.
pub const POSITIVE_FLOOR: f64 = 1e-6;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For sufficiently large `x`, `softplus(x) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: returns `t = ln(exp(x) - 1)`.
///
/// # Parameters
/// - `x`: a positive real (the softplus output), must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Map an unconstrained value to `(POSITIVE_FLOOR, ∞)`.
pub fn to_positive(raw: f64) -> f64 {
    safe_softplus(raw) + POSITIVE_FLOOR
}

/// Inverse of [`to_positive`]. `value` must exceed [`POSITIVE_FLOOR`].
pub fn from_positive(value: f64) -> f64 {
    safe_softplus_inv(value - POSITIVE_FLOOR)
}

/// Row-wise log-softmax `ln φ[r, j] = w[r, j] − logsumexp(w[r, ·])`.
///
/// Uses the max-shift trick so large logits do not overflow.
pub fn log_softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let lse = max + row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln();
        row.mapv_inplace(|v| v - lse);
    }
    out
}

/// Jacobian–vector product of the row-wise softmax.
///
/// Given `φ = softmax(w)` row by row and an upstream gradient `g = ∂F/∂φ`,
/// returns `∂F/∂w[r, j] = φ[r, j] (g[r, j] − Σ_i φ[r, i] g[r, i])`.
pub fn softmax_rows_backward(phi: &Array2<f64>, grad_phi: &Array2<f64>) -> Array2<f64> {
    let inner = (phi * grad_phi).sum_axis(Axis(1));
    let mut out = Array2::zeros(phi.raw_dim());
    Zip::from(out.rows_mut())
        .and(phi.rows())
        .and(grad_phi.rows())
        .and(&inner)
        .for_each(|mut o, p, g, &s| {
            Zip::from(&mut o).and(&p).and(&g).for_each(|o, &p, &g| *o = p * (g - s));
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Softplus and its inverse agree with naive formulas and round-trip.
    fn softplus_round_trip_and_naive_agreement() {
        for &x in &[-10.0, -1.0, 0.0, 0.5, 3.0, 25.0] {
            let y = safe_softplus(x);
            if x < 20.0 {
                assert!((y - (1.0 + f64::exp(x)).ln()).abs() < 1e-12);
            }
            assert!((safe_softplus_inv(y) - x).abs() < 1e-8);
        }
        assert!((from_positive(to_positive(0.3)) - 0.3).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Exponentiated log-softmax rows sum to one, even for huge logits.
    fn log_softmax_rows_normalizes() {
        let w = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];

        let lp = log_softmax_rows(&w);

        for row in lp.rows() {
            let s: f64 = row.iter().map(|v| v.exp()).sum();
            assert!((s - 1.0).abs() < 1e-12);
        }
        assert!((lp[[1, 0]] - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The softmax backward pass agrees with finite differences of
    // `F(w) = Σ c ⊙ softmax(w)`.
    fn softmax_backward_matches_finite_differences() {
        let w = array![[0.2, -0.4, 1.1]];
        let c = array![[1.5, -2.0, 0.7]];
        let f = |w: &Array2<f64>| (log_softmax_rows(w).mapv(f64::exp) * &c).sum();

        let phi = log_softmax_rows(&w).mapv(f64::exp);
        let analytic = softmax_rows_backward(&phi, &c);

        let h = 1e-6;
        for j in 0..3 {
            let mut wp = w.clone();
            let mut wm = w.clone();
            wp[[0, j]] += h;
            wm[[0, j]] -= h;
            let fd = (f(&wp) - f(&wm)) / (2.0 * h);
            assert!((analytic[[0, j]] - fd).abs() < 1e-7);
        }
    }
}

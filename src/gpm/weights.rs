//! Assignment-weight initialization.
//!
//! Cell weights `W1 (C×K1)` and gene weights `W2 (G×K2)` start as random
//! categorical distributions per row and enter the model as log-weights
//! with a small additive floor.
use ndarray::{Array2, Axis};
use rand::Rng;

/// Additive floor applied before the log transform so that no log-weight is `-inf`.
pub const LOG_WEIGHT_FLOOR: f64 = 1e-5;

/// Divide each row of `m` by its sum so that every row sums to one.
///
/// Rows that sum to zero produce NaN/±inf; callers pass matrices drawn from
/// a continuous distribution on (0, 1) where that has probability zero.
/// Non-finite results are caught later, when the log-weights are handed to
/// the model builder.
pub fn normalize(m: &Array2<f64>) -> Array2<f64> {
    let sums = m.sum_axis(Axis(1)).insert_axis(Axis(1));
    m / &sums
}

/// Draw a `rows × cols` matrix from Uniform[0, 1) and normalize its rows.
pub fn random_weights<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> Array2<f64> {
    let raw = Array2::from_shape_simple_fn((rows, cols), || rng.gen::<f64>());
    normalize(&raw)
}

/// Elementwise `ln(w + LOG_WEIGHT_FLOOR)`.
pub fn log_weights(w: &Array2<f64>) -> Array2<f64> {
    w.mapv(|v| (v + LOG_WEIGHT_FLOOR).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    // Purpose
    // -------
    // Rows of a nonnegative matrix sum to one after `normalize`, and every
    // entry keeps the sign of its input.
    fn normalize_rows_sum_to_one_and_keep_sign() {
        let m = array![[1.0, 3.0, 0.0], [0.2, 0.2, 0.6], [5.0, 0.0, 5.0]];

        let n = normalize(&m);

        for row in n.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        for (a, b) in m.iter().zip(n.iter()) {
            assert_eq!(*a == 0.0, *b == 0.0);
            assert!(*b >= 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // `normalize` is idempotent: a second pass leaves unit-sum rows unchanged.
    fn normalize_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(11);
        let m = Array2::from_shape_simple_fn((7, 4), || rng.gen::<f64>());

        let once = normalize(&m);
        let twice = normalize(&once);

        for (a, b) in once.iter().zip(twice.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // With a single column every row normalizes to exactly [1.0].
    fn single_column_normalizes_to_one() {
        let mut rng = StdRng::seed_from_u64(3);

        let w1 = random_weights(&mut rng, 5, 1);

        assert_eq!(w1.shape(), &[5, 1]);
        assert!(w1.iter().all(|&v| v == 1.0));
    }

    #[test]
    // Purpose
    // -------
    // A seeded 17066×20 gene-weight draw has unit row sums within 1e-9.
    fn gene_weights_full_size_rows_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(2024);

        let w2 = random_weights(&mut rng, 17_066, 20);

        assert_eq!(w2.shape(), &[17_066, 20]);
        for row in w2.rows() {
            assert!((row.sum() - 1.0).abs() <= 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // The log floor keeps zero weights finite: ln(1e-5).
    fn log_weights_are_finite_for_zero_entries() {
        let w = array![[0.0, 1.0]];

        let lw = log_weights(&w);

        assert_abs_diff_eq!(lw[[0, 0]], LOG_WEIGHT_FLOOR.ln(), epsilon = 1e-12);
        assert!(lw.iter().all(|v| v.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // A zero-sum row is not guarded: it normalizes to NaN.
    fn zero_row_is_not_guarded() {
        let n = normalize(&array![[0.0, 0.0], [1.0, 1.0]]);

        assert!(n[[0, 0]].is_nan());
        assert_eq!(n[[1, 1]], 0.5);
    }
}

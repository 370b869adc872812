//! Minibatch row sampling.
use crate::gpm::errors::{GpmError, GpmResult};
use rand::{rngs::StdRng, seq::index};

/// Draws a fresh set of distinct rows for every optimizer step.
///
/// When the requested size is at least the number of rows the sampler
/// always returns every row, in order.
#[derive(Debug, Clone)]
pub struct MinibatchSampler {
    rng: StdRng,
    rows: usize,
    size: usize,
}

impl MinibatchSampler {
    /// # Errors
    /// `ZeroSize` if `rows` or `size` is zero.
    pub fn new(rng: StdRng, rows: usize, size: usize) -> GpmResult<Self> {
        if size == 0 {
            return Err(GpmError::ZeroSize { what: "minibatch size" });
        }
        if rows == 0 {
            return Err(GpmError::ZeroSize { what: "number of rows" });
        }
        Ok(Self { rng, rows, size: size.min(rows) })
    }

    /// Rows per batch after clamping to the data size.
    pub fn batch_size(&self) -> usize {
        self.size
    }

    pub fn is_full_batch(&self) -> bool {
        self.size == self.rows
    }

    /// All row indices `0..rows`.
    pub fn full(&self) -> Vec<usize> {
        (0..self.rows).collect()
    }

    /// Next batch, sorted ascending.
    pub fn sample(&mut self) -> Vec<usize> {
        if self.is_full_batch() {
            return self.full();
        }
        let mut rows = index::sample(&mut self.rng, self.rows, self.size).into_vec();
        rows.sort_unstable();
        rows
    }
}

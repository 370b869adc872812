//! Inducing inputs shared by every output channel.
use crate::gpm::errors::{GpmError, GpmResult};
use ndarray::Array1;

/// Inducing locations `Z (M)` on the kernel's active input dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct InducingPoints {
    pub z: Array1<f64>,
}

impl InducingPoints {
    /// Wrap explicit locations.
    ///
    /// # Errors
    /// - `ZeroSize` for an empty set.
    /// - `NonFiniteData` for a NaN/±inf location.
    pub fn new(z: Array1<f64>) -> GpmResult<Self> {
        if z.is_empty() {
            return Err(GpmError::ZeroSize { what: "number of inducing points" });
        }
        if let Some((row, &value)) = z.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(GpmError::NonFiniteData { name: "Z", row, col: 0, value });
        }
        Ok(Self { z })
    }

    /// `count` evenly spaced points on `[start, end]`.
    pub fn linspace(start: f64, end: f64, count: usize) -> GpmResult<Self> {
        Self::new(Array1::linspace(start, end, count))
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

/// The same [`InducingPoints`] reused across all kernel output channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedIndependentFeature {
    pub inducing: InducingPoints,
}

impl SharedIndependentFeature {
    pub fn new(inducing: InducingPoints) -> Self {
        Self { inducing }
    }

    /// Number of inducing points `M`.
    pub fn num_inducing(&self) -> usize {
        self.inducing.len()
    }
}

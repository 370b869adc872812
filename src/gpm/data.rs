//! Expression data containers and the plain-text matrix loader.
//!
//! Purpose
//! -------
//! Provide a validated container for the covariate matrix `X (N×D)`, the
//! expression matrix `Y (N×G)` and the row → cell assignment, plus a loader
//! for whitespace-delimited numeric text files.
//!
//! Key behaviors
//! -------------
//! - [`load_matrix`] reads a text matrix (one row per line, no header).
//! - [`CellLayout`] describes how rows map to cells: contiguous equal blocks
//!   or an explicit per-row index.
//! - [`SplitData::new`] enforces matching row counts, finiteness and a valid
//!   cell layout; after construction the data is immutable.
//!
//! Invariants & assumptions
//! ------------------------
//! - `x.nrows() == y.nrows() > 0`, `x.ncols() ≥ 1`, `y.ncols() ≥ 1`.
//! - Every entry of `x` and `y` is finite.
//! - `cell_of[n] < n_cells` for every row `n`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the loader (comments, ragged rows, bad tokens, one
//!   column files) and `SplitData::new` validation paths.
use crate::gpm::errors::{GpmError, GpmResult};
use ndarray::Array2;
use std::{fs, path::Path};

/// load_matrix — read a whitespace-delimited numeric matrix from a text file.
///
/// Parameters
/// ----------
/// - `path`: file to read. Each non-empty line is one row; values are
///   separated by any whitespace. Lines starting with `#` are skipped.
///
/// Returns
/// -------
/// `GpmResult<Array2<f64>>` of shape `(rows, cols)`. A file with a single
/// value per line loads as an `N×1` matrix.
///
/// Errors
/// ------
/// - `GpmError::Io` if the file cannot be read.
/// - `GpmError::Parse` for a token that is not an `f64`.
/// - `GpmError::RaggedRow` when a row length differs from the first row.
/// - `GpmError::EmptyMatrix` when the file contains no data rows.
pub fn load_matrix(path: impl AsRef<Path>) -> GpmResult<Array2<f64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| GpmError::io(path, e))?;
    parse_matrix(&text, &path.display().to_string())
}

/// Parse matrix text; `origin` names the source in error messages.
pub fn parse_matrix(text: &str, origin: &str) -> GpmResult<Array2<f64>> {
    let mut values: Vec<f64> = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0usize;
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let before = values.len();
        for token in trimmed.split_whitespace() {
            let v = token.parse::<f64>().map_err(|e| GpmError::Parse {
                path: origin.to_string(),
                line: idx + 1,
                text: format!("'{token}': {e}"),
            })?;
            values.push(v);
        }
        let found = values.len() - before;
        match ncols {
            None => ncols = Some(found),
            Some(expected) if expected != found => {
                return Err(GpmError::RaggedRow {
                    path: origin.to_string(),
                    line: idx + 1,
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
        nrows += 1;
    }
    let ncols = ncols.ok_or(GpmError::EmptyMatrix { name: "text matrix" })?;
    Array2::from_shape_vec((nrows, ncols), values).map_err(|e| GpmError::Parse {
        path: origin.to_string(),
        line: 0,
        text: e.to_string(),
    })
}

/// How observation rows are assigned to cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLayout {
    /// `n_cells` contiguous blocks of `N / n_cells` rows each; row `n`
    /// belongs to cell `n / (N / n_cells)`.
    Blocks { n_cells: usize },
    /// Explicit cell for every row.
    Explicit { n_cells: usize, cell_of: Vec<usize> },
}

impl CellLayout {
    /// Number of cells described by the layout.
    pub fn n_cells(&self) -> usize {
        match self {
            CellLayout::Blocks { n_cells } | CellLayout::Explicit { n_cells, .. } => *n_cells,
        }
    }

    /// Resolve the layout into a per-row cell index for `rows` observations.
    ///
    /// # Errors
    /// - `ZeroSize` if the layout has no cells.
    /// - `UnevenCellBlocks` if `rows` is not a multiple of the block count.
    /// - `ShapeMismatch` if an explicit index has the wrong length.
    /// - `CellIndexOutOfRange` for an explicit entry `>= n_cells`.
    pub fn resolve(&self, rows: usize) -> GpmResult<Vec<usize>> {
        match self {
            CellLayout::Blocks { n_cells } => {
                if *n_cells == 0 {
                    return Err(GpmError::ZeroSize { what: "number of cells" });
                }
                if rows % n_cells != 0 {
                    return Err(GpmError::UnevenCellBlocks { rows, cells: *n_cells });
                }
                let block = rows / n_cells;
                Ok((0..rows).map(|n| n / block).collect())
            }
            CellLayout::Explicit { n_cells, cell_of } => {
                if *n_cells == 0 {
                    return Err(GpmError::ZeroSize { what: "number of cells" });
                }
                if cell_of.len() != rows {
                    return Err(GpmError::ShapeMismatch {
                        what: "cell index length",
                        expected: rows,
                        found: cell_of.len(),
                    });
                }
                if let Some((row, &cell)) = cell_of.iter().enumerate().find(|&(_, &c)| c >= *n_cells)
                {
                    return Err(GpmError::CellIndexOutOfRange { row, cell, cells: *n_cells });
                }
                Ok(cell_of.clone())
            }
        }
    }
}

/// `SplitData` — validated covariates, expression values and cell index.
///
/// Fields
/// ------
/// - `x`: `Array2<f64>` covariates, `N×D`; the kernel reads one column.
/// - `y`: `Array2<f64>` expression values, `N×G`.
/// - `cell_of`: `Vec<usize>` cell of each row.
/// - `n_cells`: number of cells `C`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub cell_of: Vec<usize>,
    pub n_cells: usize,
}

impl SplitData {
    /// Construct validated [`SplitData`].
    ///
    /// # Errors
    /// - `EmptyMatrix` for an empty `x` or `y`.
    /// - `ShapeMismatch` when `x` and `y` disagree on the row count.
    /// - `NonFiniteData` for the first NaN/±inf entry.
    /// - Any error from [`CellLayout::resolve`].
    pub fn new(x: Array2<f64>, y: Array2<f64>, layout: &CellLayout) -> GpmResult<Self> {
        check_matrix("X", &x)?;
        check_matrix("Y", &y)?;
        if x.nrows() != y.nrows() {
            return Err(GpmError::ShapeMismatch {
                what: "rows of Y",
                expected: x.nrows(),
                found: y.nrows(),
            });
        }
        let cell_of = layout.resolve(x.nrows())?;
        Ok(Self { x, y, cell_of, n_cells: layout.n_cells() })
    }

    /// Number of observation rows `N`.
    pub fn n_rows(&self) -> usize {
        self.y.nrows()
    }

    /// Number of genes `G`.
    pub fn n_genes(&self) -> usize {
        self.y.ncols()
    }
}

// ---- Helper methods ----

fn check_matrix(name: &'static str, m: &Array2<f64>) -> GpmResult<()> {
    if m.is_empty() {
        return Err(GpmError::EmptyMatrix { name });
    }
    if let Some(((row, col), &value)) = m.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(GpmError::NonFiniteData { name, row, col, value });
    }
    Ok(())
}

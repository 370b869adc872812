//! Trained-parameter snapshots.
//!
//! Purpose
//! -------
//! Read every parameter of a model into a plain, ordered `name → value`
//! mapping and persist it with `bincode`. Keys are dotted paths under the
//! model name, e.g. `test.kern.kern.lengthscales`; positive
//! hyperparameters are reported in constrained form.
//!
//! Conventions
//! -----------
//! - Writes overwrite the target file and are not atomic.
//! - Relative paths resolve against the current working directory.
use crate::gpm::{
    errors::{GpmError, GpmResult},
    model::SplitGpm,
};
use log::info;
use ndarray::{Array, Array1, Array2, Array3, ArrayD, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Where the driver writes the trained parameters.
pub const DEFAULT_SNAPSHOT_PATH: &str = "../data/splitgpm.trained.pickle";

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Scalar(f64),
    /// Row-major data with its shape.
    Array { shape: Vec<usize>, data: Vec<f64> },
}

impl ParamValue {
    /// Copy any array in logical (row-major) order.
    pub fn from_array<D: Dimension>(a: &Array<f64, D>) -> Self {
        ParamValue::Array { shape: a.shape().to_vec(), data: a.iter().copied().collect() }
    }

    /// View the value as an n-d array; scalars become 0-d arrays.
    ///
    /// # Errors
    /// `ShapeMismatch` if the stored data does not fill the stored shape.
    pub fn to_array(&self) -> GpmResult<ArrayD<f64>> {
        match self {
            ParamValue::Scalar(v) => Ok(ArrayD::from_elem(IxDyn(&[]), *v)),
            ParamValue::Array { shape, data } => {
                ArrayD::from_shape_vec(IxDyn(shape), data.clone()).map_err(|_| {
                    GpmError::ShapeMismatch {
                        what: "snapshot array length",
                        expected: shape.iter().product(),
                        found: data.len(),
                    }
                })
            }
        }
    }
}

/// Ordered mapping from parameter path to value.
pub type Snapshot = BTreeMap<String, ParamValue>;

/// Read every parameter of `model` into a [`Snapshot`].
pub fn read_values(model: &SplitGpm) -> Snapshot {
    let name = model.name();
    let p = model.params();
    let (m, k) = (p.num_inducing(), p.q_sqrt.len());
    let q_sqrt = Array3::from_shape_fn((k, m, m), |(c, i, j)| p.q_sqrt[c][[i, j]]);

    let mut out = Snapshot::new();
    out.insert(format!("{name}.W1"), ParamValue::from_array(&p.w1));
    out.insert(format!("{name}.W2"), ParamValue::from_array(&p.w2));
    out.insert(format!("{name}.feature.feat.Z"), ParamValue::from_array(&column(&p.z)));
    out.insert(format!("{name}.kern.kern.variance"), ParamValue::Scalar(p.kernel_variance()));
    out.insert(format!("{name}.kern.kern.lengthscales"), ParamValue::Scalar(p.lengthscale()));
    out.insert(format!("{name}.likelihood.variance"), ParamValue::Scalar(p.noise()));
    out.insert(format!("{name}.q_mu"), ParamValue::from_array(&p.q_mu));
    out.insert(format!("{name}.q_sqrt"), ParamValue::from_array(&q_sqrt));
    out
}

/// Write `snapshot` to `path` with bincode, replacing any existing file.
///
/// # Errors
/// - `Io` if the file cannot be created or flushed.
/// - `Serialization` if encoding fails.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> GpmResult<()> {
    let file = File::create(path).map_err(|e| GpmError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, snapshot).map_err(|e| GpmError::Serialization {
        path: path.display().to_string(),
        text: e.to_string(),
    })?;
    writer.flush().map_err(|e| GpmError::io(path, e))
}

/// Read all values of `model` and save them to `path`
/// (default [`DEFAULT_SNAPSHOT_PATH`]).
///
/// # Errors
/// Same as [`save_snapshot`].
pub fn save_model(model: &SplitGpm, path: Option<&Path>) -> GpmResult<Snapshot> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SNAPSHOT_PATH));
    let snapshot = read_values(model);
    save_snapshot(&snapshot, path)?;
    info!("Saved {} parameters of '{}' to {}", snapshot.len(), model.name(), path.display());
    Ok(snapshot)
}

/// Read a snapshot written by [`save_snapshot`].
///
/// # Errors
/// - `Io` if the file cannot be opened.
/// - `Serialization` if the content is not a valid snapshot.
pub fn load_snapshot(path: &Path) -> GpmResult<Snapshot> {
    let file = File::open(path).map_err(|e| GpmError::io(path, e))?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|e| GpmError::Serialization {
        path: path.display().to_string(),
        text: e.to_string(),
    })
}

// ---- Helper methods ----

/// Inducing locations as an `M×1` matrix, one input dimension per column.
fn column(z: &Array1<f64>) -> Array2<f64> {
    z.clone().insert_axis(Axis(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpm::{
        builder::SplitGpmBuilder,
        features::{InducingPoints, SharedIndependentFeature},
        kernel::{Rbf, SharedIndependentKernel},
        session::Session,
    };
    use ndarray::array;
    use std::{env, fs, process};

    fn small_model() -> SplitGpm {
        let mut session = Session::new(0);
        let x = Array::linspace(0.0, 1.0, 4).insert_axis(Axis(1));
        let y = Array2::from_shape_fn((4, 2), |(n, g)| (n * g) as f64);
        SplitGpmBuilder::new(x, y)
            .weights(Array2::zeros((2, 1)), Array2::zeros((2, 2)))
            .kernel(SharedIndependentKernel::new(Rbf::new(0), 2).unwrap())
            .feature(SharedIndependentFeature::new(InducingPoints::linspace(0.0, 1.0, 3).unwrap()))
            .minibatch_size(2)
            .compile(&mut session)
            .unwrap()
    }

    fn temp_path(tag: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("splitgpm-{tag}-{}.bin", process::id()))
    }

    #[test]
    // Purpose
    // -------
    // Every parameter appears under its dotted key with constrained values.
    fn read_values_reports_all_parameters() {
        let model = small_model();

        let snap = read_values(&model);

        let keys: Vec<&str> = snap.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "test.W1",
                "test.W2",
                "test.feature.feat.Z",
                "test.kern.kern.lengthscales",
                "test.kern.kern.variance",
                "test.likelihood.variance",
                "test.q_mu",
                "test.q_sqrt",
            ]
        );
        assert!(matches!(snap["test.kern.kern.variance"], ParamValue::Scalar(v) if (v - 1.0).abs() < 1e-9));
        assert_eq!(
            snap["test.feature.feat.Z"],
            ParamValue::Array { shape: vec![3, 1], data: vec![0.0, 0.5, 1.0] }
        );
        assert_eq!(snap["test.q_sqrt"].to_array().unwrap().shape(), &[2, 3, 3]);
    }

    #[test]
    // Purpose
    // -------
    // A saved snapshot loads back to the same mapping and a second save
    // overwrites the file.
    fn save_then_load_round_trips_and_overwrites() {
        let model = small_model();
        let path = temp_path("roundtrip");
        fs::write(&path, b"stale contents that are not a snapshot").unwrap();

        let saved = save_model(&model, Some(&path)).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(saved, loaded);
        assert_eq!(loaded["test.W1"].to_array().unwrap(), array![[0.0], [0.0]].into_dyn());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    // Purpose
    // -------
    // Loading garbage is a serialization error, a missing file an I/O error.
    fn load_reports_bad_and_missing_files() {
        let path = temp_path("garbage");
        fs::write(&path, [0xffu8; 3]).unwrap();

        assert!(matches!(load_snapshot(&path), Err(GpmError::Serialization { .. })));
        fs::remove_file(&path).unwrap();
        assert!(matches!(load_snapshot(&path), Err(GpmError::Io { .. })));
    }
}

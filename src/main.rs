//! Train SplitGPM on the neuron data set and save the trained parameters.
//!
//! Reads `../data/neur.X.txt` and `../data/neur.Y.txt` relative to the
//! working directory and writes `../data/splitgpm.trained.pickle`. Set
//! `RUST_LOG` to change the log level (default `info`).
use anyhow::Context;
use splitgpm::gpm::{driver, TrainOptions};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = TrainOptions::default();
    let snapshot = driver::run(&opts)
        .with_context(|| format!("training SplitGPM on {}", opts.y_path.display()))?;
    log::info!("Wrote {} values to {}", snapshot.len(), opts.output_path.display());
    Ok(())
}

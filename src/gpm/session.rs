//! Per-run training context.
//!
//! A [`Session`] owns every piece of state that would otherwise be
//! process-global: the seeded random generator used for weight
//! initialization and minibatch sampling, and the record of which model is
//! currently live. One session builds one model; [`Session::reset`] returns
//! it to a freshly seeded state before the next build.
use crate::gpm::errors::{GpmError, GpmResult};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Seeded context scoped to a single training run.
#[derive(Debug, Clone)]
pub struct Session {
    seed: u64,
    rng: StdRng,
    live_model: Option<String>,
}

impl Session {
    /// Create a session whose random stream is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed, rng: StdRng::seed_from_u64(seed), live_model: None }
    }

    /// Reseed the generator and forget any previously built model.
    pub fn reset(&mut self) {
        if let Some(name) = self.live_model.take() {
            debug!("session reset drops model '{name}'");
        }
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// Seed the session was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random generator for initialization draws.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Derive an independent generator, e.g. for a model's minibatch stream.
    pub fn fork_rng(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.rng.gen())
    }

    /// Name of the model currently owned by the session, if any.
    pub fn live_model(&self) -> Option<&str> {
        self.live_model.as_deref()
    }

    /// Record `name` as the session's model.
    ///
    /// # Errors
    /// `GpmError::SessionBusy` if a model was already registered since the
    /// last reset.
    pub(crate) fn register_model(&mut self, name: &str) -> GpmResult<()> {
        if let Some(existing) = &self.live_model {
            return Err(GpmError::SessionBusy { name: existing.clone() });
        }
        self.live_model = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Reset replays the same random stream from the initial seed.
    fn reset_replays_random_stream() {
        let mut session = Session::new(7);
        let first: f64 = session.rng().gen();

        session.reset();
        let again: f64 = session.rng().gen();

        assert_eq!(first, again);
    }

    #[test]
    // Purpose
    // -------
    // A second model cannot be registered until the session is reset.
    fn one_live_model_per_session() {
        let mut session = Session::new(1);
        session.register_model("test").unwrap();

        assert_eq!(
            session.register_model("other"),
            Err(GpmError::SessionBusy { name: "test".to_string() })
        );

        session.reset();
        assert!(session.live_model().is_none());
        assert!(session.register_model("other").is_ok());
    }
}

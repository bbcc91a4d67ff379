use std::io;

use rand::RngCore;

/// A stochastic system whose performance is being estimated.
///
/// Each call to `sample` draws one result vector of `count` elements. The
/// estimator only ever consumes experiments through this trait; the system
/// itself travels to remote workers in its textual form.
pub trait Experiment: Send + Sized {
    /// The dimension of a single result vector.
    fn count(&self) -> usize;

    /// Draws one result vector into `out`, which holds exactly `count` elements.
    fn sample(&mut self, out: &mut [f64]);

    /// Seeds the internal random source for reproducible runs.
    fn seed(&mut self, seed: u64);

    /// Seeds the internal random source from another random source.
    fn seed_from<G: RngCore + ?Sized>(&mut self, rng: &mut G) {
        self.seed(rng.next_u64());
    }

    /// The operating parameter (e.g. the channel noise level).
    fn parameter(&self) -> f64;

    fn set_parameter(&mut self, parameter: f64);

    /// Serializes the system description, the operating parameter excluded.
    fn to_text(&self) -> String;

    /// Rebuilds an experiment from the output of `to_text`.
    ///
    /// # Errors
    /// Returns an `InvalidData` error if `text` does not describe an experiment.
    fn from_text(text: &str) -> io::Result<Self>;

    /// A human readable description.
    fn description(&self) -> String;
}

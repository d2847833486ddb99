use super::{CancellationFlag, Solver};
use crate::models::{Gene, SolverSettings};
use crate::services::observer::Observer;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use tracing::instrument;

pub struct SolverBuilder {
    pub(super) settings: SolverSettings,
    pub(super) prototype: Vec<Gene>,
    pub(super) observer: Option<Arc<Observer>>,
    pub(super) cancellation: CancellationFlag,
}

impl SolverBuilder {
    /// Records into a shared observer instead of a private one. A shared
    /// observer is never reset by the solver.
    pub fn with_observer(mut self, observer: Arc<Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[instrument(level = "debug", skip(self), fields(genome_length = self.prototype.len(), seed = ?self.settings.seed()))]
    pub fn build(self) -> Solver {
        let rng = match self.settings.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Solver {
            settings: self.settings,
            prototype: self.prototype,
            owns_observer: self.observer.is_none(),
            observer: self.observer.unwrap_or_default(),
            cancellation: self.cancellation,
            rng,
        }
    }
}

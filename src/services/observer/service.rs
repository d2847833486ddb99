use crate::models::{Population, Statistics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::instrument;

#[derive(Debug, Default)]
struct State {
    statistics: Statistics,
    population: Population,
    reset_at: Option<DateTime<Utc>>,
}

/// Thread-safe recorder of a run's statistics.
///
/// Every mutating call holds the same lock for its full duration, so all
/// series always have one entry per recorded generation, even when several
/// solvers share one observer.
#[derive(Debug, Default)]
pub struct Observer {
    state: Mutex<State>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry to every series. Returns `false` for an empty population.
    #[instrument(level = "debug", skip(self, population), fields(population_size = population.len()))]
    pub fn snapshot(&self, population: &Population) -> bool {
        self.state.lock().statistics.record(population)
    }

    /// Replaces the current population and records it.
    #[instrument(level = "debug", skip(self, population), fields(population_size = population.len()))]
    pub fn set_population(&self, population: Population) -> bool {
        let mut state = self.state.lock();
        let recorded = state.statistics.record(&population);
        state.population = population;
        recorded
    }

    /// Clears every series and the generation counter.
    #[instrument(level = "info", skip(self))]
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.statistics = Statistics::default();
        state.population = Population::default();
        state.reset_at = Some(Utc::now());
    }

    /// Advances the generation counter and returns the new value.
    pub fn update_generation_counter(&self) -> usize {
        let mut state = self.state.lock();
        state.statistics.generation += 1;
        state.statistics.generation
    }

    /// A consistent copy of every series.
    pub fn statistics(&self) -> Statistics {
        self.state.lock().statistics.clone()
    }

    /// Runs `f` against the statistics without copying them.
    pub fn with_statistics<T>(&self, f: impl FnOnce(&Statistics) -> T) -> T {
        f(&self.state.lock().statistics)
    }

    pub fn generation(&self) -> usize {
        self.state.lock().statistics.generation
    }

    pub fn population(&self) -> Population {
        self.state.lock().population.clone()
    }

    /// When the observer was last reset, if ever.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().reset_at
    }
}

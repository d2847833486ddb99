use super::{Individual, Population};
use tracing::instrument;

/// Clones of the `elite_size` fittest individuals, best first.
///
/// The input population is left untouched.
#[instrument(level = "debug", skip(population), fields(population_size = population.len()))]
pub fn select_top_individuals(elite_size: usize, population: &Population) -> Vec<Individual> {
    population.top(elite_size).into_iter().cloned().collect()
}

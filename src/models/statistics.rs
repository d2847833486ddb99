use super::{Individual, Population};
use serde::{Deserialize, Serialize};

/// Per-generation time series of a solver run.
///
/// Every series holds one entry per recorded generation; all of them always
/// have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub(crate) generation: usize,
    pub(crate) best_fitness: Vec<f64>,
    pub(crate) worst_fitness: Vec<f64>,
    pub(crate) average_fitness: Vec<f64>,
    pub(crate) total_fitness: Vec<f64>,
    pub(crate) diversity: Vec<usize>,
    pub(crate) fitness_std_dev: Vec<f64>,
    pub(crate) best_individuals: Vec<Individual>,
}

impl Statistics {
    /// Appends one entry to every series. Empty populations are not recorded.
    pub(crate) fn record(&mut self, population: &Population) -> bool {
        let (Some(best), Some(worst)) = (population.best(), population.worst()) else {
            return false;
        };

        self.best_fitness.push(best.fitness_value());
        self.worst_fitness.push(worst.fitness_value());
        self.average_fitness.push(population.average_fitness());
        self.total_fitness.push(population.total_fitness());
        self.diversity.push(population.diversity());
        self.fitness_std_dev.push(population.fitness_std_dev());
        self.best_individuals.push(best.clone());
        true
    }

    /// Value of the generation counter, independent of the number of records.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Number of recorded generations.
    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }

    pub fn best_fitness(&self) -> &[f64] {
        &self.best_fitness
    }

    pub fn worst_fitness(&self) -> &[f64] {
        &self.worst_fitness
    }

    pub fn average_fitness(&self) -> &[f64] {
        &self.average_fitness
    }

    pub fn total_fitness(&self) -> &[f64] {
        &self.total_fitness
    }

    pub fn diversity(&self) -> &[usize] {
        &self.diversity
    }

    pub fn fitness_std_dev(&self) -> &[f64] {
        &self.fitness_std_dev
    }

    pub fn best_individuals(&self) -> &[Individual] {
        &self.best_individuals
    }

    /// Best individual over all recorded generations.
    pub fn overall_best(&self) -> Option<&Individual> {
        self.best_individuals.iter().reduce(|best, candidate| {
            if candidate.fitness_value() > best.fitness_value() {
                candidate
            } else {
                best
            }
        })
    }

    pub fn is_consistent(&self) -> bool {
        let len = self.len();
        [
            self.worst_fitness.len(),
            self.average_fitness.len(),
            self.total_fitness.len(),
            self.diversity.len(),
            self.fitness_std_dev.len(),
            self.best_individuals.len(),
        ]
        .iter()
        .all(|&other| other == len)
    }
}

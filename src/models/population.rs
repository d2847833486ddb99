use super::Individual;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PopulationError {
    #[error("ZeroTotalFitness: fitness-proportionate probabilities are undefined when total fitness is 0")]
    ZeroTotalFitness,
}

/// The individuals under evaluation in one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl From<Vec<Individual>> for Population {
    fn from(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }
}

impl Population {
    pub fn new(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn into_individuals(self) -> Vec<Individual> {
        self.individuals
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    pub fn total_fitness(&self) -> f64 {
        self.individuals.iter().map(Individual::fitness_value).sum()
    }

    /// 0.0 for an empty population.
    pub fn average_fitness(&self) -> f64 {
        if self.individuals.is_empty() {
            return 0.0;
        }
        self.total_fitness() / self.individuals.len() as f64
    }

    /// Population standard deviation of the fitness values.
    pub fn fitness_std_dev(&self) -> f64 {
        if self.individuals.is_empty() {
            return 0.0;
        }
        let mean = self.average_fitness();
        let variance = self
            .individuals
            .iter()
            .map(|individual| (individual.fitness_value() - mean).powi(2))
            .sum::<f64>()
            / self.individuals.len() as f64;
        variance.sqrt()
    }

    /// First individual with the highest fitness.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals.iter().reduce(|best, candidate| {
            if candidate.fitness_value() > best.fitness_value() {
                candidate
            } else {
                best
            }
        })
    }

    /// First individual with the lowest fitness.
    pub fn worst(&self) -> Option<&Individual> {
        self.individuals.iter().reduce(|worst, candidate| {
            if candidate.fitness_value() < worst.fitness_value() {
                candidate
            } else {
                worst
            }
        })
    }

    /// Number of structurally distinct individuals.
    pub fn diversity(&self) -> usize {
        self.individuals
            .iter()
            .map(Individual::structural_hash)
            .collect::<HashSet<u64>>()
            .len()
    }

    /// The `k` fittest individuals, descending. Ties keep population order.
    pub fn top(&self, k: usize) -> Vec<&Individual> {
        let mut ranked: Vec<&Individual> = self.individuals.iter().collect();
        ranked.sort_by(|a, b| b.fitness_value().total_cmp(&a.fitness_value()));
        ranked.truncate(k);
        ranked
    }

    /// Assigns every individual its share of the total fitness.
    #[instrument(level = "debug", skip(self), fields(population_size = self.individuals.len()))]
    pub fn calculate_probability(&mut self) -> Result<(), PopulationError> {
        let total = self.total_fitness();
        if total == 0.0 {
            return Err(PopulationError::ZeroTotalFitness);
        }

        for individual in &mut self.individuals {
            individual.probability = individual.fitness_value() / total;
        }
        Ok(())
    }

    /// Sorts ascending by fitness and drops the lowest entries until `size`
    /// individuals remain.
    pub(crate) fn trim_to(&mut self, size: usize) {
        if self.individuals.len() <= size {
            return;
        }
        self.individuals
            .sort_by(|a, b| a.fitness_value().total_cmp(&b.fitness_value()));
        let excess = self.individuals.len() - size;
        self.individuals.drain(..excess);
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Individual;
    type IntoIter = std::slice::Iter<'a, Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::test_utilities::population_with_fitness;
    use super::*;
    use crate::models::individual::test_utilities::individual;

    #[test]
    fn it_aggregates_fitness() {
        let population = population_with_fitness(&[10.0, 20.0, 30.0, 40.0]);

        assert_eq!(population.total_fitness(), 100.0);
        assert_eq!(population.average_fitness(), 25.0);
        assert_eq!(population.best().unwrap().fitness(), Some(40.0));
        assert_eq!(population.worst().unwrap().fitness(), Some(10.0));
        assert!((population.fitness_std_dev() - 125.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn it_handles_empty_populations() {
        let population = Population::default();

        assert_eq!(population.average_fitness(), 0.0);
        assert_eq!(population.fitness_std_dev(), 0.0);
        assert_eq!(population.diversity(), 0);
        assert!(population.best().is_none());
    }

    #[test]
    fn it_counts_distinct_individuals() {
        let population: Population = vec![
            individual(&[1, 2], Some(1.0)),
            individual(&[1, 2], Some(1.0)),
            individual(&[2, 1], Some(1.0)),
            individual(&[1, 2], Some(3.0)),
        ]
        .into();

        assert_eq!(population.diversity(), 3);
        assert!(population.diversity() <= population.len());
    }

    #[test]
    fn it_ranks_top_individuals_stably() {
        let population: Population = vec![
            individual(&[0], Some(5.0)),
            individual(&[1], Some(9.0)),
            individual(&[2], Some(5.0)),
            individual(&[3], Some(1.0)),
        ]
        .into();

        let top = population.top(3);
        let values: Vec<u32> = top.iter().map(|i| i.tick_values()[0]).collect();
        assert_eq!(values, vec![1, 0, 2]);
    }

    #[test]
    fn it_calculates_probabilities() {
        let mut population = population_with_fitness(&[1.0, 3.0]);
        population.calculate_probability().unwrap();

        assert_eq!(population.individuals()[0].probability(), 0.25);
        assert_eq!(population.individuals()[1].probability(), 0.75);
    }

    #[test]
    fn it_refuses_probabilities_for_zero_total_fitness() {
        let mut population = population_with_fitness(&[0.0, 0.0]);
        assert_eq!(
            population.calculate_probability(),
            Err(PopulationError::ZeroTotalFitness)
        );
    }

    #[test]
    fn it_trims_the_lowest_fitness() {
        let mut population = population_with_fitness(&[3.0, 1.0, 4.0, 2.0]);
        population.trim_to(2);

        let remaining: Vec<f64> = population
            .individuals()
            .iter()
            .map(Individual::fitness_value)
            .collect();
        assert_eq!(remaining, vec![3.0, 4.0]);
    }
}

//! Mating pool selection strategies.
//!
//! A selection strategy samples `number_of_selections` individuals from a
//! population. Sampling is with replacement: the same individual may appear
//! in the pool more than once.
//!
//! # Selection Methods
//!
//! ## Tournament Selection
//!
//! Draws `size` individuals uniformly at random and keeps the fittest. Larger
//! tournaments increase selection pressure.
//!
//! ## Roulette Wheel Selection
//!
//! Chooses individuals with probability proportional to their fitness. Each
//! spin is independent, so a lucky individual can fill the whole pool.
//!
//! ## Pool Selection
//!
//! Normalizes fitness into per-individual probabilities first and then samples
//! against the cumulative probability. Requires `1 <= number_of_selections <=
//! population size`.
//!
//! ## Stochastic Universal Sampling
//!
//! One random offset, then evenly spaced pointers over the cumulative fitness.
//! Gives every individual a share close to its expected value.
//!
//! ## Isotropic and Exclusive Selection
//!
//! Kept for older settings files. Isotropic picks uniformly at random,
//! Exclusive cycles deterministically through the top percentage.
//!
//! # Examples
//!
//! ```rust
//! use fx_ga_solver::models::{SelectionStrategy, TournamentSelection};
//!
//! let tournament = SelectionStrategy::Tournament(TournamentSelection::new(3)?);
//! let roulette = SelectionStrategy::roulette_wheel();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use super::{Individual, Population, PopulationError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Errors that can occur while drawing a mating pool.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SelectionError {
    /// The population holds no individuals to select from.
    #[error("EmptyPopulation: cannot select from an empty population")]
    EmptyPopulation,

    /// Tournament size must be at least 1.
    #[error("InvalidTournamentSize: tournament size must be > 0, got {0}")]
    InvalidTournamentSize(usize),

    /// Exclusive selection needs a percentage in (0.0, 1.0].
    #[error("InvalidPercentage: percentage must be within (0.0, 1.0], got {0}")]
    InvalidPercentage(f64),

    /// Pool selection draws between 1 and the population size.
    #[error(
        "InvalidNumberOfSelections: must be within [1, {population_size}], got {number_of_selections}"
    )]
    InvalidNumberOfSelections {
        number_of_selections: usize,
        population_size: usize,
    },

    /// Proportional selection needs a finite, positive total fitness.
    ///
    /// A population where every fitness is 0.0 has no proportions to sample
    /// from, and a NaN or infinite score leaves no range to spin over. Both
    /// are hard failures.
    #[error("InvalidTotalFitness: proportional selection requires a finite total fitness > 0, got {0}")]
    InvalidTotalFitness(f64),

    #[error("Population error: {0}")]
    Population(#[from] PopulationError),

    /// Internal roulette wheel failure; indicates a bug in the wheel.
    #[error("Internal error: roulette wheel failed to select an individual")]
    RouletteSelectionFailed,
}

/// Draws a mating pool from a population.
pub trait Selection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError>;
}

fn ensure_not_empty(population: &Population) -> Result<(), SelectionError> {
    if population.is_empty() {
        return Err(SelectionError::EmptyPopulation);
    }
    Ok(())
}

fn positive_total_fitness(population: &Population) -> Result<f64, SelectionError> {
    let total = population.total_fitness();
    if !total.is_finite() || total <= 0.0 {
        return Err(SelectionError::InvalidTotalFitness(total));
    }
    Ok(total)
}

/// Performs a single roulette wheel spin to select an individual index.
fn spin_roulette<R: Rng + ?Sized>(
    individuals: &[Individual],
    total_fitness: f64,
    rng: &mut R,
) -> Result<usize, SelectionError> {
    let spin = rng.random_range(0.0..total_fitness);
    let mut cumulative = 0.0;

    for (index, individual) in individuals.iter().enumerate() {
        cumulative += individual.fitness_value();
        if cumulative >= spin {
            return Ok(index);
        }
    }

    // This should never happen with a proper total_fitness calculation
    Err(SelectionError::RouletteSelectionFailed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSelection {
    size: usize,
}

impl TournamentSelection {
    pub fn new(size: usize) -> Result<Self, SelectionError> {
        let selection = Self { size };
        selection.validate()?;
        Ok(selection)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn validate(&self) -> Result<(), SelectionError> {
        if self.size == 0 {
            return Err(SelectionError::InvalidTournamentSize(self.size));
        }
        Ok(())
    }
}

impl Selection for TournamentSelection {
    #[instrument(level = "debug", skip(self, population, rng), fields(tournament_size = self.size, population_size = population.len()))]
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        self.validate()?;
        ensure_not_empty(population)?;

        let individuals = population.individuals();
        let mut selected = Vec::with_capacity(number_of_selections);

        for _ in 0..number_of_selections {
            let mut winner = &individuals[rng.random_range(0..individuals.len())];
            for _ in 1..self.size {
                let challenger = &individuals[rng.random_range(0..individuals.len())];
                if challenger.fitness_value() > winner.fitness_value() {
                    winner = challenger;
                }
            }
            selected.push(winner.clone());
        }

        Ok(selected)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouletteWheelSelection {}

impl Selection for RouletteWheelSelection {
    #[instrument(level = "debug", skip(self, population, rng), fields(population_size = population.len()))]
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        ensure_not_empty(population)?;
        let total_fitness = positive_total_fitness(population)?;

        let individuals = population.individuals();
        (0..number_of_selections)
            .map(|_| {
                spin_roulette(individuals, total_fitness, rng).map(|i| individuals[i].clone())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSelection {}

impl Selection for PoolSelection {
    #[instrument(level = "debug", skip(self, population, rng), fields(population_size = population.len()))]
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        if number_of_selections < 1 || number_of_selections > population.len() {
            return Err(SelectionError::InvalidNumberOfSelections {
                number_of_selections,
                population_size: population.len(),
            });
        }

        let mut weighted = population.clone();
        weighted.calculate_probability()?;

        let individuals = weighted.individuals();
        let mut selected = Vec::with_capacity(number_of_selections);
        for _ in 0..number_of_selections {
            let draw: f64 = rng.random_range(0.0..1.0);
            let mut cumulative = 0.0;
            // Rounding can leave the cumulative sum just under 1.0
            let mut chosen = individuals.len() - 1;
            for (index, individual) in individuals.iter().enumerate() {
                cumulative += individual.probability();
                if cumulative >= draw {
                    chosen = index;
                    break;
                }
            }
            selected.push(individuals[chosen].clone());
        }

        Ok(selected)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochasticUniversalSampling {}

impl Selection for StochasticUniversalSampling {
    #[instrument(level = "debug", skip(self, population, rng), fields(population_size = population.len()))]
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        ensure_not_empty(population)?;
        let total_fitness = positive_total_fitness(population)?;
        if number_of_selections == 0 {
            return Ok(Vec::new());
        }

        let spacing = total_fitness / number_of_selections as f64;
        let start = rng.random_range(0.0..spacing);

        let individuals = population.individuals();
        let mut selected = Vec::with_capacity(number_of_selections);
        let mut index = 0;
        let mut cumulative = individuals[0].fitness_value();

        for pointer in (0..number_of_selections).map(|i| start + i as f64 * spacing) {
            while cumulative < pointer && index < individuals.len() - 1 {
                index += 1;
                cumulative += individuals[index].fitness_value();
            }
            selected.push(individuals[index].clone());
        }

        Ok(selected)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsotropicSelection {}

impl Selection for IsotropicSelection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        ensure_not_empty(population)?;

        let individuals = population.individuals();
        Ok((0..number_of_selections)
            .map(|_| individuals[rng.random_range(0..individuals.len())].clone())
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusiveSelection {
    percentage: f64,
}

impl ExclusiveSelection {
    pub fn new(percentage: f64) -> Result<Self, SelectionError> {
        let selection = Self { percentage };
        selection.validate()?;
        Ok(selection)
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    fn validate(&self) -> Result<(), SelectionError> {
        if !(self.percentage > 0.0 && self.percentage <= 1.0) {
            return Err(SelectionError::InvalidPercentage(self.percentage));
        }
        Ok(())
    }
}

impl Selection for ExclusiveSelection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        _rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        self.validate()?;
        ensure_not_empty(population)?;

        let count = ((population.len() as f64 * self.percentage).ceil() as usize).max(1);
        let elite = population.top(count);

        Ok(elite
            .into_iter()
            .cycle()
            .take(number_of_selections)
            .cloned()
            .collect())
    }
}

/// Selection strategy as stored in solver settings.
///
/// Encoded as `{"kind": "<Variant>", "value": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum SelectionStrategy {
    Tournament(TournamentSelection),
    RouletteWheel(RouletteWheelSelection),
    Pool(PoolSelection),
    StochasticUniversalSampling(StochasticUniversalSampling),
    Isotropic(IsotropicSelection),
    Exclusive(ExclusiveSelection),
}

impl SelectionStrategy {
    pub fn tournament(size: usize) -> Result<Self, SelectionError> {
        Ok(Self::Tournament(TournamentSelection::new(size)?))
    }

    pub fn roulette_wheel() -> Self {
        Self::RouletteWheel(RouletteWheelSelection::default())
    }

    pub fn pool() -> Self {
        Self::Pool(PoolSelection::default())
    }

    pub fn stochastic_universal_sampling() -> Self {
        Self::StochasticUniversalSampling(StochasticUniversalSampling::default())
    }

    pub(crate) fn validate(&self) -> Result<(), SelectionError> {
        match self {
            Self::Tournament(selection) => selection.validate(),
            Self::Exclusive(selection) => selection.validate(),
            _ => Ok(()),
        }
    }
}

impl Selection for SelectionStrategy {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        number_of_selections: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual>, SelectionError> {
        match self {
            Self::Tournament(s) => s.select(population, number_of_selections, rng),
            Self::RouletteWheel(s) => s.select(population, number_of_selections, rng),
            Self::Pool(s) => s.select(population, number_of_selections, rng),
            Self::StochasticUniversalSampling(s) => {
                s.select(population, number_of_selections, rng)
            }
            Self::Isotropic(s) => s.select(population, number_of_selections, rng),
            Self::Exclusive(s) => s.select(population, number_of_selections, rng),
        }
    }
}

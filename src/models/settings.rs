use super::{
    CrossoverError, CrossoverStrategy, MutationError, MutationStrategy, PairingError,
    PairingStrategy, SelectionError, SelectionStrategy, TerminationError, TerminationStrategy,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("population_size must be > 0")]
    ZeroPopulationSize,
    #[error("max_generations must be > 0")]
    ZeroMaxGenerations,
    #[error("elite_size must be <= population_size. elite_size={elite_size}, population_size={population_size}")]
    EliteSizeExceedsPopulation {
        elite_size: usize,
        population_size: usize,
    },
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    #[error("Crossover error: {0}")]
    Crossover(#[from] CrossoverError),
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),
    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),
    #[error("Termination error: {0}")]
    Termination(#[from] TerminationError),
    #[error("Could not (de)serialize settings: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Validated configuration of one solver run.
///
/// Binds one strategy of each kind to the population, generation and elite
/// sizes. Deserialization runs the same validation as [`SolverSettings::new`].
///
/// # Examples
///
/// ```rust
/// use fx_ga_solver::models::{
///     CrossoverStrategy, DistanceMetric, MutationStrategy, PairingStrategy, SelectionStrategy,
///     SolverSettings, TerminationStrategy,
/// };
///
/// let settings = SolverSettings::new(
///     SelectionStrategy::tournament(3)?,
///     CrossoverStrategy::two_point(0.8)?,
///     MutationStrategy::random(0.05)?,
///     PairingStrategy::in_breeding(0.0, DistanceMetric::Euclidean)?,
///     TerminationStrategy::progress_convergence(5, 0.01)?,
///     50,
///     100,
///     2,
/// )?;
///
/// let json = settings.to_json()?;
/// assert_eq!(SolverSettings::from_json(&json)?, settings);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SettingsRecord")]
pub struct SolverSettings {
    pub(crate) selection: SelectionStrategy,
    pub(crate) crossover: CrossoverStrategy,
    pub(crate) mutation: MutationStrategy,
    pub(crate) pairing: PairingStrategy,
    pub(crate) termination: TerminationStrategy,
    pub(crate) population_size: usize,
    pub(crate) max_generations: usize,
    pub(crate) elite_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) seed: Option<u64>,
}

impl SolverSettings {
    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "debug", skip(selection, crossover, mutation, pairing, termination))]
    pub fn new(
        selection: SelectionStrategy,
        crossover: CrossoverStrategy,
        mutation: MutationStrategy,
        pairing: PairingStrategy,
        termination: TerminationStrategy,
        population_size: usize,
        max_generations: usize,
        elite_size: usize,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            selection,
            crossover,
            mutation,
            pairing,
            termination,
            population_size,
            max_generations,
            elite_size,
            seed: None,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Seeds the run's random number generator for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn selection(&self) -> &SelectionStrategy {
        &self.selection
    }

    pub fn crossover(&self) -> &CrossoverStrategy {
        &self.crossover
    }

    pub fn mutation(&self) -> &MutationStrategy {
        &self.mutation
    }

    pub fn pairing(&self) -> &PairingStrategy {
        &self.pairing
    }

    pub fn termination(&self) -> &TerminationStrategy {
        &self.termination
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn max_generations(&self) -> usize {
        self.max_generations
    }

    pub fn elite_size(&self) -> usize {
        self.elite_size
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.population_size == 0 {
            return Err(SettingsError::ZeroPopulationSize);
        }
        if self.max_generations == 0 {
            return Err(SettingsError::ZeroMaxGenerations);
        }
        if self.elite_size > self.population_size {
            return Err(SettingsError::EliteSizeExceedsPopulation {
                elite_size: self.elite_size,
                population_size: self.population_size,
            });
        }

        self.selection.validate()?;
        self.crossover.validate()?;
        self.mutation.validate()?;
        self.pairing.validate()?;
        self.termination.validate()?;
        Ok(())
    }
}

/// Unvalidated wire shape of [`SolverSettings`].
#[derive(Deserialize)]
struct SettingsRecord {
    selection: SelectionStrategy,
    crossover: CrossoverStrategy,
    mutation: MutationStrategy,
    pairing: PairingStrategy,
    termination: TerminationStrategy,
    population_size: usize,
    max_generations: usize,
    elite_size: usize,
    #[serde(default)]
    seed: Option<u64>,
}

impl TryFrom<SettingsRecord> for SolverSettings {
    type Error = SettingsError;

    fn try_from(record: SettingsRecord) -> Result<Self, Self::Error> {
        let settings = Self {
            selection: record.selection,
            crossover: record.crossover,
            mutation: record.mutation,
            pairing: record.pairing,
            termination: record.termination,
            population_size: record.population_size,
            max_generations: record.max_generations,
            elite_size: record.elite_size,
            seed: record.seed,
        };
        settings.validate()?;
        Ok(settings)
    }
}

mod crossover;
mod elitism;
mod evaluator;
mod gene;
mod individual;
mod mutation;
mod pairing;
mod population;
mod selection;
mod settings;
mod statistics;
mod termination;

pub use crossover::{
    Crossover, CrossoverError, CrossoverStrategy, SinglePointCrossover, TwoPointCrossover,
};
pub use elitism::select_top_individuals;
pub use evaluator::{Evaluator, GeneRegistry};
pub use gene::{Gene, GeneError, GeneSlot};
pub use individual::{Assignment, Individual};
pub use mutation::{
    FixedValueMutation, Mutation, MutationError, MutationStrategy, PercentageMutation,
    RandomMutation,
};
pub use pairing::{DistanceMetric, InBreedingPairing, Pairing, PairingError, PairingStrategy};
pub use population::{Population, PopulationError};
pub use selection::{
    ExclusiveSelection, IsotropicSelection, PoolSelection, RouletteWheelSelection, Selection,
    SelectionError, SelectionStrategy, StochasticUniversalSampling, TournamentSelection,
};
pub use settings::{SettingsError, SolverSettings};
pub use statistics::Statistics;
pub use termination::{
    MaxGenerationsTermination, PopulationDiversityTermination, ProgressConvergenceTermination,
    Termination, TerminationError, TerminationStrategy,
};

#[cfg(test)]
pub(crate) use individual::test_utilities as individual_test_utilities;
#[cfg(test)]
pub(crate) use settings::test_utilities as settings_test_utilities;

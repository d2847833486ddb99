use crate::models::{CrossoverError, GeneError, MutationError, PairingError, SelectionError};

/// Errors that abort a solver run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SelectionError: {0}")]
    SelectionError(#[from] SelectionError),
    #[error("CrossoverError: {0}")]
    CrossoverError(#[from] CrossoverError),
    #[error("MutationError: {0}")]
    MutationError(#[from] MutationError),
    #[error("PairingError: {0}")]
    PairingError(#[from] PairingError),
    #[error("GeneError: {0}")]
    GeneError(#[from] GeneError),
    #[error("EvaluationError: {0}")]
    EvaluationError(anyhow::Error),
    #[error("NonFiniteFitness: the evaluator returned {0}")]
    NonFiniteFitness(f64),
    #[error("RegistryError: {0}")]
    RegistryError(anyhow::Error),
    #[error("EmptyGenome: the prototype must contain at least one gene")]
    EmptyGenome,
    #[error("EmptyPopulation: no individual left to commit")]
    EmptyPopulation,
}

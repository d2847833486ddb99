use super::Individual;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PairingError {
    #[error("in_breeding_factor must be between -1.0 and 1.0, got {0}")]
    FactorOutOfRange(f64),
    #[error("GenomeLengthMismatch: cannot measure distance between genomes of length {lhs} and {rhs}")]
    GenomeLengthMismatch { lhs: usize, rhs: usize },
}

/// Genomic distance over tick values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    pub fn distance(&self, lhs: &Individual, rhs: &Individual) -> Result<f64, PairingError> {
        let (lhs_len, rhs_len) = (lhs.genes().len(), rhs.genes().len());
        if lhs_len != rhs_len {
            return Err(PairingError::GenomeLengthMismatch {
                lhs: lhs_len,
                rhs: rhs_len,
            });
        }

        let deltas = lhs
            .genes()
            .iter()
            .zip(rhs.genes())
            .map(|(a, b)| f64::from(a.tick_value()) - f64::from(b.tick_value()));

        Ok(match self {
            Self::Euclidean => deltas.map(|d| d * d).sum::<f64>().sqrt(),
            Self::Manhattan => deltas.map(f64::abs).sum(),
        })
    }
}

/// Forms couples out of a mating pool.
pub trait Pairing {
    fn pair_individuals(
        &self,
        selected: &[Individual],
    ) -> Result<Vec<(Individual, Individual)>, PairingError>;
}

/// Picks a mate for every individual by genomic distance.
///
/// Candidates are ranked from closest to most distant. An in-breeding factor
/// of -1.0 picks the closest, 1.0 the most distant and 0.0 the median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InBreedingPairing {
    in_breeding_factor: f64,
    metric: DistanceMetric,
}

impl InBreedingPairing {
    pub fn new(in_breeding_factor: f64, metric: DistanceMetric) -> Result<Self, PairingError> {
        let pairing = Self {
            in_breeding_factor,
            metric,
        };
        pairing.validate()?;
        Ok(pairing)
    }

    pub fn in_breeding_factor(&self) -> f64 {
        self.in_breeding_factor
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn validate(&self) -> Result<(), PairingError> {
        if !(-1.0..=1.0).contains(&self.in_breeding_factor) {
            return Err(PairingError::FactorOutOfRange(self.in_breeding_factor));
        }
        Ok(())
    }

    /// Position of the mate within `candidates` ranked candidates.
    fn mate_rank(&self, candidates: usize) -> usize {
        let position = (self.in_breeding_factor + 1.0) / 2.0 * (candidates - 1) as f64;
        (position.round() as usize).min(candidates - 1)
    }
}

impl Pairing for InBreedingPairing {
    #[instrument(level = "debug", skip(self, selected), fields(in_breeding_factor = self.in_breeding_factor, metric = ?self.metric, pool_size = selected.len()))]
    fn pair_individuals(
        &self,
        selected: &[Individual],
    ) -> Result<Vec<(Individual, Individual)>, PairingError> {
        let mut couples = Vec::with_capacity(selected.len());

        for (index, individual) in selected.iter().enumerate() {
            let mut ranked = Vec::with_capacity(selected.len().saturating_sub(1));
            for (other_index, other) in selected.iter().enumerate() {
                if other_index != index {
                    ranked.push((self.metric.distance(individual, other)?, other_index));
                }
            }

            // A lone individual mates with itself
            let mate = if ranked.is_empty() {
                index
            } else {
                ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
                ranked[self.mate_rank(ranked.len())].1
            };

            couples.push((individual.clone(), selected[mate].clone()));
        }

        Ok(couples)
    }
}

/// Pairing strategy as stored in solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PairingStrategy {
    InBreeding(InBreedingPairing),
}

impl PairingStrategy {
    pub fn in_breeding(
        in_breeding_factor: f64,
        metric: DistanceMetric,
    ) -> Result<Self, PairingError> {
        Ok(Self::InBreeding(InBreedingPairing::new(
            in_breeding_factor,
            metric,
        )?))
    }

    pub(crate) fn validate(&self) -> Result<(), PairingError> {
        match self {
            Self::InBreeding(pairing) => pairing.validate(),
        }
    }
}

impl Pairing for PairingStrategy {
    fn pair_individuals(
        &self,
        selected: &[Individual],
    ) -> Result<Vec<(Individual, Individual)>, PairingError> {
        match self {
            Self::InBreeding(pairing) => pairing.pair_individuals(selected),
        }
    }
}

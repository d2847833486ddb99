use super::{Gene, Individual};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of times two-point crossover redraws its second cut point when it
/// lands on the first.
const MAX_CUT_POINT_ATTEMPTS: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CrossoverError {
    #[error("crossover rate must be between 0.0 and 1.0, got {0}")]
    RateOutOfRange(f64),
    #[error("GenomeLengthMismatch: parents must have equal genome length, got {lhs} and {rhs}")]
    GenomeLengthMismatch { lhs: usize, rhs: usize },
    #[error("GenomeTooShort: crossover requires at least 2 genes, got {0}")]
    GenomeTooShort(usize),
    #[error("InvalidCutPoints: cut points must satisfy 1 <= first <= second < {length}, got ({first}, {second})")]
    InvalidCutPoints {
        first: usize,
        second: usize,
        length: usize,
    },
}

/// Recombines two parents into a pair of children.
///
/// The crossover rate is read by the solver to decide whether a couple is
/// recombined at all; `crossover` itself always recombines.
pub trait Crossover {
    fn rate(&self) -> f64;

    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Individual,
        parent2: &Individual,
        rng: &mut R,
    ) -> Result<(Individual, Individual), CrossoverError>;
}

fn validate_rate(rate: f64) -> Result<(), CrossoverError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(CrossoverError::RateOutOfRange(rate));
    }
    Ok(())
}

fn checked_length(lhs: &Individual, rhs: &Individual) -> Result<usize, CrossoverError> {
    let (lhs_len, rhs_len) = (lhs.genes().len(), rhs.genes().len());
    if lhs_len != rhs_len {
        return Err(CrossoverError::GenomeLengthMismatch {
            lhs: lhs_len,
            rhs: rhs_len,
        });
    }
    if lhs_len < 2 {
        return Err(CrossoverError::GenomeTooShort(lhs_len));
    }
    Ok(lhs_len)
}

/// Builds both children, taking index `i` from the opposite parent whenever
/// `swap(i)` holds.
fn recombine(
    lhs: &Individual,
    rhs: &Individual,
    swap: impl Fn(usize) -> bool,
) -> (Individual, Individual) {
    let (mut first, mut second): (Vec<Gene>, Vec<Gene>) = (Vec::new(), Vec::new());

    for (index, (lhs_gene, rhs_gene)) in lhs.genes().iter().zip(rhs.genes()).enumerate() {
        if swap(index) {
            first.push(rhs_gene.clone());
            second.push(lhs_gene.clone());
        } else {
            first.push(lhs_gene.clone());
            second.push(rhs_gene.clone());
        }
    }

    (
        Individual::new(first, lhs.generation()),
        Individual::new(second, rhs.generation()),
    )
}

/// Cuts both genomes at one point and swaps the tails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePointCrossover {
    rate: f64,
}

impl SinglePointCrossover {
    pub fn new(rate: f64) -> Result<Self, CrossoverError> {
        validate_rate(rate)?;
        Ok(Self { rate })
    }

    /// Genes `[0, point)` come from the own parent, `[point, len)` from the other.
    #[instrument(level = "debug", skip(lhs, rhs), fields(genome_length = lhs.genes().len()))]
    pub fn crossover_at(
        lhs: &Individual,
        rhs: &Individual,
        point: usize,
    ) -> Result<(Individual, Individual), CrossoverError> {
        let length = checked_length(lhs, rhs)?;
        if point < 1 || point >= length {
            return Err(CrossoverError::InvalidCutPoints {
                first: point,
                second: point,
                length,
            });
        }

        Ok(recombine(lhs, rhs, |index| index >= point))
    }
}

impl Crossover for SinglePointCrossover {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Individual,
        parent2: &Individual,
        rng: &mut R,
    ) -> Result<(Individual, Individual), CrossoverError> {
        let length = checked_length(parent1, parent2)?;
        let point = rng.random_range(1..length); // Cut point
        Self::crossover_at(parent1, parent2, point)
    }
}

/// Cuts both genomes at two points and swaps the middle segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoPointCrossover {
    rate: f64,
}

impl TwoPointCrossover {
    pub fn new(rate: f64) -> Result<Self, CrossoverError> {
        validate_rate(rate)?;
        Ok(Self { rate })
    }

    /// Swaps the inclusive segment `[first, second]` between the parents.
    #[instrument(level = "debug", skip(lhs, rhs), fields(genome_length = lhs.genes().len()))]
    pub fn crossover_at(
        lhs: &Individual,
        rhs: &Individual,
        first: usize,
        second: usize,
    ) -> Result<(Individual, Individual), CrossoverError> {
        let length = checked_length(lhs, rhs)?;
        if first < 1 || first > second || second >= length {
            return Err(CrossoverError::InvalidCutPoints {
                first,
                second,
                length,
            });
        }

        Ok(recombine(lhs, rhs, |index| (first..=second).contains(&index)))
    }
}

impl Crossover for TwoPointCrossover {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Individual,
        parent2: &Individual,
        rng: &mut R,
    ) -> Result<(Individual, Individual), CrossoverError> {
        let length = checked_length(parent1, parent2)?;

        let first = rng.random_range(1..length);
        let mut second = rng.random_range(1..length);
        let mut attempts = 1;
        while second == first && attempts < MAX_CUT_POINT_ATTEMPTS {
            second = rng.random_range(1..length);
            attempts += 1;
        }
        if second == first {
            tracing::warn!(
                cut_point = first,
                genome_length = length,
                "Cut points coincide after {MAX_CUT_POINT_ATTEMPTS} attempts"
            );
        }

        Self::crossover_at(parent1, parent2, first.min(second), first.max(second))
    }
}

/// Crossover strategy as stored in solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CrossoverStrategy {
    SinglePoint(SinglePointCrossover),
    TwoPoint(TwoPointCrossover),
}

impl CrossoverStrategy {
    pub fn single_point(rate: f64) -> Result<Self, CrossoverError> {
        Ok(Self::SinglePoint(SinglePointCrossover::new(rate)?))
    }

    pub fn two_point(rate: f64) -> Result<Self, CrossoverError> {
        Ok(Self::TwoPoint(TwoPointCrossover::new(rate)?))
    }

    pub(crate) fn validate(&self) -> Result<(), CrossoverError> {
        validate_rate(self.rate())
    }
}

impl Crossover for CrossoverStrategy {
    fn rate(&self) -> f64 {
        match self {
            Self::SinglePoint(crossover) => crossover.rate(),
            Self::TwoPoint(crossover) => crossover.rate(),
        }
    }

    #[instrument(level = "debug", skip(self, parent1, parent2, rng), fields(crossover_type = ?self, genome_length = parent1.genes().len()))]
    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Individual,
        parent2: &Individual,
        rng: &mut R,
    ) -> Result<(Individual, Individual), CrossoverError> {
        match self {
            Self::SinglePoint(crossover) => crossover.crossover(parent1, parent2, rng),
            Self::TwoPoint(crossover) => crossover.crossover(parent1, parent2, rng),
        }
    }
}

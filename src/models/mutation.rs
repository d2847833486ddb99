use super::{Gene, GeneError, Individual};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MutationError {
    #[error("mutation_rate must be between 0.0 and 1.0, got: {0}")]
    RateOutOfRange(f64),
    #[error("percentage must be between 0.0 and 1.0, got: {0}")]
    PercentageOutOfRange(f64),
    #[error("Gene error: {0}")]
    Gene(#[from] GeneError),
}

fn validate_rate(rate: f64) -> Result<(), MutationError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(MutationError::RateOutOfRange(rate));
    }
    Ok(())
}

/// Perturbs the tick values of an individual in place.
///
/// Every gene is mutated independently with probability [`Mutation::rate`],
/// and the result always stays within `[0, tick_count]`.
pub trait Mutation {
    fn rate(&self) -> f64;

    /// The new tick value for a gene that was chosen for mutation.
    fn mutated_value<R: Rng + ?Sized>(&self, gene: &Gene, rng: &mut R) -> u32;

    #[instrument(level = "debug", skip(self, individual, rng), fields(rate = self.rate(), genome_length = individual.genes().len()))]
    fn mutate<R: Rng + ?Sized>(
        &self,
        individual: &mut Individual,
        rng: &mut R,
    ) -> Result<(), MutationError> {
        let rate = self.rate();
        for gene in individual.genes_mut() {
            // Should we mutate this gene?
            if rng.random_bool(rate) {
                let value = self.mutated_value(gene, rng);
                gene.mutate_value(value)?;
            }
        }
        Ok(())
    }
}

/// Redraws `offset` until `current + offset` lands in `[0, tick_count]`.
fn perturb_within_bounds<R: Rng + ?Sized>(
    gene: &Gene,
    rng: &mut R,
    mut offset: impl FnMut(&mut R) -> i64,
) -> u32 {
    let current = i64::from(gene.tick_value());
    let upper = i64::from(gene.tick_count());
    loop {
        let candidate = current + offset(&mut *rng);
        if (0..=upper).contains(&candidate) {
            return candidate as u32;
        }
    }
}

/// Replaces the tick value with a uniform draw from `[0, tick_count]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomMutation {
    rate: f64,
}

impl RandomMutation {
    pub fn new(rate: f64) -> Result<Self, MutationError> {
        validate_rate(rate)?;
        Ok(Self { rate })
    }
}

impl Mutation for RandomMutation {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn mutated_value<R: Rng + ?Sized>(&self, gene: &Gene, rng: &mut R) -> u32 {
        rng.random_range(0..=gene.tick_count())
    }
}

/// Shifts the tick value by a uniform integer in `[-value, value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedValueMutation {
    rate: f64,
    value: u32,
}

impl FixedValueMutation {
    pub fn new(rate: f64, value: u32) -> Result<Self, MutationError> {
        validate_rate(rate)?;
        Ok(Self { rate, value })
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl Mutation for FixedValueMutation {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn mutated_value<R: Rng + ?Sized>(&self, gene: &Gene, rng: &mut R) -> u32 {
        let span = i64::from(self.value);
        perturb_within_bounds(gene, rng, |rng| rng.random_range(-span..=span))
    }
}

/// Shifts the tick value by a uniform fraction of itself, within
/// `[-percentage, percentage]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageMutation {
    rate: f64,
    percentage: f64,
}

impl PercentageMutation {
    pub fn new(rate: f64, percentage: f64) -> Result<Self, MutationError> {
        validate_rate(rate)?;
        Self::validate_percentage(percentage)?;
        Ok(Self { rate, percentage })
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    fn validate_percentage(percentage: f64) -> Result<(), MutationError> {
        if !(0.0..=1.0).contains(&percentage) {
            return Err(MutationError::PercentageOutOfRange(percentage));
        }
        Ok(())
    }
}

impl Mutation for PercentageMutation {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn mutated_value<R: Rng + ?Sized>(&self, gene: &Gene, rng: &mut R) -> u32 {
        let current = f64::from(gene.tick_value());
        let percentage = self.percentage;
        perturb_within_bounds(gene, rng, |rng| {
            let fraction = rng.random_range(-percentage..=percentage);
            (current * fraction).round() as i64
        })
    }
}

/// Mutation strategy as stored in solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum MutationStrategy {
    Random(RandomMutation),
    FixedValue(FixedValueMutation),
    Percentage(PercentageMutation),
}

impl MutationStrategy {
    pub fn random(rate: f64) -> Result<Self, MutationError> {
        Ok(Self::Random(RandomMutation::new(rate)?))
    }

    pub fn fixed_value(rate: f64, value: u32) -> Result<Self, MutationError> {
        Ok(Self::FixedValue(FixedValueMutation::new(rate, value)?))
    }

    pub fn percentage(rate: f64, percentage: f64) -> Result<Self, MutationError> {
        Ok(Self::Percentage(PercentageMutation::new(rate, percentage)?))
    }

    pub(crate) fn validate(&self) -> Result<(), MutationError> {
        validate_rate(self.rate())?;
        if let Self::Percentage(mutation) = self {
            PercentageMutation::validate_percentage(mutation.percentage)?;
        }
        Ok(())
    }
}

impl Mutation for MutationStrategy {
    fn rate(&self) -> f64 {
        match self {
            Self::Random(mutation) => mutation.rate(),
            Self::FixedValue(mutation) => mutation.rate(),
            Self::Percentage(mutation) => mutation.rate(),
        }
    }

    fn mutated_value<R: Rng + ?Sized>(&self, gene: &Gene, rng: &mut R) -> u32 {
        match self {
            Self::Random(mutation) => mutation.mutated_value(gene, rng),
            Self::FixedValue(mutation) => mutation.mutated_value(gene, rng),
            Self::Percentage(mutation) => mutation.mutated_value(gene, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::individual::test_utilities::individual;
    use rand::{SeedableRng, rngs::StdRng};

    fn strategies() -> Vec<MutationStrategy> {
        vec![
            MutationStrategy::random(1.0).unwrap(),
            MutationStrategy::fixed_value(1.0, 3).unwrap(),
            MutationStrategy::percentage(1.0, 0.5).unwrap(),
        ]
    }

    #[test]
    fn it_keeps_tick_values_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);

        for strategy in strategies() {
            for _ in 0..200 {
                let mut subject = individual(&[0, 1, 5, 9, 10], None);
                strategy.mutate(&mut subject, &mut rng).unwrap();
                for gene in subject.genes() {
                    assert!(gene.tick_value() <= gene.tick_count());
                }
            }
        }
    }

    #[test]
    fn it_respects_zero_mutation_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let strategies = vec![
            MutationStrategy::random(0.0).unwrap(),
            MutationStrategy::fixed_value(0.0, 5).unwrap(),
            MutationStrategy::percentage(0.0, 1.0).unwrap(),
        ];

        for strategy in strategies {
            let mut subject = individual(&[3, 4, 5], None);
            strategy.mutate(&mut subject, &mut rng).unwrap();
            assert_eq!(subject.tick_values(), vec![3, 4, 5]);
        }
    }

    #[test]
    fn it_changes_values_with_full_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = MutationStrategy::random(1.0).unwrap();

        let mut changed = false;
        for _ in 0..10 {
            let mut subject = individual(&[5, 5, 5, 5], None);
            strategy.mutate(&mut subject, &mut rng).unwrap();
            changed |= subject.tick_values() != vec![5, 5, 5, 5];
        }
        assert!(changed);
    }

    #[test]
    fn it_bounds_fixed_value_steps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mutation = FixedValueMutation::new(1.0, 2).unwrap();

        for _ in 0..100 {
            let mut subject = individual(&[5], None);
            mutation.mutate(&mut subject, &mut rng).unwrap();
            let value = subject.tick_values()[0];
            assert!((3..=7).contains(&value));
        }
    }

    #[test]
    fn it_scales_percentage_steps_with_the_current_value() {
        let mut rng = StdRng::seed_from_u64(7);
        let mutation = PercentageMutation::new(1.0, 0.2).unwrap();

        for _ in 0..100 {
            let mut subject = individual(&[0, 10], None);
            mutation.mutate(&mut subject, &mut rng).unwrap();
            let values = subject.tick_values();
            assert_eq!(values[0], 0);
            assert!((8..=10).contains(&values[1]));
        }
    }

    #[test]
    fn it_validates_parameters() {
        assert_eq!(
            RandomMutation::new(1.5),
            Err(MutationError::RateOutOfRange(1.5))
        );
        assert!(FixedValueMutation::new(-0.1, 1).is_err());
        assert_eq!(
            PercentageMutation::new(0.5, 1.5),
            Err(MutationError::PercentageOutOfRange(1.5))
        );
    }
}

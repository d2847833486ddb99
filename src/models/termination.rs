use super::Statistics;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TerminationError {
    #[error("max_generations must be > 0")]
    ZeroMaxGenerations,
    #[error("progress_range must be >= 2, got {0}")]
    ProgressRangeTooSmall(usize),
    #[error("threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),
}

/// Decides whether the generational loop stops early.
pub trait Termination {
    fn evaluate(&self, statistics: &Statistics) -> bool;
}

/// Stops once the generation counter reaches `max_generations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxGenerationsTermination {
    max_generations: usize,
}

impl MaxGenerationsTermination {
    pub fn new(max_generations: usize) -> Result<Self, TerminationError> {
        if max_generations == 0 {
            return Err(TerminationError::ZeroMaxGenerations);
        }
        Ok(Self { max_generations })
    }
}

impl Termination for MaxGenerationsTermination {
    fn evaluate(&self, statistics: &Statistics) -> bool {
        statistics.generation() >= self.max_generations
    }
}

/// Stops once the latest generation has at most `threshold` distinct individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationDiversityTermination {
    threshold: usize,
}

impl PopulationDiversityTermination {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl Termination for PopulationDiversityTermination {
    fn evaluate(&self, statistics: &Statistics) -> bool {
        statistics
            .diversity()
            .last()
            .is_some_and(|&diversity| diversity <= self.threshold)
    }
}

/// Stops once the best fitness has stopped moving.
///
/// Looks at the last `progress_range` recorded generations and averages the
/// relative change of the best fitness between consecutive entries. A change
/// from a best fitness of zero counts as its absolute size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConvergenceTermination {
    progress_range: usize,
    threshold: f64,
}

impl ProgressConvergenceTermination {
    pub fn new(progress_range: usize, threshold: f64) -> Result<Self, TerminationError> {
        let termination = Self {
            progress_range,
            threshold,
        };
        termination.validate()?;
        Ok(termination)
    }

    fn validate(&self) -> Result<(), TerminationError> {
        if self.progress_range < 2 {
            return Err(TerminationError::ProgressRangeTooSmall(self.progress_range));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(TerminationError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// Mean normalized delta over the window, `None` while history is too short.
    pub fn average_progress(&self, statistics: &Statistics) -> Option<f64> {
        let history = statistics.best_fitness();
        if history.len() < self.progress_range {
            return None;
        }

        let window = &history[history.len() - self.progress_range..];
        let deltas: Vec<f64> = window
            .windows(2)
            .map(|pair| {
                let delta = (pair[1] - pair[0]).abs();
                if pair[0] == 0.0 {
                    delta
                } else {
                    delta / pair[0].abs()
                }
            })
            .collect();

        Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
    }
}

impl Termination for ProgressConvergenceTermination {
    #[instrument(level = "debug", skip(self, statistics), fields(progress_range = self.progress_range, threshold = self.threshold, recorded = statistics.len()))]
    fn evaluate(&self, statistics: &Statistics) -> bool {
        self.average_progress(statistics)
            .is_some_and(|progress| progress < self.threshold)
    }
}

/// Termination strategy as stored in solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum TerminationStrategy {
    MaxGenerations(MaxGenerationsTermination),
    PopulationDiversity(PopulationDiversityTermination),
    ProgressConvergence(ProgressConvergenceTermination),
}

impl TerminationStrategy {
    pub fn max_generations(max_generations: usize) -> Result<Self, TerminationError> {
        Ok(Self::MaxGenerations(MaxGenerationsTermination::new(
            max_generations,
        )?))
    }

    pub fn population_diversity(threshold: usize) -> Self {
        Self::PopulationDiversity(PopulationDiversityTermination::new(threshold))
    }

    pub fn progress_convergence(
        progress_range: usize,
        threshold: f64,
    ) -> Result<Self, TerminationError> {
        Ok(Self::ProgressConvergence(
            ProgressConvergenceTermination::new(progress_range, threshold)?,
        ))
    }

    pub(crate) fn validate(&self) -> Result<(), TerminationError> {
        match self {
            Self::MaxGenerations(termination) => {
                MaxGenerationsTermination::new(termination.max_generations).map(|_| ())
            }
            Self::PopulationDiversity(_) => Ok(()),
            Self::ProgressConvergence(termination) => termination.validate(),
        }
    }
}

impl Termination for TerminationStrategy {
    fn evaluate(&self, statistics: &Statistics) -> bool {
        match self {
            Self::MaxGenerations(termination) => termination.evaluate(statistics),
            Self::PopulationDiversity(termination) => termination.evaluate(statistics),
            Self::ProgressConvergence(termination) => termination.evaluate(statistics),
        }
    }
}

use crate::models::Population;
use crate::services::observer::Observer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Snapshots buffered before a merge.
    pub quorum: usize,
    /// How long a caller waits for its quorum.
    pub timeout: Duration,
    /// Individuals kept after a merge. Defaults to the largest submission.
    pub keep: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            quorum: 2,
            timeout: Duration::from_secs(2),
            keep: None,
        }
    }
}

/// The part of an observer a solver instance submits for merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSnapshot {
    pub generation: usize,
    pub population: Population,
}

impl PartialSnapshot {
    pub fn new(generation: usize, population: Population) -> Self {
        Self {
            generation,
            population,
        }
    }
}

impl From<&Observer> for PartialSnapshot {
    fn from(observer: &Observer) -> Self {
        Self::new(observer.generation(), observer.population())
    }
}

/// Result every caller of one quorum receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPopulation {
    pub request_ids: Vec<Uuid>,
    pub generation: usize,
    pub population: Population,
    pub merged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorResponse {
    /// Serialized [`MergedPopulation`], identical for the whole quorum.
    Merged(String),
    TimedOut(String),
}

impl CoordinatorResponse {
    pub fn merged(&self) -> Option<&str> {
        match self {
            Self::Merged(json) => Some(json),
            Self::TimedOut(_) => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

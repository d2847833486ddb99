use crate::models::Individual;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// All generations were bred.
    Completed {
        best: Individual,
        generations: usize,
    },
    /// The termination strategy stopped the run early.
    Terminated {
        best: Individual,
        generations: usize,
    },
    /// Cancelled at a generation boundary. Nothing was committed.
    Cancelled {
        best: Individual,
        generations: usize,
    },
}

impl RunOutcome {
    pub fn best(&self) -> &Individual {
        match self {
            Self::Completed { best, .. }
            | Self::Terminated { best, .. }
            | Self::Cancelled { best, .. } => best,
        }
    }

    /// Index of the last generation that was evaluated.
    pub fn generations(&self) -> usize {
        match self {
            Self::Completed { generations, .. }
            | Self::Terminated { generations, .. }
            | Self::Cancelled { generations, .. } => *generations,
        }
    }

    pub fn is_committed(&self) -> bool {
        !matches!(self, Self::Cancelled { .. })
    }
}

/// Cooperative cancellation signal, shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

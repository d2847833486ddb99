use super::{Assignment, Gene, GeneSlot};

/// Objective function returning the fitness of one gene assignment.
///
/// Calls may be slow. The solver invokes it at most once per individual per
/// generation and blocks until it returns.
pub trait Evaluator {
    fn fitness(&self, assignment: &Assignment) -> Result<f64, anyhow::Error>;
}

impl<F> Evaluator for F
where
    F: Fn(&Assignment) -> Result<f64, anyhow::Error>,
{
    fn fitness(&self, assignment: &Assignment) -> Result<f64, anyhow::Error> {
        self(assignment)
    }
}

/// The external model the genes are bound to.
///
/// Resolves the live tick count of a slot and receives tick values before
/// each evaluation.
pub trait GeneRegistry {
    fn tick_count(&self, slot: &GeneSlot) -> Result<u32, anyhow::Error>;

    fn write(&mut self, gene: &Gene) -> Result<(), anyhow::Error>;
}

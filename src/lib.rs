pub mod models;
pub mod services;

pub use services::coordinator::{Coordinator, CoordinatorConfig, CoordinatorResponse};
pub use services::observer::{Observer, ObserverRegistry};
pub use services::solver::{
    CancellationFlag, Error as SolverError, EvaluationContext, RunOutcome, Solver, SolverBuilder,
};

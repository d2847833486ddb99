mod context;
mod errors;
mod models;
mod service;
mod service_builder;

pub use context::EvaluationContext;
pub use errors::Error;
pub use models::{CancellationFlag, RunOutcome};
pub use service::{EVALUATION_THRESHOLD, Solver};
pub use service_builder::SolverBuilder;

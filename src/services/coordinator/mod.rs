mod errors;
mod models;
mod service;

pub use errors::Error;
pub use models::{CoordinatorConfig, CoordinatorResponse, MergedPopulation, PartialSnapshot};
pub use service::Coordinator;

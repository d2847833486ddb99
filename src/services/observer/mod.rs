mod registry;
mod service;

pub use registry::ObserverRegistry;
pub use service::Observer;

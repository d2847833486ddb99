pub mod coordinator;
pub mod observer;
pub mod solver;

pub mod analyze;
pub mod displacements;
pub mod service;
pub mod snapshot;

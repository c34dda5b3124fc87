//! Extract, aggregate, and load stages for the usage analytics pipeline.

pub mod engine;
pub mod extract;
pub mod load;
pub mod orchestrator;

pub use engine::{transform, DerivedTables, EngineInputs, OutputTable};
pub use extract::Extracts;
pub use orchestrator::*;

pub mod engine;
pub mod worker;

pub use engine::{missing_dependencies, LoadReport, Orchestrator, DEFAULT_PRIVATE_NAMESPACE};
pub use worker::TaskOutcome;

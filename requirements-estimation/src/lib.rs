pub mod cache;
pub mod directory;
pub mod dtype;
pub mod error;
pub mod kv_cache;
pub mod memory;
pub mod orchestrator;
pub mod settings;
pub mod strategy;

pub use cache::{ArchitectureCache, CalculationKey, ResultCache};
pub use directory::{HuggingFaceDirectory, ModelDirectory, ModelSummary};
pub use dtype::DataType;
pub use error::{DirectoryError, EstimationError};
pub use kv_cache::{ArchitectureConfig, KvEstimate, Method};
pub use orchestrator::{BatchOrchestrator, BatchRequest, Completion, Progress};
pub use settings::Settings;
pub use strategy::Calculator;

/// Rounds half-up to two decimal places. Inputs are memory figures and never negative.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).trunc() / 100.0
}

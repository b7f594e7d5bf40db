//! Configuration module
//!
//! Loads and validates the flow configuration: stage order, targets,
//! step labels, verification sources and timings.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::{FlowConfig, StageConfig, TimingConfig};
pub use validation::{ValidationResult, Validator};

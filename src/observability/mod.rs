//! Observability module
//!
//! Logging, metrics, and the JSONL event stream for following a flow run.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter};
pub use logging::{LOG_LEVEL_ENV, LogFormat, init_logging};
pub use metrics::init_metrics;

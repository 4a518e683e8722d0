//! Observability for batch loading
//!
//! - Structured logging via `tracing` (subscriber set up by `init_logging`)
//! - Lock-free counters via `LoaderMetrics`
//!
//! Observability is read-only: nothing here changes how a batch executes.

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{LoaderMetrics, MetricsSnapshot};

//! Batch loading subsystem
//!
//! # Execution Flow (strict order)
//!
//! 1. Accumulate descriptors per data source (`LoaderRegistry::enqueue`)
//! 2. Dispatch: one `BatchLoader::load` per source
//! 3. Merge the batch into one pipeline (`pipeline::BatchMerger`)
//! 4. Execute it against the injected `AggregateStore`
//! 5. Demultiplex the aggregate result back into input order
//!
//! # Guarantees
//!
//! - Result i always answers descriptor i of the batch
//! - One physical round trip per batch (per chunk when chunked)
//! - A failure fails the whole batch; no partial results, no retries

mod config;
mod demux;
mod errors;
mod executor;
mod loader;
mod registry;

pub use config::LoaderConfig;
pub use demux::{Demultiplexer, SplitResult};
pub use errors::{BatchError, BatchResult};
pub use executor::{AggregateResult, Executor};
pub use loader::{BatchLoader, BatchOutput, PendingBatch};
pub use registry::{DispatchResults, LoaderRegistry, Ticket};

//! Document store boundary
//!
//! `AggregateStore` is the only capability the batching core consumes from
//! a store driver. `InMemoryStore` implements it over `serde_json`
//! documents, evaluating the same wire pipeline a real store would receive.

mod aggregate;
mod errors;
mod filters;
mod memory;
mod sorter;

pub use aggregate::{AggregateFuture, AggregateStore};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
pub use filters::ConditionFilter;
pub use memory::InMemoryStore;
pub use sorter::DocumentSorter;

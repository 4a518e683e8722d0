//! docbatch - batched aggregation-pipeline loading for document stores
//!
//! Many small queries against the same collection are merged into one
//! aggregation pipeline (`$match` with `$or`, then `$facet`), executed in a
//! single round trip, and split back into per-query results in input order.

pub mod cli;
pub mod loader;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod store;

//! Query descriptors and data source identities
//!
//! A descriptor is one logical lookup issued by a field resolver. Descriptors
//! for the same (source, collection) pair are batched together and merged
//! into a single aggregation pipeline by the `pipeline` module.

mod descriptor;
mod errors;
mod source;

pub use descriptor::{Document, QueryDescriptor};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use source::DataSourceId;

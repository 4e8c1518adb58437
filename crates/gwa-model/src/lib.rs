//! The supported GWA record types and their static registration table.

mod object;
pub mod records;
mod registry;
mod summary;

pub use object::{GwaObject, Reference};
pub use registry::{DecodeFn, DecodedObject, RECORD_TYPES, RecordType, Registry};
pub use summary::ModelSummary;

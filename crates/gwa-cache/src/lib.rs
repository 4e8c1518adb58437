//! Identity/index cache for one synchronization pass.
//!
//! This crate provides:
//! - the keyword-scoped **application id ↔ index** mapping with
//!   gap-avoiding allocation
//! - **payload storage** with conflict detection on divergent upserts
//! - **deletion tracking** and pass **snapshots** for reconciliation
//! - load case/combination **expansion**

mod cache;
mod entry;
pub mod error;

pub use cache::{Cache, Upsert};
pub use entry::{CacheEntry, default_application_id};
pub use error::{ConflictError, LineError, ReferenceError, Result};
pub use gwa_codec::{CaseExprError, CaseFactor};

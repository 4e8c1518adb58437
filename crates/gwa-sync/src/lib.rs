//! Synchronization pass orchestration.
//!
//! A [`SyncSession`] owns everything one pass needs: the identity/index
//! cache, the settings and a handle to the host through [`NativeProxy`].
//! Nothing here is global; a fresh session is built for every pass.
//!
//! Read path: [`SyncSession::load`] bulk-fetches records into the cache,
//! [`SyncSession::apply_deletions`] folds in the host's deletion feed and
//! [`SyncSession::decode_pass`] decodes keyword batches in prerequisite
//! order. Write path: [`SyncSession::emit`] encodes an object, allocates its
//! index and submits it to the host. [`SyncSession::finish`] closes the pass
//! with a [`PassReport`].

pub mod config;
pub mod error;
mod order;
pub mod proxy;
mod reconcile;
pub mod report;
mod session;

pub use config::SyncSettings;
pub use error::{ConfigError, SyncError};
pub use order::processing_order;
pub use proxy::{DeletedRecord, MemoryProxy, NativeProxy, ProxyRecord};
pub use reconcile::{Exclusion, Reconciliation, reconcile};
pub use report::{Advisory, FormatIssue, PassReport};
pub use session::SyncSession;

//! Error types for gwa-cache

use gwa_codec::FormatError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConflictError>;

/// An upsert that would break the one-entry-per-key or one-index-per-id
/// invariants. The cache is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConflictError {
    #[error("Divergent payload for {keyword} {index}")]
    DivergentPayload {
        keyword: String,
        index: u32,
        existing: String,
        incoming: String,
    },

    #[error("Application id {application_id} of {keyword} is bound to index {bound}, not {index}")]
    ApplicationIdRebound {
        keyword: String,
        application_id: String,
        bound: u32,
        index: u32,
    },

    #[error("{keyword} {index} is bound to application id {bound}, not {application_id}")]
    IndexRebound {
        keyword: String,
        index: u32,
        bound: String,
        application_id: String,
    },

    #[error("{keyword} {index} was deleted in this pass")]
    DeletedIndex { keyword: String, index: u32 },
}

impl ConflictError {
    pub fn keyword(&self) -> &str {
        match self {
            ConflictError::DivergentPayload { keyword, .. }
            | ConflictError::ApplicationIdRebound { keyword, .. }
            | ConflictError::IndexRebound { keyword, .. }
            | ConflictError::DeletedIndex { keyword, .. } => keyword,
        }
    }
}

/// Failure to store a raw line: either its header is unreadable or the
/// upsert conflicts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// A reference that could not be resolved from the cache. A placeholder
/// index was allocated in its place.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "Unresolved reference to {keyword} {}: placeholder index {placeholder}",
    describe_target(.application_id, .index)
)]
pub struct ReferenceError {
    pub keyword: String,
    pub application_id: Option<String>,
    pub index: Option<u32>,
    pub placeholder: u32,
    /// The record holding the reference, if known.
    pub referrer: Option<String>,
}

fn describe_target(application_id: &Option<String>, index: &Option<u32>) -> String {
    match (application_id, index) {
        (Some(id), _) => format!("`{id}`"),
        (None, Some(index)) => format!("#{index}"),
        (None, None) => "<anonymous>".to_string(),
    }
}

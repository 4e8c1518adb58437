//! Error types for gwa-sync

use std::path::PathBuf;

use gwa_codec::{FormatError, ParseError};
use thiserror::Error;

/// Failures that end a pass. Per-record problems never show up here; they
/// are collected as advisories in the pass report instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("host rejected command: {0}")]
    Host(String),

    #[error("record type {keyword} is part of a prerequisite cycle with {}", .remaining.join(", "))]
    PrerequisiteCycle {
        keyword: String,
        remaining: Vec<String>,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Document(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

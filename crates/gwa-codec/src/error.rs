//! Error types for gwa-codec

use serde::Serialize;
use thiserror::Error;

/// A token failed its field parser while decoding one record.
///
/// `position` is the zero-based token position inside the decoded line (or
/// inside the embedded sub-record text for component records). `token` is
/// `None` when the line ended before the field.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "{keyword}: field `{field}` at position {position}: {reason} (token: {})",
    .token.as_deref().unwrap_or("<missing>")
)]
pub struct FormatError {
    pub keyword: String,
    pub field: &'static str,
    pub position: usize,
    pub token: Option<String>,
    pub reason: String,
}

impl FormatError {
    pub fn new(
        keyword: impl Into<String>,
        field: &'static str,
        position: usize,
        token: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            field,
            position,
            token: token.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// A line of a `.gwa` document could not be read as a record at all.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

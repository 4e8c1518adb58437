//! Advisories collected during a pass and the report handed back at its end.

use std::collections::BTreeMap;

use gwa_cache::{ConflictError, ReferenceError};
use gwa_codec::FormatError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// A per-record problem. None of these stop a pass.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum Advisory {
    #[error(transparent)]
    Conflict(ConflictError),

    #[error(transparent)]
    Reference(ReferenceError),

    #[error("{} {}: {error}", .error.keyword, describe_index(.index))]
    Format {
        index: Option<u32>,
        error: FormatError,
    },

    #[error("{keyword} {index}: no codec registered, kept verbatim")]
    Unsupported { keyword: String, index: u32 },
}

fn describe_index(index: &Option<u32>) -> String {
    index.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatIssue {
    pub index: Option<u32>,
    pub error: FormatError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    /// Keyword levels in the order they were decoded.
    pub order: Vec<Vec<String>>,
    pub loaded: usize,
    pub decoded: usize,
    pub emitted: usize,
    pub deleted: usize,
    /// Application ids of records present at load that nothing re-emitted.
    pub stale: Vec<String>,
    pub conflicts: Vec<ConflictError>,
    pub reference_errors: Vec<ReferenceError>,
    pub format_errors: Vec<FormatIssue>,
    /// Indices of records kept verbatim, per keyword.
    pub unsupported: BTreeMap<String, Vec<u32>>,
}

impl PassReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an advisory under its kind.
    pub fn record(&mut self, advisory: Advisory) {
        match advisory {
            Advisory::Conflict(conflict) => {
                warn!(keyword = conflict.keyword(), "{conflict}");
                self.conflicts.push(conflict);
            }
            Advisory::Reference(reference) => {
                warn!(keyword = %reference.keyword, "{reference}");
                self.reference_errors.push(reference);
            }
            Advisory::Format { index, error } => {
                warn!(keyword = %error.keyword, index, "{error}");
                self.format_errors.push(FormatIssue { index, error });
            }
            Advisory::Unsupported { keyword, index } => {
                self.unsupported.entry(keyword).or_default().push(index);
            }
        }
    }

    pub fn advisories(&self) -> impl Iterator<Item = Advisory> + '_ {
        let conflicts = self.conflicts.iter().cloned().map(Advisory::Conflict);
        let references = self.reference_errors.iter().cloned().map(Advisory::Reference);
        let formats = self.format_errors.iter().map(|issue| Advisory::Format {
            index: issue.index,
            error: issue.error.clone(),
        });
        let unsupported = self.unsupported.iter().flat_map(|(keyword, indices)| {
            indices.iter().map(|&index| Advisory::Unsupported {
                keyword: keyword.clone(),
                index,
            })
        });
        conflicts.chain(references).chain(formats).chain(unsupported)
    }

    /// No conflicts, unresolved references or undecodable records.
    /// Unsupported records do not count against a pass.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
            && self.reference_errors.is_empty()
            && self.format_errors.is_empty()
    }

    pub fn unsupported_count(&self) -> usize {
        self.unsupported.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_issue() -> Advisory {
        Advisory::Format {
            index: Some(3),
            error: FormatError::new("NODE", "x", 5, Some("abc"), "expected a number"),
        }
    }

    #[test]
    fn advisories_are_filed_by_kind() {
        let mut report = PassReport::new();
        report.record(format_issue());
        report.record(Advisory::Unsupported {
            keyword: "LOAD_BEAM".into(),
            index: 1,
        });
        report.record(Advisory::Unsupported {
            keyword: "LOAD_BEAM".into(),
            index: 4,
        });
        report.record(Advisory::Conflict(ConflictError::DeletedIndex {
            keyword: "EL".into(),
            index: 2,
        }));

        assert_eq!(report.format_errors.len(), 1);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.unsupported["LOAD_BEAM"], vec![1, 4]);
        assert_eq!(report.unsupported_count(), 2);
        assert_eq!(report.advisories().count(), 4);
        assert!(!report.is_clean());
    }

    #[test]
    fn unsupported_records_keep_a_pass_clean() {
        let mut report = PassReport::new();
        report.record(Advisory::Unsupported {
            keyword: "LOAD_BEAM".into(),
            index: 1,
        });
        assert!(report.is_clean());
    }

    #[test]
    fn advisory_messages() {
        assert_eq!(
            format_issue().to_string(),
            "NODE 3: NODE: field `x` at position 5: expected a number (token: abc)"
        );
    }

    #[test]
    fn serializes_to_json() {
        let mut report = PassReport::new();
        report.loaded = 2;
        report.record(format_issue());
        let json = report.to_json().expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["loaded"], 2);
        assert_eq!(value["format_errors"][0]["error"]["field"], "x");
        assert_eq!(value["format_errors"][0]["index"], 3);
    }
}

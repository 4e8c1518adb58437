//! Codec for GSA's native tab-delimited GWA record protocol.
//!
//! This crate provides:
//! - the quote-aware **tokenizer**
//! - **header** parsing (`SET`/`SET_AT`, `keyword[.version][:sid]`, index)
//! - static **schemas** and the schema-driven field reader/writer
//! - **partitioning** of lines carrying embedded sub-records
//! - the load case/combination **description** expander
//! - a line-oriented `.gwa` **document** reader

mod case_expr;
mod error;
mod field;
mod header;
mod partition;
mod record;
mod schema;
mod token;

use std::fs;
use std::path::Path;

pub use case_expr::{CaseExprError, CaseFactor, expand_case_expression};
pub use error::{FormatError, ParseError};
pub use field::{FieldReader, FieldWriter, TagGroup, TaggedList, WireValue};
pub use header::{
    APPLICATION_ID_TAG, CommandVerb, KeywordToken, RecordHeader, STREAM_ID_TAG, SidTag,
    bare_keyword, parse_keyword_token, set_header, set_sid, strip_sid, strip_verb,
};
pub use partition::{EmbeddedPiece, Partition, offset_after_tokens, partition_embedded};
pub use record::{Decoded, RecordCodec};
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use token::{DELIMITER, join_tokens, split_tokens, token_spans, unquote};

/// One record line of a `.gwa` document with its parsed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub header: RecordHeader,
    pub gwa: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GwaDocument {
    pub records: Vec<RawRecord>,
}

impl GwaDocument {
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ParseError {
            line: 0,
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse_str(&raw)
    }

    /// Reads one record per line. Blank lines and `!` comments are skipped;
    /// only the header of each record is validated here, field decoding is
    /// left to the record codecs.
    pub fn parse_str(raw: &str) -> Result<Self, ParseError> {
        let mut records = Vec::new();

        for (i, line) in raw.lines().enumerate() {
            let trimmed = line.trim_end_matches('\r');
            if trimmed.trim().is_empty() || is_comment(trimmed) {
                continue;
            }

            let tokens = split_tokens(trimmed);
            if tokens
                .first()
                .and_then(|t| CommandVerb::from_token(t))
                .is_none()
            {
                return Err(ParseError {
                    line: i + 1,
                    message: "expected record starting with SET or SET_AT".to_string(),
                });
            }

            let (header, _) = RecordHeader::parse(&tokens).map_err(|e| ParseError {
                line: i + 1,
                message: e.to_string(),
            })?;

            records.push(RawRecord {
                header,
                gwa: trimmed.to_string(),
                line: i + 1,
            });
        }

        Ok(GwaDocument { records })
    }

    pub fn keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = self
            .records
            .iter()
            .map(|r| r.header.keyword.clone())
            .collect();
        keywords.sort();
        keywords.dedup();
        keywords
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('!')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_basic_records() {
        let src = "
! exported model
SET\tNODE.3:{speckle_app_id:n1}\t1\tn1\tNO_RGB\t0\t0\t0
SET\tNODE.3\t2\tn2\tNO_RGB\t1\t0\t0
SET_AT\tEL.4\t1\tbeam\tNO_RGB\tBEAM\t1\t1\t2\t1\t2
";

        let doc = GwaDocument::parse_str(src).expect("parser should succeed");
        assert_eq!(doc.records.len(), 3);
        assert_eq!(doc.records[0].header.keyword, "NODE");
        assert_eq!(
            doc.records[0].header.sid.application_id.as_deref(),
            Some("n1")
        );
        assert_eq!(doc.records[2].header.verb, CommandVerb::SetAt);
        assert_eq!(doc.records[2].line, 5);
        assert_eq!(doc.keywords(), vec!["EL".to_string(), "NODE".to_string()]);
    }

    #[test]
    fn fails_on_line_without_verb() {
        let src = "SET\tNODE.3\t1\tn\nNODE.3\t2\tn\n";
        let err = GwaDocument::parse_str(src).expect_err("should fail");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn fails_on_bad_index() {
        let src = "SET\tNODE.3\tone\tn\n";
        let err = GwaDocument::parse_str(src).expect_err("should fail");
        assert_eq!(err.line, 1);
        assert!(err.message.contains("index"), "{}", err.message);
    }

    #[test]
    fn reads_documents_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "SET\tAXIS.1\t1\tlocal\tCART\t0\t0\t0\t1\t0\t0\t0\t1\t0")
            .expect("write record");
        let doc = GwaDocument::parse_file(file.path()).expect("parse from disk");
        assert_eq!(doc.records.len(), 1);
        assert_eq!(doc.records[0].header.keyword, "AXIS");
    }

    #[test]
    fn reports_missing_file() {
        let err = GwaDocument::parse_file("/definitely/not/here.gwa").expect_err("missing");
        assert_eq!(err.line, 0);
        assert!(err.message.contains("failed to read"));
    }
}

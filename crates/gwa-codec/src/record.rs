//! The per-type codec contract.

use crate::error::FormatError;
use crate::field::{FieldReader, FieldWriter};
use crate::header::{CommandVerb, RecordHeader, SidTag, parse_keyword_token};
use crate::schema::RecordSchema;
use crate::token::split_tokens;

/// A record decoded from one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub header: RecordHeader,
    pub record: T,
    /// Tokens after the last declared field, kept verbatim.
    pub trailing: Vec<String>,
}

/// Encode/decode of one versioned positional record type.
///
/// Implementors only describe their fields; the provided methods handle the
/// header, keyword/version checks and the embedded-record framing.
pub trait RecordCodec: Sized {
    const SCHEMA: &'static RecordSchema;

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, FormatError>;

    fn write_fields(&self, writer: &mut FieldWriter);

    fn decode(line: &str) -> Result<Decoded<Self>, FormatError> {
        let tokens = split_tokens(line);
        let (header, start) = RecordHeader::parse(&tokens)?;
        check_keyword(Self::SCHEMA, &header.keyword, header.version, start - 2)?;
        let mut reader = FieldReader::new(Self::SCHEMA, &tokens, start);
        let record = Self::read_fields(&mut reader)?;
        Ok(Decoded {
            header,
            record,
            trailing: reader.finish(),
        })
    }

    fn encode(&self, verb: CommandVerb, index: u32, sid: &SidTag) -> String {
        let mut writer = FieldWriter::record(Self::SCHEMA, verb, index, sid);
        self.write_fields(&mut writer);
        writer.finish()
    }

    /// Decodes a sub-record piece (`KEYWORD.version` followed by fields).
    /// Unconsumed tokens are returned alongside the record.
    fn decode_embedded(text: &str) -> Result<(Self, Vec<String>), FormatError> {
        let tokens = split_tokens(text);
        let first = tokens.first().map(String::as_str).unwrap_or_default();
        let keyword = parse_keyword_token(first)?;
        check_keyword(Self::SCHEMA, &keyword.keyword, keyword.version, 0)?;
        let mut reader = FieldReader::new(Self::SCHEMA, &tokens, 1);
        let record = Self::read_fields(&mut reader)?;
        Ok((record, reader.finish()))
    }

    fn encode_embedded(&self) -> Vec<String> {
        let mut writer = FieldWriter::embedded_record(Self::SCHEMA);
        self.write_fields(&mut writer);
        writer.into_tokens()
    }
}

fn check_keyword(
    schema: &RecordSchema,
    keyword: &str,
    version: Option<u32>,
    position: usize,
) -> Result<(), FormatError> {
    if !keyword.eq_ignore_ascii_case(schema.keyword) {
        return Err(FormatError::new(
            schema.keyword,
            "keyword",
            position,
            Some(keyword),
            format!("expected {}", schema.keyword),
        ));
    }
    match version {
        Some(v) if v != schema.version => Err(FormatError::new(
            schema.keyword,
            "version",
            position,
            Some(&v.to_string()),
            format!("only version {} is supported", schema.version),
        )),
        _ => Ok(()),
    }
}

//! Record header: command verb, `keyword[.version][:sid]` and index.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::token::{DELIMITER, join_tokens, split_tokens, token_spans, unquote};

pub const APPLICATION_ID_TAG: &str = "speckle_app_id";
pub const STREAM_ID_TAG: &str = "speckle_stream_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandVerb {
    /// Create or fully replace by identity.
    #[default]
    Set,
    /// Replace at an explicit index.
    SetAt,
}

impl CommandVerb {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandVerb::Set => "SET",
            CommandVerb::SetAt => "SET_AT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "SET" => Some(CommandVerb::Set),
            "SET_AT" => Some(CommandVerb::SetAt),
            _ => None,
        }
    }
}

/// Identifier tag carried after the keyword, e.g.
/// `{speckle_app_id:gh/12}{speckle_stream_id:abc}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidTag {
    pub application_id: Option<String>,
    pub stream_id: Option<String>,
}

impl SidTag {
    pub fn new(application_id: Option<&str>, stream_id: Option<&str>) -> Self {
        let keep = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            application_id: keep(application_id),
            stream_id: keep(stream_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.application_id.is_none() && self.stream_id.is_none()
    }

    /// Parses the brace-delimited `{key:value}` groups. Unknown keys are
    /// ignored, a value may itself contain colons.
    pub fn parse(raw: &str) -> Self {
        let mut sid = SidTag::default();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let group = &rest[open + 1..open + close];
            if let Some((key, value)) = group.split_once(':') {
                match key.trim() {
                    APPLICATION_ID_TAG => sid.application_id = Some(value.to_string()),
                    STREAM_ID_TAG => sid.stream_id = Some(value.to_string()),
                    _ => {}
                }
            }
            rest = &rest[open + close + 1..];
        }
        sid.application_id = sid.application_id.filter(|s| !s.is_empty());
        sid.stream_id = sid.stream_id.filter(|s| !s.is_empty());
        sid
    }

    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(app_id) = &self.application_id {
            out.push_str(&format!("{{{APPLICATION_ID_TAG}:{app_id}}}"));
        }
        if let Some(stream_id) = &self.stream_id {
            out.push_str(&format!("{{{STREAM_ID_TAG}:{stream_id}}}"));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordToken {
    pub keyword: String,
    pub version: Option<u32>,
    pub sid: SidTag,
}

impl KeywordToken {
    pub fn to_wire(&self) -> String {
        let mut out = self.keyword.clone();
        if let Some(version) = self.version {
            out.push_str(&format!(".{version}"));
        }
        if !self.sid.is_empty() {
            out.push(':');
            out.push_str(&self.sid.to_wire());
        }
        out
    }
}

/// Splits `NODE.3:{speckle_app_id:x}` into keyword, version and tag.
pub fn parse_keyword_token(token: &str) -> Result<KeywordToken, FormatError> {
    let token = unquote(token.trim());
    let (head, sid) = match token.split_once(':') {
        Some((head, tag)) => (head, SidTag::parse(tag)),
        None => (token, SidTag::default()),
    };
    let (keyword, version) = match head.rsplit_once('.') {
        Some((kw, ver)) if !ver.is_empty() && ver.chars().all(|c| c.is_ascii_digit()) => {
            (kw, ver.parse::<u32>().ok())
        }
        _ => (head, None),
    };
    if keyword.is_empty() {
        return Err(FormatError::new(
            "",
            "keyword",
            1,
            Some(token),
            "empty keyword",
        ));
    }
    Ok(KeywordToken {
        keyword: keyword.to_ascii_uppercase(),
        version,
        sid,
    })
}

/// Keyword without version or tag, e.g. `NODE` for `NODE.3:{...}`.
pub fn bare_keyword(keyword: &str) -> String {
    let head = keyword.split(':').next().unwrap_or_default();
    match head.rsplit_once('.') {
        Some((kw, ver)) if !ver.is_empty() && ver.chars().all(|c| c.is_ascii_digit()) => {
            kw.to_ascii_uppercase()
        }
        _ => head.to_ascii_uppercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub verb: CommandVerb,
    pub keyword: String,
    pub version: Option<u32>,
    pub sid: SidTag,
    pub index: u32,
}

impl RecordHeader {
    /// Parses the leading tokens of a record. The verb is optional: payloads
    /// stored without it are read as `SET`.
    ///
    /// Returns the header and the position of the first field token.
    pub fn parse(tokens: &[String]) -> Result<(Self, usize), FormatError> {
        let first = tokens.first().map(String::as_str).unwrap_or_default();
        let (verb, kw_pos) = match CommandVerb::from_token(first) {
            Some(verb) => (verb, 1),
            None => (CommandVerb::Set, 0),
        };

        let kw_token = tokens.get(kw_pos).ok_or_else(|| {
            FormatError::new("", "keyword", kw_pos, None, "missing keyword")
        })?;
        let KeywordToken {
            keyword,
            version,
            sid,
        } = parse_keyword_token(kw_token).map_err(|mut e| {
            e.position = kw_pos;
            e
        })?;

        let index_pos = kw_pos + 1;
        let index_token = tokens.get(index_pos).map(String::as_str);
        let index = index_token
            .and_then(|t| t.trim().parse::<u32>().ok())
            .filter(|i| *i > 0)
            .ok_or_else(|| {
                FormatError::new(
                    keyword.clone(),
                    "index",
                    index_pos,
                    index_token,
                    "expected a positive integer index",
                )
            })?;

        Ok((
            Self {
                verb,
                keyword,
                version,
                sid,
                index,
            },
            index_pos + 1,
        ))
    }

    pub fn parse_line(line: &str) -> Result<(Self, Vec<String>), FormatError> {
        let tokens = split_tokens(line);
        let (header, body_start) = Self::parse(&tokens)?;
        Ok((header, tokens[body_start.min(tokens.len())..].to_vec()))
    }
}

fn keyword_span(line: &str) -> Option<std::ops::Range<usize>> {
    let spans = token_spans(line);
    let first = spans.first().map(|s| &line[s.clone()]).unwrap_or_default();
    let pos = if CommandVerb::from_token(first).is_some() { 1 } else { 0 };
    spans.get(pos).cloned()
}

/// Removes the identifier tag from the keyword token, leaving the rest of
/// the line byte-for-byte intact.
pub fn strip_sid(line: &str) -> String {
    let Some(span) = keyword_span(line) else {
        return line.to_string();
    };
    match line[span.clone()].find(':') {
        Some(colon) => {
            let cut = span.start + colon;
            format!("{}{}", &line[..cut], &line[span.end..])
        }
        None => line.to_string(),
    }
}

/// Replaces (or attaches) the identifier tag on the keyword token.
pub fn set_sid(line: &str, sid: &SidTag) -> String {
    let stripped = strip_sid(line);
    if sid.is_empty() {
        return stripped;
    }
    let Some(span) = keyword_span(&stripped) else {
        return stripped;
    };
    format!(
        "{}:{}{}",
        &stripped[..span.end],
        sid.to_wire(),
        &stripped[span.end..]
    )
}

/// Rewrites the verb, identifier tag and index of a record line. The
/// keyword, version and every field token stay byte-for-byte intact.
pub fn set_header(line: &str, verb: CommandVerb, index: u32, sid: &SidTag) -> String {
    let spans = token_spans(line);
    let first = spans.first().map(|s| &line[s.clone()]).unwrap_or_default();
    let kw_pos = if CommandVerb::from_token(first).is_some() { 1 } else { 0 };
    let keyword = spans
        .get(kw_pos)
        .map(|s| unquote(&line[s.clone()]))
        .unwrap_or_default();
    let head = keyword.split(':').next().unwrap_or_default();

    let mut out = format!("{}{DELIMITER}{head}", verb.as_str());
    if !sid.is_empty() {
        out.push(':');
        out.push_str(&sid.to_wire());
    }
    out.push(DELIMITER);
    out.push_str(&index.to_string());
    if let Some(body) = spans.get(kw_pos + 2) {
        out.push(DELIMITER);
        out.push_str(&line[body.start..]);
    }
    out
}

/// Drops a leading command verb, producing the payload form held by the cache.
pub fn strip_verb(line: &str) -> String {
    let tokens = split_tokens(line);
    match tokens.first().and_then(|t| CommandVerb::from_token(t)) {
        Some(_) => join_tokens(&tokens[1..]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_keyword_token() {
        let kw = parse_keyword_token("NODE.3:{speckle_app_id:gh/a:1}{speckle_stream_id:s1}")
            .expect("keyword should parse");
        assert_eq!(kw.keyword, "NODE");
        assert_eq!(kw.version, Some(3));
        assert_eq!(kw.sid.application_id.as_deref(), Some("gh/a:1"));
        assert_eq!(kw.sid.stream_id.as_deref(), Some("s1"));
        assert_eq!(
            kw.to_wire(),
            "NODE.3:{speckle_app_id:gh/a:1}{speckle_stream_id:s1}"
        );
    }

    #[test]
    fn keyword_without_version_or_tag() {
        let kw = parse_keyword_token("load_title").expect("keyword should parse");
        assert_eq!(kw.keyword, "LOAD_TITLE");
        assert_eq!(kw.version, None);
        assert!(kw.sid.is_empty());
    }

    #[test]
    fn header_with_and_without_verb() {
        let tokens = split_tokens("SET_AT\tEL.4\t12\tbeam");
        let (header, start) = RecordHeader::parse(&tokens).expect("header should parse");
        assert_eq!(header.verb, CommandVerb::SetAt);
        assert_eq!(header.index, 12);
        assert_eq!(start, 3);

        let tokens = split_tokens("EL.4\t12\tbeam");
        let (header, start) = RecordHeader::parse(&tokens).expect("header should parse");
        assert_eq!(header.verb, CommandVerb::Set);
        assert_eq!(header.keyword, "EL");
        assert_eq!(start, 2);
    }

    #[test]
    fn rejects_non_positive_index() {
        let tokens = split_tokens("SET\tNODE.3\t0\tname");
        let err = RecordHeader::parse(&tokens).expect_err("zero index should fail");
        assert_eq!(err.field, "index");
        assert_eq!(err.position, 2);
        assert_eq!(err.token.as_deref(), Some("0"));
    }

    #[test]
    fn strips_and_sets_sid() {
        let line = "SET\tNODE.3:{speckle_app_id:a1}\t1\tn\t0";
        assert_eq!(strip_sid(line), "SET\tNODE.3\t1\tn\t0");
        let sid = SidTag::new(Some("b2"), Some("s"));
        assert_eq!(
            set_sid(line, &sid),
            "SET\tNODE.3:{speckle_app_id:b2}{speckle_stream_id:s}\t1\tn\t0"
        );
        assert_eq!(set_sid(line, &SidTag::default()), "SET\tNODE.3\t1\tn\t0");
    }

    #[test]
    fn set_header_rewrites_verb_index_and_tag() {
        let line = "SET_AT\tLOAD_BEAM.2:{speckle_app_id:old}\t1\t\"a\tb\"\t2\t";
        let sid = SidTag::new(Some("lb2"), None);
        assert_eq!(
            set_header(line, CommandVerb::Set, 7, &sid),
            "SET\tLOAD_BEAM.2:{speckle_app_id:lb2}\t7\t\"a\tb\"\t2\t"
        );
        assert_eq!(
            set_header("LOAD_BEAM.2\t3", CommandVerb::SetAt, 4, &SidTag::default()),
            "SET_AT\tLOAD_BEAM.2\t4"
        );
    }

    #[test]
    fn bare_keyword_drops_version_and_tag() {
        assert_eq!(bare_keyword("GRID_PLANE.4"), "GRID_PLANE");
        assert_eq!(bare_keyword("node.3:{speckle_app_id:x}"), "NODE");
        assert_eq!(bare_keyword("AXIS"), "AXIS");
    }
}

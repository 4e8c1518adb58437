//! Schema-driven field reader and writer.
//!
//! A codec reads or writes its fields strictly in the order its
//! [`RecordSchema`] declares them; the reader and writer take the field
//! name, kind and wire default from the schema rather than from the caller.

use crate::error::FormatError;
use crate::header::{CommandVerb, KeywordToken, SidTag};
use crate::schema::{FieldKind, FieldSpec, RecordSchema};
use crate::token::join_tokens;

/// A value with a textual wire form.
pub trait WireValue: Sized {
    fn parse_wire(token: &str) -> Option<Self>;
    fn to_wire(&self) -> String;
}

macro_rules! wire_number {
    ($($ty:ty),+) => {
        $(impl WireValue for $ty {
            fn parse_wire(token: &str) -> Option<Self> {
                token.trim().parse::<$ty>().ok()
            }

            fn to_wire(&self) -> String {
                self.to_string()
            }
        })+
    };
}

wire_number!(i32, i64, u32, u64, usize);

impl WireValue for f64 {
    fn parse_wire(token: &str) -> Option<Self> {
        token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    // `Display` for f64 prints the shortest text that parses back exactly.
    fn to_wire(&self) -> String {
        format!("{self}")
    }
}

impl WireValue for String {
    fn parse_wire(token: &str) -> Option<Self> {
        Some(token.to_string())
    }

    fn to_wire(&self) -> String {
        self.clone()
    }
}

/// Declares an enum whose variants map one-to-one onto wire strings.
///
/// ```
/// gwa_codec::wire_enum! {
///     pub enum Exposure {
///         All => "ALL",
///         Top => "TOP",
///     }
/// }
/// use gwa_codec::WireValue;
/// assert_eq!(Exposure::parse_wire("top"), Some(Exposure::Top));
/// assert_eq!(Exposure::All.as_wire(), "ALL");
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_wire(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl $crate::WireValue for $name {
            fn parse_wire(token: &str) -> Option<Self> {
                let token = token.trim();
                $(if token.eq_ignore_ascii_case($wire) {
                    return Some($name::$variant);
                })+
                None
            }

            fn to_wire(&self) -> String {
                self.as_wire().to_string()
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagGroup<T> {
    pub tag: char,
    pub items: Vec<T>,
}

/// Main list plus tagged sub-lists carried in one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedList<T> {
    pub main: Vec<T>,
    pub groups: Vec<TagGroup<T>>,
}

impl<T> Default for TaggedList<T> {
    fn default() -> Self {
        Self {
            main: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl<T> TaggedList<T> {
    pub fn new(main: Vec<T>) -> Self {
        Self {
            main,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, tag: char, items: Vec<T>) -> Self {
        self.groups.push(TagGroup { tag, items });
        self
    }

    pub fn groups_tagged(&self, tag: char) -> impl Iterator<Item = &[T]> {
        self.groups
            .iter()
            .filter(move |g| g.tag == tag)
            .map(|g| g.items.as_slice())
    }

    /// Every item in the main list and all groups.
    pub fn all_items(&self) -> impl Iterator<Item = &T> {
        self.main
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.items.iter()))
    }
}

impl<T: WireValue> TaggedList<T> {
    pub fn parse(raw: &str, tags: &[char]) -> Result<Self, String> {
        let (main_part, groups_part) = match raw.find('(') {
            Some(open) => {
                let before = raw[..open].trim_end();
                let tag_start = before
                    .char_indices()
                    .last()
                    .map(|(i, _)| i)
                    .ok_or_else(|| "group without a tag".to_string())?;
                (&raw[..tag_start], &raw[tag_start..])
            }
            None => (raw, ""),
        };

        let mut list = TaggedList::new(parse_words(main_part)?);
        let mut rest = groups_part.trim_start();
        while let Some(tag) = rest.chars().next() {
            let after_tag = rest[tag.len_utf8()..].trim_start();
            if !after_tag.starts_with('(') {
                return Err(format!("expected '(' after tag '{tag}'"));
            }
            let close = after_tag
                .find(')')
                .ok_or_else(|| format!("unclosed group '{tag}('"))?;
            let tag = tag.to_ascii_uppercase();
            if !tags.contains(&tag) {
                return Err(format!("unknown list tag '{tag}'"));
            }
            list.groups.push(TagGroup {
                tag,
                items: parse_words(&after_tag[1..close])?,
            });
            rest = after_tag[close + 1..].trim_start();
        }
        Ok(list)
    }

    pub fn to_wire(&self) -> String {
        let mut parts = Vec::with_capacity(1 + self.groups.len());
        if !self.main.is_empty() {
            parts.push(words(&self.main));
        }
        for group in &self.groups {
            parts.push(format!("{}({})", group.tag, words(&group.items)));
        }
        parts.join(" ")
    }
}

fn parse_words<T: WireValue>(raw: &str) -> Result<Vec<T>, String> {
    raw.split_whitespace()
        .map(|w| T::parse_wire(w).ok_or_else(|| format!("invalid list item `{w}`")))
        .collect()
}

fn words<T: WireValue>(items: &[T]) -> String {
    items
        .iter()
        .map(WireValue::to_wire)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cursor over the tokens of one record, driven by its schema.
pub struct FieldReader<'a> {
    schema: &'static RecordSchema,
    tokens: &'a [String],
    pos: usize,
    field: usize,
}

impl<'a> FieldReader<'a> {
    /// `start` is the position of the first field token; error positions are
    /// reported relative to the start of `tokens`.
    pub fn new(schema: &'static RecordSchema, tokens: &'a [String], start: usize) -> Self {
        Self {
            schema,
            tokens,
            pos: start,
            field: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [String] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Hands back whatever the schema did not consume.
    pub fn finish(self) -> Vec<String> {
        self.remaining().to_vec()
    }

    pub fn required<T: WireValue>(&mut self) -> Result<T, FormatError> {
        let spec = self.advance()?;
        self.parse_one(spec)
    }

    pub fn optional<T: WireValue>(&mut self) -> Result<Option<T>, FormatError> {
        let spec = self.advance()?;
        match self.tokens.get(self.pos) {
            None => Ok(None),
            Some(token) if token.trim().is_empty() => {
                self.pos += 1;
                Ok(None)
            }
            Some(_) => self.parse_one(spec).map(Some),
        }
    }

    pub fn fixed_list<T: WireValue>(&mut self) -> Result<Vec<T>, FormatError> {
        let spec = self.advance()?;
        let FieldKind::FixedList { count } = spec.kind else {
            return Err(self.error(spec, None, "field is not a fixed list"));
        };
        (0..count).map(|_| self.parse_one(spec)).collect()
    }

    pub fn fixed_array<T: WireValue, const N: usize>(&mut self) -> Result<[T; N], FormatError> {
        let start = self.pos;
        let values = self.fixed_list::<T>()?;
        let len = values.len();
        values.try_into().map_err(|_| {
            FormatError::new(
                self.schema.keyword,
                self.schema.fields[self.field - 1].name,
                start,
                None,
                format!("expected {N} values, schema declares {len}"),
            )
        })
    }

    pub fn counted_list<T: WireValue>(&mut self) -> Result<Vec<T>, FormatError> {
        let spec = self.advance()?;
        let count: usize = self.parse_one(spec)?;
        if self.tokens.len().saturating_sub(self.pos) < count {
            let token = self.tokens.get(self.pos - 1).map(String::as_str);
            return Err(FormatError::new(
                self.schema.keyword,
                spec.name,
                self.pos - 1,
                token,
                format!("count announces {count} items but fewer tokens remain"),
            ));
        }
        (0..count).map(|_| self.parse_one(spec)).collect()
    }

    pub fn tagged<T: WireValue>(&mut self) -> Result<TaggedList<T>, FormatError> {
        let spec = self.advance()?;
        let FieldKind::Tagged { tags } = spec.kind else {
            return Err(self.error(spec, None, "field is not a tagged list"));
        };
        let token = self.take(spec)?;
        TaggedList::parse(token, tags)
            .map_err(|reason| self.error(spec, Some(token), reason).at(self.pos - 1))
    }

    /// Marks the embedded sub-record slot as visited; partitioning happens
    /// on the raw line before the reader is built.
    pub fn embedded(&mut self) -> Result<&'static [&'static str], FormatError> {
        let spec = self.advance()?;
        match spec.kind {
            FieldKind::Embedded { keywords } => Ok(keywords),
            _ => Err(self.error(spec, None, "field is not an embedded slot")),
        }
    }

    /// Takes every remaining token verbatim.
    pub fn unmodelled(&mut self) -> Result<Vec<String>, FormatError> {
        self.advance()?;
        let rest = self.remaining().to_vec();
        self.pos = self.tokens.len();
        Ok(rest)
    }

    fn advance(&mut self) -> Result<&'static FieldSpec, FormatError> {
        let schema = self.schema;
        let spec = schema.fields.get(self.field).ok_or_else(|| {
            FormatError::new(
                schema.keyword,
                "<end>",
                self.pos,
                None,
                "codec reads past the declared schema",
            )
        })?;
        self.field += 1;
        Ok(spec)
    }

    fn take(&mut self, spec: &'static FieldSpec) -> Result<&'a str, FormatError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| self.error(spec, None, "missing token"))?;
        self.pos += 1;
        Ok(token.as_str())
    }

    fn parse_one<T: WireValue>(&mut self, spec: &'static FieldSpec) -> Result<T, FormatError> {
        let token = self.take(spec)?;
        T::parse_wire(token).ok_or_else(|| {
            self.error(spec, Some(token), "invalid value")
                .at(self.pos - 1)
        })
    }

    fn error(&self, spec: &FieldSpec, token: Option<&str>, reason: impl Into<String>) -> FormatError {
        FormatError::new(self.schema.keyword, spec.name, self.pos, token, reason)
    }
}

impl FormatError {
    fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

/// Builds the token list of one record in schema order.
pub struct FieldWriter {
    schema: &'static RecordSchema,
    tokens: Vec<String>,
    field: usize,
}

impl FieldWriter {
    /// Starts a top-level record: verb, keyword token, index.
    pub fn record(
        schema: &'static RecordSchema,
        verb: CommandVerb,
        index: u32,
        sid: &SidTag,
    ) -> Self {
        let keyword = KeywordToken {
            keyword: schema.keyword.to_string(),
            version: Some(schema.version),
            sid: sid.clone(),
        };
        Self {
            schema,
            tokens: vec![
                verb.as_str().to_string(),
                keyword.to_wire(),
                index.to_string(),
            ],
            field: 0,
        }
    }

    /// Starts an embedded sub-record, which carries only its keyword token.
    pub fn embedded_record(schema: &'static RecordSchema) -> Self {
        Self {
            schema,
            tokens: vec![schema.versioned_keyword()],
            field: 0,
        }
    }

    pub fn required<T: WireValue>(&mut self, value: &T) -> &mut Self {
        self.advance();
        self.tokens.push(value.to_wire());
        self
    }

    pub fn optional<T: WireValue>(&mut self, value: Option<&T>) -> &mut Self {
        let default = match self.advance().map(|s| s.kind) {
            Some(FieldKind::Optional { default }) => default,
            _ => "",
        };
        self.tokens.push(match value {
            Some(v) => v.to_wire(),
            None => default.to_string(),
        });
        self
    }

    pub fn fixed_list<T: WireValue>(&mut self, values: &[T]) -> &mut Self {
        let count = match self.advance().map(|s| s.kind) {
            Some(FieldKind::FixedList { count }) => count,
            _ => values.len(),
        };
        debug_assert_eq!(values.len(), count, "fixed list length mismatch");
        self.tokens
            .extend(values.iter().take(count).map(WireValue::to_wire));
        self
    }

    pub fn counted_list<T: WireValue>(&mut self, values: &[T]) -> &mut Self {
        self.advance();
        self.tokens.push(values.len().to_string());
        self.tokens.extend(values.iter().map(WireValue::to_wire));
        self
    }

    pub fn tagged<T: WireValue>(&mut self, list: &TaggedList<T>) -> &mut Self {
        self.advance();
        self.tokens.push(list.to_wire());
        self
    }

    /// Appends the already-encoded tokens of each embedded sub-record.
    pub fn embedded(&mut self, parts: impl IntoIterator<Item = Vec<String>>) -> &mut Self {
        self.advance();
        for part in parts {
            self.tokens.extend(part);
        }
        self
    }

    pub fn unmodelled(&mut self, values: &[String]) -> &mut Self {
        let defaults = match self.advance().map(|s| s.kind) {
            Some(FieldKind::Unmodelled { defaults }) => defaults,
            _ => &[],
        };
        if values.is_empty() {
            self.tokens.extend(defaults.iter().map(|d| d.to_string()));
        } else {
            self.tokens.extend(values.iter().cloned());
        }
        self
    }

    /// Tokens outside the schema, written verbatim (unsupported sub-records).
    pub fn raw(&mut self, values: &[String]) -> &mut Self {
        self.tokens.extend(values.iter().cloned());
        self
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn finish(self) -> String {
        join_tokens(&self.tokens)
    }

    fn advance(&mut self) -> Option<&'static FieldSpec> {
        let spec = self.schema.fields.get(self.field);
        debug_assert!(
            spec.is_some(),
            "{} codec writes past its schema",
            self.schema.keyword
        );
        self.field += 1;
        spec
    }
}
